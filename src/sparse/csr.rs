//! CSR (Compressed Sparse Row) adjacency

use crate::dtype::{DType, IdElement};
use crate::error::{Error, Result};
use crate::runtime::Device;
use crate::tensor::Tensor;
use std::ops::Range;

/// CSR adjacency: `indptr [num_rows + 1]`, `indices [nnz]`, optional edge ids
///
/// All id arrays share one dtype (`I32` or `I64`). When `data` is absent
/// the position of an entry is its edge id.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "CsrRepr")
)]
pub struct CsrData {
    pub(crate) indptr: Tensor,
    pub(crate) indices: Tensor,
    pub(crate) data: Option<Tensor>,
    pub(crate) shape: [usize; 2],
    pub(crate) sorted: bool,
}

impl CsrData {
    /// Create a CSR adjacency from components
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `indptr` length != num_rows + 1, or `data` length != `indices` length
    /// - the arrays are not 1-D, not `I32`/`I64`, or have different dtypes
    /// - the arrays live on different devices
    /// - the structural invariants of [`Self::validate`] do not hold
    pub fn new(
        indptr: Tensor,
        indices: Tensor,
        data: Option<Tensor>,
        shape: [usize; 2],
        sorted: bool,
    ) -> Result<Self> {
        let [num_rows, _num_cols] = shape;
        let id_dtype = indptr.dtype();
        if !id_dtype.is_id() {
            return Err(Error::unsupported_dtype(id_dtype, "csr_new"));
        }

        let mut parts: Vec<(&'static str, &Tensor)> = vec![("indptr", &indptr), ("indices", &indices)];
        if let Some(d) = &data {
            parts.push(("data", d));
        }
        for (name, t) in &parts {
            if t.ndim() != 1 {
                return Err(Error::invalid_argument(
                    "csr",
                    format!("{} must be 1-D, got shape {:?}", name, t.shape()),
                ));
            }
            if t.dtype() != id_dtype {
                return Err(Error::DTypeMismatch {
                    lhs: id_dtype,
                    rhs: t.dtype(),
                });
            }
            if t.device() != indptr.device() {
                return Err(Error::DeviceMismatch {
                    expected: indptr.device(),
                    got: t.device(),
                    tensor: *name,
                });
            }
        }

        if indptr.numel() != num_rows + 1 {
            return Err(Error::ShapeMismatch {
                expected: vec![num_rows + 1],
                got: vec![indptr.numel()],
            });
        }
        if let Some(d) = &data {
            if d.numel() != indices.numel() {
                return Err(Error::ShapeMismatch {
                    expected: vec![indices.numel()],
                    got: vec![d.numel()],
                });
            }
        }

        let csr = Self {
            indptr,
            indices,
            data,
            shape,
            sorted,
        };
        csr.validate()?;
        Ok(csr)
    }

    /// Create a CPU adjacency from typed slices
    ///
    /// # Example
    ///
    /// ```
    /// use graphr::sparse::CsrData;
    /// let csr = CsrData::from_slices(&[0i64, 2, 3], &[0, 1, 0], None, [2, 2]).unwrap();
    /// assert_eq!(csr.nnz(), 3);
    /// ```
    pub fn from_slices<I: IdElement>(
        indptr: &[I],
        indices: &[I],
        data: Option<&[I]>,
        shape: [usize; 2],
    ) -> Result<Self> {
        Self::new(
            Tensor::try_from_slice(indptr, &[indptr.len()], Device::Cpu)?,
            Tensor::try_from_slice(indices, &[indices.len()], Device::Cpu)?,
            data.map(|d| Tensor::try_from_slice(d, &[d.len()], Device::Cpu))
                .transpose()?,
            shape,
            false,
        )
    }

    /// Check `indptr[0] == 0`, monotonic `indptr`, `indptr[num_rows] == nnz`
    /// and column ids within `[0, num_cols)`
    pub fn validate(&self) -> Result<()> {
        crate::dispatch_id_dtype!(self.id_dtype(), I => {
            validate_typed(&self.view::<I>()?)
        }, "csr_validate")
    }

    // ===== Accessors =====

    /// Row pointers
    pub fn indptr(&self) -> &Tensor {
        &self.indptr
    }

    /// Column (source) ids
    pub fn indices(&self) -> &Tensor {
        &self.indices
    }

    /// Explicit edge ids, if any
    pub fn data(&self) -> Option<&Tensor> {
        self.data.as_ref()
    }

    /// Shape as `[num_rows, num_cols]`
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns
    pub fn num_cols(&self) -> usize {
        self.shape[1]
    }

    /// Number of stored edges
    pub fn nnz(&self) -> usize {
        self.indices.numel()
    }

    /// Dtype shared by all id arrays
    pub fn id_dtype(&self) -> DType {
        self.indptr.dtype()
    }

    /// Device of the id arrays
    pub fn device(&self) -> Device {
        self.indptr.device()
    }

    /// Returns true if column ids are sorted within each row
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Number of edges stored in `row`
    pub fn row_nnz(&self, row: usize) -> Result<usize> {
        if row >= self.num_rows() {
            return Err(Error::IndexOutOfBounds {
                index: row,
                size: self.num_rows(),
            });
        }
        crate::dispatch_id_dtype!(self.id_dtype(), I => {
            Ok(self.view::<I>()?.row_range(row).len())
        }, "csr_row_nnz")
    }

    /// Number of edges of every row, as an id tensor of length `num_rows`
    ///
    /// With rows as destinations this is the in-degree of every node.
    pub fn in_degrees(&self) -> Result<Tensor> {
        crate::dispatch_id_dtype!(self.id_dtype(), I => {
            let view = self.view::<I>()?;
            let degrees: Vec<I> = (0..view.num_rows)
                .map(|r| I::from_usize(view.row_range(r).len()))
                .collect();
            Ok(Tensor::from_vec1(degrees))
        }, "csr_in_degrees")
    }

    /// Borrow the id arrays as typed slices
    pub(crate) fn view<I: IdElement>(&self) -> Result<CsrView<'_, I>> {
        Ok(CsrView {
            indptr: self.indptr.as_slice()?,
            indices: self.indices.as_slice()?,
            data: self.data.as_ref().map(|d| d.as_slice()).transpose()?,
            num_rows: self.shape[0],
            num_cols: self.shape[1],
        })
    }
}

/// Wire form of [`CsrData`]; decoding goes through [`CsrData::new`]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct CsrRepr {
    indptr: Tensor,
    indices: Tensor,
    data: Option<Tensor>,
    shape: [usize; 2],
    sorted: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<CsrRepr> for CsrData {
    type Error = Error;

    fn try_from(repr: CsrRepr) -> Result<Self> {
        CsrData::new(repr.indptr, repr.indices, repr.data, repr.shape, repr.sorted)
    }
}

fn validate_typed<I: IdElement>(view: &CsrView<'_, I>) -> Result<()> {
    let fail = |reason: String| Err(Error::invalid_argument("csr", reason));
    if view.indptr[0].to_i64() != 0 {
        return fail(format!("indptr[0] must be 0, got {}", view.indptr[0].to_i64()));
    }
    for r in 0..view.num_rows {
        if view.indptr[r + 1] < view.indptr[r] {
            return fail(format!("indptr decreases at row {}", r));
        }
    }
    let last = view.indptr[view.num_rows].to_i64();
    if last != view.indices.len() as i64 {
        return fail(format!(
            "indptr[num_rows] = {} but there are {} indices",
            last,
            view.indices.len()
        ));
    }
    if let Some(bad) = view
        .indices
        .iter()
        .find(|c| !c.is_valid_index() || c.to_usize() >= view.num_cols)
    {
        return fail(format!(
            "column id {} outside [0, {})",
            bad.to_i64(),
            view.num_cols
        ));
    }
    if let Some(data) = view.data {
        if let Some(bad) = data.iter().find(|e| !e.is_valid_index()) {
            return fail(format!("negative edge id {}", bad.to_i64()));
        }
    }
    Ok(())
}

/// Typed borrowed CSR arrays
#[derive(Clone, Copy, Debug)]
pub(crate) struct CsrView<'a, I> {
    pub indptr: &'a [I],
    pub indices: &'a [I],
    pub data: Option<&'a [I]>,
    pub num_rows: usize,
    pub num_cols: usize,
}

impl<I: IdElement> CsrView<'_, I> {
    /// Positions of the entries of `row`
    #[inline]
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.indptr[row].to_usize()..self.indptr[row + 1].to_usize()
    }

    /// Edge id stored at `pos`
    #[inline]
    pub fn eid(&self, pos: usize) -> usize {
        match self.data {
            Some(d) => d[pos].to_usize(),
            None => pos,
        }
    }

    /// Number of stored edges
    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

/// Owned typed CSR arrays produced by conversions
#[derive(Clone, Debug)]
pub(crate) struct CsrParts<I> {
    pub indptr: Vec<I>,
    pub indices: Vec<I>,
    pub data: Vec<I>,
    pub shape: [usize; 2],
}

impl<I: IdElement> CsrParts<I> {
    pub fn view(&self) -> CsrView<'_, I> {
        CsrView {
            indptr: &self.indptr,
            indices: &self.indices,
            data: Some(&self.data),
            num_rows: self.shape[0],
            num_cols: self.shape[1],
        }
    }

    pub fn into_csr(self, sorted: bool) -> CsrData {
        CsrData {
            indptr: Tensor::from_vec1(self.indptr),
            indices: Tensor::from_vec1(self.indices),
            data: Some(Tensor::from_vec1(self.data)),
            shape: self.shape,
            sorted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_validate_catches_bad_indptr() {
        let err = CsrData::from_slices(&[0i32, 2, 1], &[0, 1], None, [2, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = CsrData::from_slices(&[1i32, 2, 3], &[0, 1], None, [2, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = CsrData::from_slices(&[0i32, 1, 3], &[0, 1], None, [2, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_validate_catches_column_out_of_range() {
        let err = CsrData::from_slices(&[0i64, 1], &[5], None, [1, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_new_checks_lengths_and_dtypes() {
        let indptr = Tensor::from_slice(&[0i64, 1], &[2], Device::Cpu);
        let indices = Tensor::from_slice(&[0i32], &[1], Device::Cpu);
        assert!(matches!(
            CsrData::new(indptr.clone(), indices, None, [1, 1], false),
            Err(Error::DTypeMismatch { .. })
        ));
        let indices = Tensor::from_slice(&[0i64], &[1], Device::Cpu);
        assert!(matches!(
            CsrData::new(indptr.clone(), indices.clone(), None, [2, 1], false),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            CsrData::new(indptr, indices.with_device(Device::Cuda(0)), None, [1, 1], false),
            Err(Error::DeviceMismatch { tensor: "indices", .. })
        ));
    }

    #[test]
    fn test_degrees() {
        let csr = CsrData::from_slices(&[0i64, 2, 2, 3], &[0, 1, 0], None, [3, 2]).unwrap();
        assert_eq!(csr.row_nnz(0).unwrap(), 2);
        assert_eq!(csr.row_nnz(1).unwrap(), 0);
        assert!(csr.row_nnz(3).is_err());
        assert_eq!(csr.in_degrees().unwrap().to_vec::<i64>(), vec![2, 0, 1]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_validates() {
        let csr = CsrData::from_slices(&[0i64, 2, 3], &[0, 1, 0], None, [2, 2]).unwrap();
        let value = serde_json::to_value(&csr).unwrap();
        let back: CsrData = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back.indptr().to_vec::<i64>(), vec![0, 2, 3]);
        assert_eq!(back.shape(), [2, 2]);

        let mut bad_shape = value.clone();
        bad_shape["shape"] = serde_json::json!([5, 2]);
        assert!(serde_json::from_value::<CsrData>(bad_shape).is_err());

        let mut bad_indptr = value;
        bad_indptr["indptr"] =
            serde_json::to_value(Tensor::from_slice(&[0i64, 3, 2], &[3], Device::Cpu)).unwrap();
        let err = serde_json::from_value::<CsrData>(bad_indptr).unwrap_err();
        assert!(err.to_string().contains("indptr"), "{}", err);
    }

    #[test]
    fn test_view_edge_ids() {
        let csr = CsrData::from_slices(&[0i32, 2], &[1, 0], Some(&[7, 3]), [1, 2]).unwrap();
        let view = csr.view::<i32>().unwrap();
        assert_eq!(view.eid(0), 7);
        assert_eq!(view.eid(1), 3);
    }
}
