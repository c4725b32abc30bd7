//! COO (Coordinate) adjacency

use crate::dtype::{DType, IdElement};
use crate::error::{Error, Result};
use crate::runtime::Device;
use crate::tensor::Tensor;

/// COO adjacency: parallel `row`, `col` and optional edge id arrays
///
/// All id arrays share one dtype (`I32` or `I64`). When `data` is absent
/// the position of an entry is its edge id.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "CooRepr")
)]
pub struct CooData {
    pub(crate) row: Tensor,
    pub(crate) col: Tensor,
    pub(crate) data: Option<Tensor>,
    pub(crate) shape: [usize; 2],
    pub(crate) row_sorted: bool,
    pub(crate) col_sorted: bool,
}

impl CooData {
    /// Create a COO adjacency from components
    ///
    /// Lengths, dtypes and devices are checked first, then id ranges by
    /// [`Self::validate`].
    pub fn new(row: Tensor, col: Tensor, data: Option<Tensor>, shape: [usize; 2]) -> Result<Self> {
        let id_dtype = row.dtype();
        if !id_dtype.is_id() {
            return Err(Error::unsupported_dtype(id_dtype, "coo_new"));
        }
        let nnz = row.numel();

        let mut parts: Vec<(&'static str, &Tensor)> = vec![("row", &row), ("col", &col)];
        if let Some(d) = &data {
            parts.push(("data", d));
        }
        for (name, t) in &parts {
            if t.ndim() != 1 {
                return Err(Error::invalid_argument(
                    "coo",
                    format!("{} must be 1-D, got shape {:?}", name, t.shape()),
                ));
            }
            if t.dtype() != id_dtype {
                return Err(Error::DTypeMismatch {
                    lhs: id_dtype,
                    rhs: t.dtype(),
                });
            }
            if t.device() != row.device() {
                return Err(Error::DeviceMismatch {
                    expected: row.device(),
                    got: t.device(),
                    tensor: *name,
                });
            }
            if t.numel() != nnz {
                return Err(Error::ShapeMismatch {
                    expected: vec![nnz],
                    got: vec![t.numel()],
                });
            }
        }

        let coo = Self {
            row,
            col,
            data,
            shape,
            row_sorted: false,
            col_sorted: false,
        };
        coo.validate()?;
        Ok(coo)
    }

    /// Create a CPU adjacency from typed slices
    pub fn from_slices<I: IdElement>(
        row: &[I],
        col: &[I],
        data: Option<&[I]>,
        shape: [usize; 2],
    ) -> Result<Self> {
        Self::new(
            Tensor::try_from_slice(row, &[row.len()], Device::Cpu)?,
            Tensor::try_from_slice(col, &[col.len()], Device::Cpu)?,
            data.map(|d| Tensor::try_from_slice(d, &[d.len()], Device::Cpu))
                .transpose()?,
            shape,
        )
    }

    /// Mark the adjacency as sorted by row and, within rows, by column
    pub fn with_sorted(mut self, row_sorted: bool, col_sorted: bool) -> Self {
        self.row_sorted = row_sorted;
        self.col_sorted = col_sorted;
        self
    }

    /// Check that every row id is in `[0, num_rows)` and every column id in
    /// `[0, num_cols)`
    pub fn validate(&self) -> Result<()> {
        crate::dispatch_id_dtype!(self.id_dtype(), I => {
            let view = self.view::<I>()?;
            check_range("row", view.row, view.num_rows)?;
            check_range("col", view.col, view.num_cols)?;
            if let Some(data) = view.data {
                if let Some(bad) = data.iter().find(|e| !e.is_valid_index()) {
                    return Err(Error::invalid_argument(
                        "coo",
                        format!("negative edge id {}", bad.to_i64()),
                    ));
                }
            }
            Ok(())
        }, "coo_validate")
    }

    // ===== Accessors =====

    /// Row (destination) ids
    pub fn row(&self) -> &Tensor {
        &self.row
    }

    /// Column (source) ids
    pub fn col(&self) -> &Tensor {
        &self.col
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
        self.row.numel()
    }

    /// Dtype shared by all id arrays
    pub fn id_dtype(&self) -> DType {
        self.row.dtype()
    }

    /// Device of the id arrays
    pub fn device(&self) -> Device {
        self.row.device()
    }

    /// Returns true if entries are sorted by row
    pub fn is_row_sorted(&self) -> bool {
        self.row_sorted
    }

    /// Returns true if entries are sorted by column within each row
    pub fn is_col_sorted(&self) -> bool {
        self.col_sorted
    }

    /// Borrow the id arrays as typed slices
    pub(crate) fn view<I: IdElement>(&self) -> Result<CooView<'_, I>> {
        Ok(CooView {
            row: self.row.as_slice()?,
            col: self.col.as_slice()?,
            data: self.data.as_ref().map(|d| d.as_slice()).transpose()?,
            num_rows: self.shape[0],
            num_cols: self.shape[1],
        })
    }
}

/// Wire form of [`CooData`]; decoding goes through [`CooData::new`]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct CooRepr {
    row: Tensor,
    col: Tensor,
    data: Option<Tensor>,
    shape: [usize; 2],
    row_sorted: bool,
    col_sorted: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<CooRepr> for CooData {
    type Error = Error;

    fn try_from(repr: CooRepr) -> Result<Self> {
        Ok(CooData::new(repr.row, repr.col, repr.data, repr.shape)?
            .with_sorted(repr.row_sorted, repr.col_sorted))
    }
}

fn check_range<I: IdElement>(name: &'static str, ids: &[I], bound: usize) -> Result<()> {
    match ids
        .iter()
        .find(|v| !v.is_valid_index() || v.to_usize() >= bound)
    {
        Some(bad) => Err(Error::invalid_argument(
            "coo",
            format!("{} id {} outside [0, {})", name, bad.to_i64(), bound),
        )),
        None => Ok(()),
    }
}

/// Typed borrowed COO arrays
#[derive(Clone, Copy, Debug)]
pub(crate) struct CooView<'a, I> {
    pub row: &'a [I],
    pub col: &'a [I],
    pub data: Option<&'a [I]>,
    pub num_rows: usize,
    pub num_cols: usize,
}

impl<I: IdElement> CooView<'_, I> {
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
        self.row.len()
    }
}

/// Owned typed COO arrays produced by sampling and filtering
#[derive(Clone, Debug, Default)]
pub(crate) struct CooParts<I> {
    pub row: Vec<I>,
    pub col: Vec<I>,
    pub data: Vec<I>,
}

impl<I: IdElement> CooParts<I> {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            row: Vec::with_capacity(n),
            col: Vec::with_capacity(n),
            data: Vec::with_capacity(n),
        }
    }

    #[inline]
    pub fn push(&mut self, row: I, col: I, eid: I) {
        self.row.push(row);
        self.col.push(col);
        self.data.push(eid);
    }

    pub fn into_coo(self, shape: [usize; 2]) -> CooData {
        CooData {
            row: Tensor::from_vec1(self.row),
            col: Tensor::from_vec1(self.col),
            data: Some(Tensor::from_vec1(self.data)),
            shape,
            row_sorted: false,
            col_sorted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slices_validates_range() {
        assert!(CooData::from_slices(&[0i64, 1], &[1, 0], None, [2, 2]).is_ok());
        assert!(matches!(
            CooData::from_slices(&[0i64, 2], &[1, 0], None, [2, 2]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(CooData::from_slices(&[0i32, -1], &[1, 0], None, [2, 2]).is_err());
    }

    #[test]
    fn test_new_checks_lengths() {
        let row = Tensor::from_slice(&[0i64, 1], &[2], Device::Cpu);
        let col = Tensor::from_slice(&[0i64], &[1], Device::Cpu);
        assert!(matches!(
            CooData::new(row, col, None, [2, 2]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_validates() {
        let coo = CooData::from_slices(&[1i64, 0], &[0, 1], Some(&[3, 4]), [2, 2])
            .unwrap()
            .with_sorted(false, true);
        let value = serde_json::to_value(&coo).unwrap();
        let back: CooData = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back.data().unwrap().to_vec::<i64>(), vec![3, 4]);
        assert!(back.is_col_sorted());

        let mut bad_shape = value;
        bad_shape["shape"] = serde_json::json!([1, 2]);
        let err = serde_json::from_value::<CooData>(bad_shape).unwrap_err();
        assert!(err.to_string().contains("row id 1"), "{}", err);
    }

    #[test]
    fn test_implicit_edge_ids() {
        let coo = CooData::from_slices(&[1i32, 0], &[0, 1], None, [2, 2]).unwrap();
        let view = coo.view::<i32>().unwrap();
        assert_eq!(view.eid(1), 1);
        assert_eq!(coo.nnz(), 2);
        assert!(!coo.is_row_sorted());
    }
}
