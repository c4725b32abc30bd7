//! Format conversions between COO and CSR

use super::coo::CooView;
use super::csr::{CsrParts, CsrView};
use super::{CooData, CsrData};
use crate::dtype::IdElement;
use crate::error::Result;
use crate::tensor::Tensor;

/// Stable counting sort of `n` items by `key(i) < num_keys`
///
/// Returns `(offsets, order)`: items with key `k` are
/// `order[offsets[k]..offsets[k + 1]]`, in increasing item order.
pub(crate) fn group_by_key(
    n: usize,
    num_keys: usize,
    key: impl Fn(usize) -> usize,
) -> (Vec<usize>, Vec<usize>) {
    let mut offsets = vec![0usize; num_keys + 1];
    for i in 0..n {
        offsets[key(i) + 1] += 1;
    }
    for k in 0..num_keys {
        offsets[k + 1] += offsets[k];
    }
    let mut cursor = offsets.clone();
    let mut order = vec![0usize; n];
    for i in 0..n {
        let k = key(i);
        order[cursor[k]] = i;
        cursor[k] += 1;
    }
    (offsets, order)
}

/// Bucket a COO by row; entry data carries the original edge ids
pub(crate) fn coo_to_csr_parts<I: IdElement>(coo: &CooView<'_, I>) -> CsrParts<I> {
    let (offsets, order) = group_by_key(coo.nnz(), coo.num_rows, |i| coo.row[i].to_usize());
    CsrParts {
        indptr: offsets.into_iter().map(I::from_usize).collect(),
        indices: order.iter().map(|&i| coo.col[i]).collect(),
        data: order.iter().map(|&i| I::from_usize(coo.eid(i))).collect(),
        shape: [coo.num_rows, coo.num_cols],
    }
}

/// Bucket a CSR by column (CSC stored as the CSR of the transpose)
pub(crate) fn csr_transpose_parts<I: IdElement>(csr: &CsrView<'_, I>) -> CsrParts<I> {
    let rows = expand_rows(csr);
    let (offsets, order) = group_by_key(csr.nnz(), csr.num_cols, |p| csr.indices[p].to_usize());
    CsrParts {
        indptr: offsets.into_iter().map(I::from_usize).collect(),
        indices: order.iter().map(|&p| I::from_usize(rows[p])).collect(),
        data: order.iter().map(|&p| I::from_usize(csr.eid(p))).collect(),
        shape: [csr.num_cols, csr.num_rows],
    }
}

/// Row id of every stored position
pub(crate) fn expand_rows<I: IdElement>(csr: &CsrView<'_, I>) -> Vec<usize> {
    let mut rows = Vec::with_capacity(csr.nnz());
    for r in 0..csr.num_rows {
        rows.extend(std::iter::repeat_n(r, csr.row_range(r).len()));
    }
    rows
}

impl CooData {
    /// Convert to CSR with a stable counting sort by row
    ///
    /// Edges keep their relative order within each row and the result's
    /// `data` holds the original edge ids.
    pub fn to_csr(&self) -> Result<CsrData> {
        crate::dispatch_id_dtype!(self.id_dtype(), I => {
            let parts = coo_to_csr_parts(&self.view::<I>()?);
            Ok(parts.into_csr(self.col_sorted))
        }, "coo_to_csr")
    }
}

impl CsrData {
    /// Convert to COO (row-sorted)
    pub fn to_coo(&self) -> Result<CooData> {
        crate::dispatch_id_dtype!(self.id_dtype(), I => {
            let view = self.view::<I>()?;
            let rows: Vec<I> = expand_rows(&view).into_iter().map(I::from_usize).collect();
            Ok(CooData {
                row: Tensor::from_vec1(rows),
                col: self.indices.clone(),
                data: self.data.clone(),
                shape: self.shape,
                row_sorted: true,
                col_sorted: self.sorted,
            })
        }, "csr_to_coo")
    }

    /// Transpose: rows become columns
    ///
    /// With rows as destinations this turns the in-edge CSR into the
    /// out-edge CSR. `data` keeps the original edge ids.
    pub fn transpose(&self) -> Result<CsrData> {
        crate::dispatch_id_dtype!(self.id_dtype(), I => {
            Ok(csr_transpose_parts(&self.view::<I>()?).into_csr(true))
        }, "csr_transpose")
    }
}
