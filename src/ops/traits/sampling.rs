//! Row-wise sampling operations trait

use crate::error::Result;
use crate::sparse::{CooData, CsrData};
use crate::tensor::Tensor;

/// Row-wise neighbor sampling and top-k selection
///
/// Every operation takes an adjacency and a 1-D id tensor `rows` of the
/// rows to process (any order, repeats allowed) and returns a [`CooData`]
/// with the shape of the input whose entries are the picked edges: `row`
/// is the queried row, `col` the neighbor and `data` the original edge id.
/// Picked edges of one row are contiguous and rows keep the order of
/// `rows`.
///
/// `num_samples == -1` keeps every qualifying edge. Per-edge arrays
/// (`prob`, `weight`) are indexed by edge id.
pub trait SamplingOps {
    /// Sample up to `num_samples` edges per row uniformly
    ///
    /// # Example
    ///
    /// ```
    /// use graphr::prelude::*;
    ///
    /// let client = CpuClient::new();
    /// let csr = CsrData::from_slices(&[0i64, 2, 3], &[0, 1, 0], None, [2, 2]).unwrap();
    /// let rows = Tensor::from_slice(&[0i64, 1], &[2], Device::Cpu);
    /// let picked = client.csr_rowwise_sampling_uniform(&csr, &rows, -1, false).unwrap();
    /// assert_eq!(picked.nnz(), 3);
    /// ```
    fn csr_rowwise_sampling_uniform(
        &self,
        csr: &CsrData,
        rows: &Tensor,
        num_samples: i64,
        replace: bool,
    ) -> Result<CooData>;

    /// Sample edges with probability proportional to `prob[edge id]`
    ///
    /// Probabilities must be finite and non-negative. Zero-probability edges
    /// are never picked; without replacement a row keeps at most its number
    /// of positive-probability edges.
    fn csr_rowwise_sampling(
        &self,
        csr: &CsrData,
        rows: &Tensor,
        num_samples: i64,
        prob: &Tensor,
        replace: bool,
    ) -> Result<CooData>;

    /// Sample edges with per-tag bias
    ///
    /// `tag_offset` is a `[num_rows, num_tags + 1]` id tensor of segment
    /// offsets relative to each row start (the entries of every row must be
    /// grouped by tag); `bias` is a `[num_tags]` float tensor.
    fn csr_rowwise_sampling_biased(
        &self,
        csr: &CsrData,
        rows: &Tensor,
        num_samples: i64,
        tag_offset: &Tensor,
        bias: &Tensor,
        replace: bool,
    ) -> Result<CooData>;

    /// Keep the `k` edges of largest (`ascending == false`) or smallest
    /// `weight[edge id]` per row
    ///
    /// Fails if a queried row has fewer than `k` edges.
    fn csr_rowwise_topk(
        &self,
        csr: &CsrData,
        rows: &Tensor,
        k: usize,
        weight: &Tensor,
        ascending: bool,
    ) -> Result<CooData>;

    /// [`Self::csr_rowwise_sampling_uniform`] over a COO adjacency
    fn coo_rowwise_sampling_uniform(
        &self,
        coo: &CooData,
        rows: &Tensor,
        num_samples: i64,
        replace: bool,
    ) -> Result<CooData>;

    /// [`Self::csr_rowwise_sampling`] over a COO adjacency
    fn coo_rowwise_sampling(
        &self,
        coo: &CooData,
        rows: &Tensor,
        num_samples: i64,
        prob: &Tensor,
        replace: bool,
    ) -> Result<CooData>;

    /// [`Self::csr_rowwise_topk`] over a COO adjacency
    fn coo_rowwise_topk(
        &self,
        coo: &CooData,
        rows: &Tensor,
        k: usize,
        weight: &Tensor,
        ascending: bool,
    ) -> Result<CooData>;
}
