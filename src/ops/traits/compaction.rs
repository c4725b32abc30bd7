//! Graph compaction (id relabelling) operations trait

use crate::error::Result;
use crate::sparse::CooData;
use crate::tensor::Tensor;

/// Result of [`CompactionOps::compact_ids`]
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompactedIds {
    /// Distinct ids; `unique[compacted[i]] == ids[i]`
    pub unique: Tensor,
    /// New id of every input position
    pub compacted: Tensor,
}

/// Result of [`CompactionOps::unique_and_compact`]
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompactedEdges {
    /// Distinct node ids, starting with the destination ids
    pub unique_nodes: Tensor,
    /// Relabelled source ids
    pub src: Tensor,
    /// Relabelled destination ids
    pub dst: Tensor,
}

/// Result of [`CompactionOps::compact_graphs`]
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompactedGraphs {
    /// Input graphs over the compacted node space
    pub graphs: Vec<CooData>,
    /// Original id of every compacted node
    pub induced_nodes: Tensor,
}

/// Relabel sparse id sets onto a dense `0..n` range
///
/// Ids given as `leading` keep their order and take `0..leading.len()`.
/// The remaining distinct ids take the following values in descending id
/// order, so the largest new id gets the smallest new value.
pub trait CompactionOps {
    /// Relabel `ids`, placing `leading` first
    ///
    /// # Example
    ///
    /// ```
    /// use graphr::prelude::*;
    ///
    /// let client = CpuClient::new();
    /// let ids = Tensor::from_slice(&[7i64, 3, 7, 5], &[4], Device::Cpu);
    /// let out = client.compact_ids(&ids, None).unwrap();
    /// assert_eq!(out.unique.to_vec::<i64>(), vec![7, 5, 3]);
    /// assert_eq!(out.compacted.to_vec::<i64>(), vec![0, 2, 0, 1]);
    /// ```
    fn compact_ids(&self, ids: &Tensor, leading: Option<&Tensor>) -> Result<CompactedIds>;

    /// Relabel the endpoints of sampled edges around their destinations
    ///
    /// `unique_dst` becomes the leading block of the node space; every id
    /// of `dst` must occur in it.
    fn unique_and_compact(
        &self,
        src: &Tensor,
        dst: &Tensor,
        unique_dst: &Tensor,
    ) -> Result<CompactedEdges>;

    /// Relabel several graphs onto the union of their endpoints
    ///
    /// Ids in `always_preserve` are kept even when no edge touches them
    /// and come first. Edge ids carry over unchanged.
    fn compact_graphs(
        &self,
        graphs: &[CooData],
        always_preserve: Option<&Tensor>,
    ) -> Result<CompactedGraphs>;
}
