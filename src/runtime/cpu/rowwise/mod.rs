//! Row-wise pick engine
//!
//! One generic algorithm drives every row-wise sampler: for each queried
//! row a [`PickPolicy`] first says how many edges it keeps, an exclusive
//! scan over those counts lays out the output, then the policy writes the
//! chosen positions of each row into its own disjoint output segment. Both
//! phases run in parallel over the queried rows.
//!
//! Randomness is per row: the row at position `i` of the query draws from a
//! generator seeded by `(call seed, i)`, so with a fixed
//! [`ClientConfig::seed`](super::ClientConfig::seed) the output does not
//! depend on thread scheduling.

mod biased;
mod topk;
mod uniform;
mod weighted;

pub use biased::BiasedPick;
pub use topk::TopkPick;
pub use uniform::UniformPick;
pub use weighted::WeightedPick;

use super::CpuClient;
use super::parallel::{exclusive_scan, try_for_each_segment_mut, try_map_range};
use super::random::{call_seed, row_rng};
use crate::dtype::IdElement;
use crate::error::{Error, Result};
use crate::sparse::{CooData, CooParts, CsrData, CsrView, coo_to_csr_parts};
use crate::tensor::Tensor;
use rand::rngs::StdRng;

/// The slice of the adjacency a policy sees for one row
#[derive(Clone, Copy, Debug)]
pub struct RowContext<'a, I> {
    /// Row id
    pub row: usize,
    /// Position of the row's first entry in the adjacency
    pub offset: usize,
    /// Column ids of the row
    pub cols: &'a [I],
    data: Option<&'a [I]>,
}

impl<I: IdElement> RowContext<'_, I> {
    /// Number of entries in the row
    #[inline]
    pub fn len(&self) -> usize {
        self.cols.len()
    }

    /// Returns true if the row has no entry
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// Edge id of the `j`-th entry of the row
    #[inline]
    pub fn eid(&self, j: usize) -> usize {
        match self.data {
            Some(d) => d[j].to_usize(),
            None => self.offset + j,
        }
    }

    /// Write `offset + j` for every `j` yielded by `positions` into `out`
    pub(crate) fn write_positions(&self, positions: impl Iterator<Item = usize>, out: &mut [usize]) {
        for (slot, j) in out.iter_mut().zip(positions) {
            *slot = self.offset + j;
        }
    }
}

/// Strategy deciding which edges of a row are kept
///
/// `pick` receives exactly `num_picks` output slots and must fill them
/// with absolute positions in `[ctx.offset, ctx.offset + ctx.len())`.
pub trait PickPolicy<I: IdElement>: Sync {
    /// Number of edges kept from the row
    fn num_picks(&self, ctx: &RowContext<'_, I>) -> Result<usize>;

    /// Choose the positions of the kept edges
    fn pick(
        &self,
        ctx: &RowContext<'_, I>,
        num_picks: usize,
        rng: &mut StdRng,
        out: &mut [usize],
    ) -> Result<()>;
}

/// Number of picks of the uniform arithmetic over `available` candidates
///
/// `-1` takes every candidate; with replacement any positive request is
/// honoured unless there is nothing to draw from.
pub(crate) fn count_picks(num_samples: i64, replace: bool, available: usize) -> usize {
    if num_samples < 0 {
        available
    } else if replace {
        if available == 0 { 0 } else { num_samples as usize }
    } else {
        available.min(num_samples as usize)
    }
}

pub(crate) fn check_num_samples(num_samples: i64) -> Result<()> {
    if num_samples < -1 {
        return Err(Error::invalid_argument(
            "num_samples",
            format!("must be -1 (all) or non-negative, got {}", num_samples),
        ));
    }
    Ok(())
}

/// Pick edges of the queried `rows` of a CSR adjacency
///
/// The result has the shape of `csr`; its `row` holds the queried row id,
/// `col` the picked column and `data` the original edge id of every
/// picked edge.
pub fn csr_rowwise_pick<I, P>(
    client: &CpuClient,
    csr: &CsrData,
    rows: &Tensor,
    policy: &P,
) -> Result<CooData>
where
    I: IdElement,
    P: PickPolicy<I>,
{
    let view = csr.view::<I>()?;
    let parts = pick_rows(client, &view, rows.as_slice::<I>()?, policy)?;
    Ok(parts.into_coo(csr.shape()))
}

/// Pick edges of the queried `rows` of a COO adjacency
///
/// Edges are first bucketed by row with a stable counting sort, so the
/// positions a policy sees follow the original edge order within each row.
pub fn coo_rowwise_pick<I, P>(
    client: &CpuClient,
    coo: &CooData,
    rows: &Tensor,
    policy: &P,
) -> Result<CooData>
where
    I: IdElement,
    P: PickPolicy<I>,
{
    let buckets = coo_to_csr_parts(&coo.view::<I>()?);
    let parts = pick_rows(client, &buckets.view(), rows.as_slice::<I>()?, policy)?;
    Ok(parts.into_coo(coo.shape()))
}

fn row_context<'a, I: IdElement>(view: &CsrView<'a, I>, row: I) -> Result<RowContext<'a, I>> {
    if !row.is_valid_index() {
        return Err(Error::invalid_argument(
            "rows",
            format!("negative row id {}", row.to_i64()),
        ));
    }
    let r = row.to_usize();
    if r >= view.num_rows {
        return Err(Error::IndexOutOfBounds {
            index: r,
            size: view.num_rows,
        });
    }
    let range = view.row_range(r);
    Ok(RowContext {
        row: r,
        offset: range.start,
        cols: &view.indices[range.clone()],
        data: view.data.map(|d| &d[range]),
    })
}

fn pick_rows<I, P>(
    client: &CpuClient,
    view: &CsrView<'_, I>,
    rows: &[I],
    policy: &P,
) -> Result<CooParts<I>>
where
    I: IdElement,
    P: PickPolicy<I>,
{
    let counts = try_map_range(client, rows.len(), |i| {
        policy.num_picks(&row_context(view, rows[i])?)
    })?;
    let offsets = exclusive_scan(&counts);
    let total = offsets[rows.len()];
    tracing::trace!(rows = rows.len(), total, "row-wise pick counts");

    let seed = call_seed(client.seed());
    let mut picked = vec![0usize; total];
    try_for_each_segment_mut(client, &mut picked, &offsets, |i, out| {
        if out.is_empty() {
            return Ok(());
        }
        let ctx = row_context(view, rows[i])?;
        let mut rng = row_rng(seed, i);
        policy.pick(&ctx, out.len(), &mut rng, out)?;
        let end = ctx.offset + ctx.len();
        match out.iter().find(|&&p| p < ctx.offset || p >= end) {
            Some(&p) => Err(Error::Internal(format!(
                "policy picked position {} outside row {} range [{}, {})",
                p, ctx.row, ctx.offset, end
            ))),
            None => Ok(()),
        }
    })?;

    let mut parts = CooParts::with_capacity(total);
    for (i, w) in offsets.windows(2).enumerate() {
        for &pos in &picked[w[0]..w[1]] {
            parts.push(rows[i], view.indices[pos], I::from_usize(view.eid(pos)));
        }
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Keeps the last entry of every non-empty row
    struct LastEdge;

    impl PickPolicy<i64> for LastEdge {
        fn num_picks(&self, ctx: &RowContext<'_, i64>) -> Result<usize> {
            Ok(usize::from(!ctx.is_empty()))
        }

        fn pick(
            &self,
            ctx: &RowContext<'_, i64>,
            _num_picks: usize,
            _rng: &mut StdRng,
            out: &mut [usize],
        ) -> Result<()> {
            out[0] = ctx.offset + ctx.len() - 1;
            Ok(())
        }
    }

    /// Picks a position outside of the row
    struct OutOfRow;

    impl PickPolicy<i64> for OutOfRow {
        fn num_picks(&self, _ctx: &RowContext<'_, i64>) -> Result<usize> {
            Ok(1)
        }

        fn pick(
            &self,
            ctx: &RowContext<'_, i64>,
            _num_picks: usize,
            _rng: &mut StdRng,
            out: &mut [usize],
        ) -> Result<()> {
            out[0] = ctx.offset + ctx.len();
            Ok(())
        }
    }

    fn graph() -> CsrData {
        // row 0: {1, 2}, row 1: {}, row 2: {0}
        CsrData::from_slices(&[0i64, 2, 2, 3], &[1, 2, 0], Some(&[10, 11, 12]), [3, 3]).unwrap()
    }

    #[test]
    fn test_custom_policy_through_engine() {
        let client = CpuClient::new();
        let rows = Tensor::from_slice(&[2i64, 0, 1, 0], &[4], crate::runtime::Device::Cpu);
        let out = csr_rowwise_pick(&client, &graph(), &rows, &LastEdge).unwrap();
        assert_eq!(out.row().to_vec::<i64>(), vec![2, 0, 0]);
        assert_eq!(out.col().to_vec::<i64>(), vec![0, 2, 2]);
        assert_eq!(out.data().unwrap().to_vec::<i64>(), vec![12, 11, 11]);
        assert_eq!(out.shape(), [3, 3]);
    }

    #[test]
    fn test_rows_out_of_range() {
        let client = CpuClient::new();
        let rows = Tensor::from_slice(&[3i64], &[1], crate::runtime::Device::Cpu);
        assert!(matches!(
            csr_rowwise_pick(&client, &graph(), &rows, &LastEdge),
            Err(Error::IndexOutOfBounds { index: 3, size: 3 })
        ));
    }

    #[test]
    fn test_engine_rejects_positions_outside_row() {
        let client = CpuClient::new();
        let rows = Tensor::from_slice(&[0i64], &[1], crate::runtime::Device::Cpu);
        assert!(matches!(
            csr_rowwise_pick(&client, &graph(), &rows, &OutOfRow),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_count_picks() {
        assert_eq!(count_picks(-1, false, 4), 4);
        assert_eq!(count_picks(2, false, 4), 2);
        assert_eq!(count_picks(9, false, 4), 4);
        assert_eq!(count_picks(9, true, 4), 9);
        assert_eq!(count_picks(9, true, 0), 0);
        assert!(check_num_samples(-2).is_err());
    }
}
