//! CPU implementation of id compaction

use super::CpuClient;
use super::IdHashMap;
use super::parallel::map_range;
use crate::dtype::{DType, IdElement};
use crate::error::{Error, Result};
use crate::ops::{CompactedEdges, CompactedGraphs, CompactedIds, CompactionOps};
use crate::runtime::Device;
use crate::sparse::{CooData, CooParts};
use crate::tensor::Tensor;
use tracing::{debug, trace};

/// Build the relabelling map of `leading ++ ids`
///
/// Returns the map and the reverse map (`leading` followed by the new ids
/// in descending order).
fn relabel<I: IdElement>(
    client: &CpuClient,
    leading: &[I],
    ids: &[I],
) -> Result<(IdHashMap<I>, Vec<I>)> {
    let (map, mut new_ids) = IdHashMap::init_with_leading(client, leading, ids)?;
    new_ids.sort_unstable();
    let base = leading.len();
    let n = new_ids.len();
    map_range(client, n, |rank| {
        map.set_value(new_ids[rank], I::from_usize(base + n - 1 - rank))
    });
    trace!(leading = base, new = n, "relabelled ids");

    let mut unique = Vec::with_capacity(base + n);
    unique.extend_from_slice(leading);
    unique.extend(new_ids.iter().rev().copied());
    Ok((map, unique))
}

fn check_id_tensor(t: &Tensor, dtype: DType, name: &'static str) -> Result<()> {
    if t.device() != Device::Cpu {
        return Err(Error::DeviceMismatch {
            expected: Device::Cpu,
            got: t.device(),
            tensor: name,
        });
    }
    if t.dtype() != dtype {
        return Err(Error::DTypeMismatch {
            lhs: dtype,
            rhs: t.dtype(),
        });
    }
    if t.ndim() != 1 {
        return Err(Error::invalid_argument(
            name,
            format!("expected a 1-D id tensor, got shape {:?}", t.shape()),
        ));
    }
    Ok(())
}

impl CompactionOps for CpuClient {
    fn compact_ids(&self, ids: &Tensor, leading: Option<&Tensor>) -> Result<CompactedIds> {
        const OP: &str = "compact_ids";
        debug!(ids = ids.numel(), leading = leading.map_or(0, |t| t.numel()), "{}", OP);
        self.check_device(ids.device(), OP)?;
        let dtype = ids.dtype();
        check_id_tensor(ids, dtype, "ids")?;
        if let Some(l) = leading {
            check_id_tensor(l, dtype, "leading")?;
        }

        crate::dispatch_id_dtype!(dtype, I => {
            let ids = ids.as_slice::<I>()?;
            let leading = match leading {
                Some(l) => l.as_slice::<I>()?,
                None => &[][..],
            };
            let (map, unique) = relabel(self, leading, ids)?;
            let compacted = map.map_ids(self, ids, I::EMPTY);
            Ok(CompactedIds {
                unique: Tensor::from_vec1(unique),
                compacted: Tensor::from_vec1(compacted),
            })
        }, OP)
    }

    fn unique_and_compact(
        &self,
        src: &Tensor,
        dst: &Tensor,
        unique_dst: &Tensor,
    ) -> Result<CompactedEdges> {
        const OP: &str = "unique_and_compact";
        debug!(
            edges = src.numel(),
            unique_dst = unique_dst.numel(),
            "{}",
            OP
        );
        self.check_device(src.device(), OP)?;
        let dtype = src.dtype();
        check_id_tensor(src, dtype, "src")?;
        check_id_tensor(dst, dtype, "dst")?;
        check_id_tensor(unique_dst, dtype, "unique_dst")?;
        if src.numel() != dst.numel() {
            return Err(Error::shape_mismatch(src.shape(), dst.shape()));
        }

        crate::dispatch_id_dtype!(dtype, I => {
            let src = src.as_slice::<I>()?;
            let dst = dst.as_slice::<I>()?;
            let unique_dst = unique_dst.as_slice::<I>()?;
            let (map, unique) = relabel(self, unique_dst, src)?;

            let num_dst = unique_dst.len();
            let compacted_dst = map.map_ids(self, dst, I::EMPTY);
            if let Some(i) = compacted_dst
                .iter()
                .position(|&v| v == I::EMPTY || v.to_usize() >= num_dst)
            {
                return Err(Error::IdNotFound {
                    id: dst[i].to_i64(),
                    universe: "unique_dst_ids",
                });
            }
            Ok(CompactedEdges {
                unique_nodes: Tensor::from_vec1(unique),
                src: Tensor::from_vec1(map.map_ids(self, src, I::EMPTY)),
                dst: Tensor::from_vec1(compacted_dst),
            })
        }, OP)
    }

    fn compact_graphs(
        &self,
        graphs: &[CooData],
        always_preserve: Option<&Tensor>,
    ) -> Result<CompactedGraphs> {
        const OP: &str = "compact_graphs";
        debug!(graphs = graphs.len(), "{}", OP);
        let Some(first) = graphs.first() else {
            return Err(Error::invalid_argument("graphs", "expected at least one graph"));
        };
        let dtype = first.id_dtype();
        for g in graphs {
            self.check_device(g.device(), OP)?;
            if g.id_dtype() != dtype {
                return Err(Error::DTypeMismatch {
                    lhs: dtype,
                    rhs: g.id_dtype(),
                });
            }
        }
        if let Some(p) = always_preserve {
            check_id_tensor(p, dtype, "always_preserve")?;
        }

        crate::dispatch_id_dtype!(dtype, I => {
            let mut endpoints: Vec<I> = Vec::with_capacity(graphs.iter().map(|g| 2 * g.nnz()).sum());
            for g in graphs {
                let view = g.view::<I>()?;
                endpoints.extend_from_slice(view.row);
                endpoints.extend_from_slice(view.col);
            }
            let preserve = match always_preserve {
                Some(p) => p.as_slice::<I>()?,
                None => &[][..],
            };
            let (map, unique) = relabel(self, preserve, &endpoints)?;
            let n = unique.len();

            let mut out = Vec::with_capacity(graphs.len());
            for g in graphs {
                let view = g.view::<I>()?;
                let mut parts = CooParts::with_capacity(view.nnz());
                for p in 0..view.nnz() {
                    parts.push(
                        map.map(view.row[p], I::EMPTY),
                        map.map(view.col[p], I::EMPTY),
                        I::from_usize(view.eid(p)),
                    );
                }
                out.push(parts.into_coo([n, n]));
            }
            trace!(nodes = n, "compacted graphs");
            Ok(CompactedGraphs {
                graphs: out,
                induced_nodes: Tensor::from_vec1(unique),
            })
        }, OP)
    }
}
