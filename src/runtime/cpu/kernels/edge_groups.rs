//! Edge layouts shared by the forward and backward kernels

use crate::dtype::{DType, IdElement};
use crate::error::{Error, Result};
use crate::ops::{Operand, Target};
use crate::sparse::{Adjacency, CsrView, expand_rows, group_by_key};
use crate::tensor::Tensor;

/// Edges grouped by destination row
///
/// Positions `indptr[d]..indptr[d + 1]` are the in-edges of `d`; for a COO
/// input they follow the original edge order.
#[derive(Debug)]
pub(crate) struct EdgeGroups {
    pub indptr: Vec<usize>,
    pub src: Vec<usize>,
    pub dst: Vec<usize>,
    pub eid: Vec<usize>,
    pub num_rows: usize,
    pub num_cols: usize,
}

impl EdgeGroups {
    pub fn new(graph: Adjacency<'_>) -> Result<Self> {
        crate::dispatch_id_dtype!(graph.id_dtype(), I => {
            match graph {
                Adjacency::Csr(csr) => Ok(Self::from_csr(&csr.view::<I>()?)),
                Adjacency::Coo(coo) => {
                    let view = coo.view::<I>()?;
                    let [num_rows, num_cols] = coo.shape();
                    let (indptr, order) =
                        group_by_key(view.nnz(), num_rows, |i| view.row[i].to_usize());
                    Ok(Self {
                        indptr,
                        src: order.iter().map(|&i| view.col[i].to_usize()).collect(),
                        dst: order.iter().map(|&i| view.row[i].to_usize()).collect(),
                        eid: order.iter().map(|&i| view.eid(i)).collect(),
                        num_rows,
                        num_cols,
                    })
                }
            }
        }, "edge_groups")
    }

    fn from_csr<I: IdElement>(view: &CsrView<'_, I>) -> Self {
        Self {
            indptr: view.indptr.iter().map(|p| p.to_usize()).collect(),
            src: view.indices.iter().map(|c| c.to_usize()).collect(),
            dst: expand_rows(view),
            eid: (0..view.nnz()).map(|p| view.eid(p)).collect(),
            num_rows: view.num_rows,
            num_cols: view.num_cols,
        }
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.src.len()
    }

    #[inline]
    pub fn degree(&self, row: usize) -> usize {
        self.indptr[row + 1] - self.indptr[row]
    }

    /// Position of every edge id, for outputs indexed by edge
    ///
    /// Edge ids must form a permutation of `0..nnz`.
    pub fn positions_by_eid(&self) -> Result<Vec<usize>> {
        let nnz = self.nnz();
        let mut pos = vec![usize::MAX; nnz];
        for (p, &e) in self.eid.iter().enumerate() {
            if e >= nnz {
                return Err(Error::IndexOutOfBounds {
                    index: e,
                    size: nnz,
                });
            }
            if pos[e] != usize::MAX {
                return Err(Error::invalid_argument(
                    "graph",
                    format!("edge id {} appears twice", e),
                ));
            }
            pos[e] = p;
        }
        Ok(pos)
    }
}

/// Maps an edge to the feature row an operand reads for it
#[derive(Debug)]
pub(crate) struct Resolver {
    target: Target,
    mapping: Option<Vec<usize>>,
    /// Rows of the feature tensor
    pub rows: usize,
    /// Elements of one feature row
    pub width: usize,
}

impl Resolver {
    pub fn new(operand: &Operand<'_>) -> Result<Self> {
        let mapping = operand
            .mapping
            .map(mapping_to_usize)
            .transpose()?;
        Ok(Self {
            target: operand.target,
            mapping,
            rows: operand.data.num_rows(),
            width: operand.data.row_numel(),
        })
    }

    /// Feature row read for edge `eid` from `src` to `dst`
    #[inline]
    pub fn row(&self, src: usize, dst: usize, eid: usize) -> Result<usize> {
        let id = self.target.select(src, dst, eid);
        let row = match &self.mapping {
            Some(m) => *m.get(id).ok_or(Error::IndexOutOfBounds {
                index: id,
                size: m.len(),
            })?,
            None => id,
        };
        if row >= self.rows {
            return Err(Error::IndexOutOfBounds {
                index: row,
                size: self.rows,
            });
        }
        Ok(row)
    }

    /// Feature row of every position of `edges`
    pub fn rows_by_position(&self, edges: &EdgeGroups) -> Result<Vec<usize>> {
        (0..edges.nnz())
            .map(|p| self.row(edges.src[p], edges.dst[p], edges.eid[p]))
            .collect()
    }
}

fn mapping_to_usize(mapping: &Tensor) -> Result<Vec<usize>> {
    crate::dispatch_id_dtype!(mapping.dtype(), I => {
        mapping
            .as_slice::<I>()?
            .iter()
            .map(|&v| {
                if v.is_valid_index() {
                    Ok(v.to_usize())
                } else {
                    Err(Error::invalid_argument(
                        "mapping",
                        format!("negative feature row {}", v.to_i64()),
                    ))
                }
            })
            .collect()
    }, "mapping")
}

/// Id tensor of dtype `dtype` holding `values` (`-1` stays `-1`)
pub(crate) fn id_tensor(dtype: DType, values: Vec<i64>, shape: &[usize]) -> Result<Tensor> {
    crate::dispatch_id_dtype!(dtype, I => {
        let converted: Vec<I> = values
            .into_iter()
            .map(|v| if v < 0 { I::EMPTY } else { I::from_usize(v as usize) })
            .collect();
        Tensor::from_vec(converted, shape)
    }, "id_tensor")
}

/// Read an id tensor as `i64` values
pub(crate) fn id_values(t: &Tensor) -> Result<Vec<i64>> {
    crate::dispatch_id_dtype!(t.dtype(), I => {
        Ok(t.as_slice::<I>()?.iter().map(|v| v.to_i64()).collect())
    }, "id_values")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Device;
    use crate::sparse::{CooData, CsrData};

    #[test]
    fn test_coo_groups_match_csr() {
        let coo = CooData::from_slices(&[1i64, 0, 1], &[2, 1, 0], None, [2, 3]).unwrap();
        let groups = EdgeGroups::new(Adjacency::Coo(&coo)).unwrap();
        assert_eq!(groups.indptr, vec![0, 1, 3]);
        assert_eq!(groups.src, vec![1, 2, 0]);
        assert_eq!(groups.dst, vec![0, 1, 1]);
        assert_eq!(groups.eid, vec![1, 0, 2]);
        assert_eq!(groups.positions_by_eid().unwrap(), vec![1, 0, 2]);

        let csr = coo.to_csr().unwrap();
        let from_csr = EdgeGroups::new(Adjacency::Csr(&csr)).unwrap();
        assert_eq!(from_csr.src, groups.src);
        assert_eq!(from_csr.eid, groups.eid);
    }

    #[test]
    fn test_positions_reject_foreign_edge_ids() {
        let csr = CsrData::from_slices(&[0i32, 2], &[0, 0], Some(&[0, 5]), [1, 1]).unwrap();
        let groups = EdgeGroups::new(Adjacency::Csr(&csr)).unwrap();
        assert!(matches!(
            groups.positions_by_eid(),
            Err(Error::IndexOutOfBounds { index: 5, .. })
        ));
    }

    #[test]
    fn test_resolver_applies_mapping() {
        let feat = Tensor::zeros(&[2, 3], DType::F32, Device::Cpu);
        let mapping = Tensor::from_slice(&[1i64, 0, 1], &[3], Device::Cpu);
        let resolver = Resolver::new(&Operand::new(&feat, Target::Src).with_mapping(&mapping)).unwrap();
        assert_eq!(resolver.row(2, 0, 0).unwrap(), 1);
        assert_eq!(resolver.width, 3);
        assert!(matches!(
            resolver.row(3, 0, 0),
            Err(Error::IndexOutOfBounds { index: 3, size: 3 })
        ));
        let plain = Resolver::new(&Operand::new(&feat, Target::Edge)).unwrap();
        assert!(plain.row(0, 0, 2).is_err());
    }

    #[test]
    fn test_id_tensor_keeps_sentinel() {
        let t = id_tensor(DType::I32, vec![3, -1], &[2]).unwrap();
        assert_eq!(t.to_vec::<i32>(), vec![3, -1]);
        assert_eq!(id_values(&t).unwrap(), vec![3, -1]);
    }
}
