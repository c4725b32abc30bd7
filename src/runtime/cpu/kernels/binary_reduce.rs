//! Forward binary-reduce (SpMM / SDDMM) on the CPU

use super::{EdgeGroups, Messages, id_tensor};
use crate::dtype::{DType, FloatElement};
use crate::error::Result;
use crate::ops::{BcastInfo, BinaryOp, Operand, ReduceOp, ReduceOutput, Target};
use crate::runtime::cpu::CpuClient;
use crate::runtime::cpu::parallel::{for_each_row_mut, for_each_row_mut2};
use crate::tensor::Tensor;
use tracing::trace;

/// Compute `reduce` over the messages `op(lhs, rhs)` of every edge
///
/// With `out_target == Dst` the output has one row per destination node;
/// with `out_target == Edge` (only `ReduceOp::None`) one row per edge id.
#[allow(clippy::too_many_arguments)]
pub(crate) fn binary_reduce<T: FloatElement>(
    client: &CpuClient,
    edges: &EdgeGroups,
    info: &BcastInfo,
    op: BinaryOp,
    reduce: ReduceOp,
    lhs: Option<&Operand<'_>>,
    rhs: Option<&Operand<'_>>,
    out_target: Target,
    id_dtype: DType,
) -> Result<ReduceOutput> {
    let msgs = Messages::<T>::new(edges, info, op, lhs, rhs)?;
    let out_len = msgs.out_len;

    match out_target {
        Target::Edge => {
            let nnz = edges.nnz();
            let pos_of = edges.positions_by_eid()?;
            let mut out = vec![T::zero(); nnz * out_len];
            for_each_row_mut(client, &mut out, out_len, |e, row| {
                let (lr, rr) = msgs.rows_at(pos_of[e]);
                for (tx, o) in row.iter_mut().enumerate() {
                    *o = msgs.eval(lr, rr, tx);
                }
            });
            trace!(nnz, out_len, "edge messages written");
            Ok(ReduceOutput {
                out: Tensor::from_vec(out, &out_shape(nnz, info))?,
                arg_src: None,
                arg_edge: None,
            })
        }
        _ => {
            let rows = edges.num_rows;
            let shape = out_shape(rows, info);
            let mut out = vec![T::zero(); rows * out_len];
            if reduce.records_arg() {
                let mut args = vec![(-1i64, -1i64); rows * out_len];
                let is_max = reduce == ReduceOp::Max;
                for_each_row_mut2(client, &mut out, &mut args, out_len, |d, row, arg| {
                    reduce_cmp_row(&msgs, edges, d, is_max, row, arg)
                });
                let (arg_src, arg_edge): (Vec<i64>, Vec<i64>) = args.into_iter().unzip();
                trace!(rows, out_len, %reduce, "destination rows reduced");
                Ok(ReduceOutput {
                    out: Tensor::from_vec(out, &shape)?,
                    arg_src: Some(id_tensor(id_dtype, arg_src, &shape)?),
                    arg_edge: Some(id_tensor(id_dtype, arg_edge, &shape)?),
                })
            } else {
                let mean = reduce == ReduceOp::Mean;
                for_each_row_mut(client, &mut out, out_len, |d, row| {
                    reduce_sum_row(&msgs, edges, d, mean, row)
                });
                trace!(rows, out_len, %reduce, "destination rows reduced");
                Ok(ReduceOutput {
                    out: Tensor::from_vec(out, &shape)?,
                    arg_src: None,
                    arg_edge: None,
                })
            }
        }
    }
}

fn out_shape(rows: usize, info: &BcastInfo) -> Vec<usize> {
    std::iter::once(rows)
        .chain(info.real_out_shape.iter().copied())
        .collect()
}

fn reduce_sum_row<T: FloatElement>(
    msgs: &Messages<'_, T>,
    edges: &EdgeGroups,
    d: usize,
    mean: bool,
    row: &mut [T],
) {
    for p in edges.indptr[d]..edges.indptr[d + 1] {
        let (lr, rr) = msgs.rows_at(p);
        for (tx, o) in row.iter_mut().enumerate() {
            *o = *o + msgs.eval(lr, rr, tx);
        }
    }
    let deg = edges.degree(d);
    if mean && deg > 0 {
        let deg = T::from_f64(deg as f64);
        row.iter_mut().for_each(|o| *o = *o / deg);
    }
}

fn reduce_cmp_row<T: FloatElement>(
    msgs: &Messages<'_, T>,
    edges: &EdgeGroups,
    d: usize,
    is_max: bool,
    row: &mut [T],
    arg: &mut [(i64, i64)],
) {
    let identity = if is_max {
        T::neg_infinity()
    } else {
        T::infinity()
    };
    row.iter_mut().for_each(|o| *o = identity);
    for p in edges.indptr[d]..edges.indptr[d + 1] {
        let (lr, rr) = msgs.rows_at(p);
        for (tx, (o, a)) in row.iter_mut().zip(arg.iter_mut()).enumerate() {
            let v = msgs.eval(lr, rr, tx);
            if (is_max && v > *o) || (!is_max && v < *o) {
                *o = v;
                *a = (edges.src[p] as i64, edges.eid[p] as i64);
            }
        }
    }
    for (o, a) in row.iter_mut().zip(arg.iter()) {
        if a.1 < 0 {
            *o = T::zero();
        }
    }
}
