//! Backward pass of binary-reduce
//!
//! Every output element that received a message is turned into a
//! contribution naming the operand rows it read. Contributions are then
//! bucketed by operand row, so each gradient row is accumulated by exactly
//! one worker without atomics.

use super::{EdgeGroups, Messages, id_values};
use crate::dtype::FloatElement;
use crate::error::{Error, Result};
use crate::ops::{BcastInfo, BinaryOp, GradTarget, Gradients, Operand, ReduceOp, ReduceOutput, Target};
use crate::runtime::cpu::CpuClient;
use crate::runtime::cpu::parallel::for_each_row_mut;
use crate::sparse::group_by_key;
use crate::tensor::Tensor;
use tracing::trace;

struct Contribution<T> {
    out_row: usize,
    /// Single output coordinate (max/min winners) or the whole row
    only: Option<usize>,
    lhs_row: usize,
    rhs_row: usize,
    scale: T,
}

/// Gradients of `binary_reduce` with respect to the requested operands
#[allow(clippy::too_many_arguments)]
pub(crate) fn backward_binary_reduce<T: FloatElement>(
    client: &CpuClient,
    edges: &EdgeGroups,
    info: &BcastInfo,
    op: BinaryOp,
    reduce: ReduceOp,
    lhs: Option<&Operand<'_>>,
    rhs: Option<&Operand<'_>>,
    out_target: Target,
    forward: &ReduceOutput,
    grad_out: &Tensor,
    grad: GradTarget,
) -> Result<Gradients> {
    let msgs = Messages::<T>::new(edges, info, op, lhs, rhs)?;
    let contribs = contributions(&msgs, edges, reduce, out_target, forward)?;
    let grad_out = grad_out.as_slice::<T>()?;
    trace!(contributions = contribs.len(), "gradient contributions collected");

    let mut grads = Gradients::default();
    if let (true, Some(operand), true) = (grad.wants_lhs(), lhs, op.uses_lhs()) {
        let g = side_grad(client, &msgs, &contribs, grad_out, true);
        grads.lhs = Some(Tensor::from_vec(g, operand.data.shape())?);
    }
    if let (true, Some(operand), true) = (grad.wants_rhs(), rhs, op.uses_rhs()) {
        let g = side_grad(client, &msgs, &contribs, grad_out, false);
        grads.rhs = Some(Tensor::from_vec(g, operand.data.shape())?);
    }
    Ok(grads)
}

fn contributions<T: FloatElement>(
    msgs: &Messages<'_, T>,
    edges: &EdgeGroups,
    reduce: ReduceOp,
    out_target: Target,
    forward: &ReduceOutput,
) -> Result<Vec<Contribution<T>>> {
    let whole = |out_row: usize, pos: usize, scale: T| {
        let (lhs_row, rhs_row) = msgs.rows_at(pos);
        Contribution {
            out_row,
            only: None,
            lhs_row,
            rhs_row,
            scale,
        }
    };

    if out_target == Target::Edge {
        return Ok((0..edges.nnz())
            .map(|p| whole(edges.eid[p], p, T::one()))
            .collect());
    }

    match reduce {
        ReduceOp::Sum | ReduceOp::Mean | ReduceOp::None => {
            let mut out = Vec::with_capacity(edges.nnz());
            for d in 0..edges.num_rows {
                let deg = edges.degree(d);
                let scale = if reduce == ReduceOp::Mean && deg > 0 {
                    T::one() / T::from_f64(deg as f64)
                } else {
                    T::one()
                };
                out.extend((edges.indptr[d]..edges.indptr[d + 1]).map(|p| whole(d, p, scale)));
            }
            Ok(out)
        }
        ReduceOp::Max | ReduceOp::Min => {
            let (Some(arg_src), Some(arg_edge)) = (&forward.arg_src, &forward.arg_edge) else {
                return Err(Error::invalid_argument(
                    "forward",
                    format!("{} backward needs arg_src and arg_edge", reduce),
                ));
            };
            let arg_src = id_values(arg_src)?;
            let arg_edge = id_values(arg_edge)?;
            let expected = edges.num_rows * msgs.out_len;
            if arg_src.len() != expected || arg_edge.len() != expected {
                return Err(Error::shape_mismatch(&[expected], &[arg_edge.len()]));
            }
            let mut out = Vec::new();
            for d in 0..edges.num_rows {
                for tx in 0..msgs.out_len {
                    let idx = d * msgs.out_len + tx;
                    let (s, e) = (arg_src[idx], arg_edge[idx]);
                    if s < 0 || e < 0 {
                        continue;
                    }
                    let (lhs_row, rhs_row) = msgs.rows_of(s as usize, d, e as usize)?;
                    out.push(Contribution {
                        out_row: d,
                        only: Some(tx),
                        lhs_row,
                        rhs_row,
                        scale: T::one(),
                    });
                }
            }
            Ok(out)
        }
    }
}

fn side_grad<T: FloatElement>(
    client: &CpuClient,
    msgs: &Messages<'_, T>,
    contribs: &[Contribution<T>],
    grad_out: &[T],
    is_lhs: bool,
) -> Vec<T> {
    let side = if is_lhs { &msgs.lhs } else { &msgs.rhs };
    let Some(side) = side else {
        return Vec::new();
    };
    let rows = side.resolver.rows;
    let width = side.width;
    let (offsets, order) = group_by_key(contribs.len(), rows, |i| {
        if is_lhs {
            contribs[i].lhs_row
        } else {
            contribs[i].rhs_row
        }
    });

    let out_len = msgs.out_len;
    let mut grad = vec![T::zero(); rows * width];
    for_each_row_mut(client, &mut grad, width, |row, slice| {
        for &ci in &order[offsets[row]..offsets[row + 1]] {
            let c = &contribs[ci];
            let g_row = &grad_out[c.out_row * out_len..(c.out_row + 1) * out_len];
            let mut visit = |tx: usize| {
                let g = g_row[tx] * c.scale;
                if is_lhs {
                    lhs_partial(msgs, c, tx, g, slice);
                } else {
                    rhs_partial(msgs, c, tx, g, slice);
                }
            };
            match c.only {
                Some(tx) => visit(tx),
                None => (0..out_len).for_each(visit),
            }
        }
    });
    grad
}

fn lhs_partial<T: FloatElement>(
    msgs: &Messages<'_, T>,
    c: &Contribution<T>,
    tx: usize,
    g: T,
    slice: &mut [T],
) {
    let lo = msgs.lhs_off[tx];
    let ro = msgs.rhs_off[tx];
    let r = msgs.rhs_row(c.rhs_row);
    match msgs.op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::CopyLhs => slice[lo] = slice[lo] + g,
        BinaryOp::Mul => slice[lo] = slice[lo] + g * r[ro],
        BinaryOp::Div => slice[lo] = slice[lo] + g / r[ro],
        BinaryOp::Dot => {
            let k = msgs.reduce_size;
            for i in 0..k {
                slice[lo * k + i] = slice[lo * k + i] + g * r[ro * k + i];
            }
        }
        BinaryOp::CopyRhs => {}
    }
}

fn rhs_partial<T: FloatElement>(
    msgs: &Messages<'_, T>,
    c: &Contribution<T>,
    tx: usize,
    g: T,
    slice: &mut [T],
) {
    let lo = msgs.lhs_off[tx];
    let ro = msgs.rhs_off[tx];
    let l = msgs.lhs_row(c.lhs_row);
    match msgs.op {
        BinaryOp::Add | BinaryOp::CopyRhs => slice[ro] = slice[ro] + g,
        BinaryOp::Sub => slice[ro] = slice[ro] - g,
        BinaryOp::Mul => slice[ro] = slice[ro] + g * l[lo],
        BinaryOp::Div => {
            let r = msgs.rhs_row(c.rhs_row)[ro];
            slice[ro] = slice[ro] - g * l[lo] / (r * r);
        }
        BinaryOp::Dot => {
            let k = msgs.reduce_size;
            for i in 0..k {
                slice[ro * k + i] = slice[ro * k + i] + g * l[lo * k + i];
            }
        }
        BinaryOp::CopyLhs => {}
    }
}

#[cfg(test)]
mod tests {
    use super::super::binary_reduce;
    use super::*;
    use crate::dtype::DType;
    use crate::runtime::Device;
    use crate::sparse::{Adjacency, CsrData};

    struct Case<'a> {
        op: BinaryOp,
        reduce: ReduceOp,
        lhs: Operand<'a>,
        rhs: Operand<'a>,
        out_target: Target,
    }

    fn run(csr: &CsrData, case: &Case<'_>, grad_out: &[f64]) -> Gradients {
        let client = CpuClient::new();
        let edges = EdgeGroups::new(Adjacency::Csr(csr)).unwrap();
        let info = BcastInfo::for_op(
            case.op,
            case.lhs.data.feature_shape(),
            case.rhs.data.feature_shape(),
        )
        .unwrap();
        let fwd = binary_reduce::<f64>(
            &client,
            &edges,
            &info,
            case.op,
            case.reduce,
            Some(&case.lhs),
            Some(&case.rhs),
            case.out_target,
            DType::I64,
        )
        .unwrap();
        let g = Tensor::from_slice(grad_out, fwd.out.shape(), Device::Cpu);
        backward_binary_reduce::<f64>(
            &client,
            &edges,
            &info,
            case.op,
            case.reduce,
            Some(&case.lhs),
            Some(&case.rhs),
            case.out_target,
            &fwd,
            &g,
            GradTarget::Both,
        )
        .unwrap()
    }

    fn graph() -> CsrData {
        // dst 0 <- src {0, 1} (edges 0, 1); dst 1 <- src {1} (edge 2)
        CsrData::from_slices(&[0i64, 2, 3], &[0, 1, 1], None, [2, 2]).unwrap()
    }

    #[test]
    fn test_mul_sum_gradients() {
        let u = Tensor::from_slice(&[2.0f64, 3.0], &[2], Device::Cpu);
        let e = Tensor::from_slice(&[5.0f64, 7.0, 11.0], &[3], Device::Cpu);
        let case = Case {
            op: BinaryOp::Mul,
            reduce: ReduceOp::Sum,
            lhs: Operand::src(&u),
            rhs: Operand::edge(&e),
            out_target: Target::Dst,
        };
        let grads = run(&graph(), &case, &[1.0, 10.0]);
        // d/du0 = 1*5; d/du1 = 1*7 + 10*11
        assert_eq!(grads.lhs.unwrap().to_vec::<f64>(), vec![5.0, 117.0]);
        // d/de = g[dst] * u[src]
        assert_eq!(grads.rhs.unwrap().to_vec::<f64>(), vec![2.0, 3.0, 30.0]);
    }

    #[test]
    fn test_max_routes_gradient_to_winner() {
        let u = Tensor::from_slice(&[2.0f64, 3.0], &[2], Device::Cpu);
        let e = Tensor::from_slice(&[1.0f64, 1.0, 1.0], &[3], Device::Cpu);
        let case = Case {
            op: BinaryOp::Add,
            reduce: ReduceOp::Max,
            lhs: Operand::src(&u),
            rhs: Operand::edge(&e),
            out_target: Target::Dst,
        };
        let grads = run(&graph(), &case, &[1.0, 1.0]);
        // dst 0 won by edge 1 (src 1), dst 1 by edge 2 (src 1)
        assert_eq!(grads.lhs.unwrap().to_vec::<f64>(), vec![0.0, 2.0]);
        assert_eq!(grads.rhs.unwrap().to_vec::<f64>(), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_broadcast_axis_sums_gradient() {
        let u = Tensor::from_slice(&[1.0f64, 2.0], &[2, 1], Device::Cpu);
        let v = Tensor::from_slice(&[1.0f64, 1.0, 1.0, 1.0, 1.0, 1.0], &[2, 3], Device::Cpu);
        let case = Case {
            op: BinaryOp::Sub,
            reduce: ReduceOp::None,
            lhs: Operand::src(&u),
            rhs: Operand::dst(&v),
            out_target: Target::Edge,
        };
        let grads = run(&graph(), &case, &[1.0; 9]);
        // each edge spreads u over 3 columns
        assert_eq!(grads.lhs.unwrap().to_vec::<f64>(), vec![3.0, 6.0]);
        assert_eq!(
            grads.rhs.unwrap().to_vec::<f64>(),
            vec![-2.0, -2.0, -2.0, -1.0, -1.0, -1.0]
        );
    }

    #[test]
    fn test_div_and_mean() {
        let u = Tensor::from_slice(&[4.0f64, 6.0], &[2], Device::Cpu);
        let e = Tensor::from_slice(&[2.0f64, 2.0, 3.0], &[3], Device::Cpu);
        let case = Case {
            op: BinaryOp::Div,
            reduce: ReduceOp::Mean,
            lhs: Operand::src(&u),
            rhs: Operand::edge(&e),
            out_target: Target::Dst,
        };
        let grads = run(&graph(), &case, &[2.0, 3.0]);
        // dst 0 scale 1/2: d/du0 = 1/2, d/du1 = 1/2 + 3/3
        assert_eq!(grads.lhs.unwrap().to_vec::<f64>(), vec![0.5, 1.5]);
        // d/de0 = -1 * 4/4, d/de1 = -1 * 6/4, d/de2 = -3 * 6/9
        assert_eq!(grads.rhs.unwrap().to_vec::<f64>(), vec![-1.0, -1.5, -2.0]);
    }

    #[test]
    fn test_dot_gradients() {
        let u = Tensor::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2], Device::Cpu);
        let e = Tensor::from_slice(&[5.0f64, 6.0, 7.0, 8.0, 9.0, 10.0], &[3, 2], Device::Cpu);
        let case = Case {
            op: BinaryOp::Dot,
            reduce: ReduceOp::Sum,
            lhs: Operand::src(&u),
            rhs: Operand::edge(&e),
            out_target: Target::Dst,
        };
        let grads = run(&graph(), &case, &[1.0, 2.0]);
        // d/du0 = 1*e0; d/du1 = 1*e1 + 2*e2
        assert_eq!(grads.lhs.unwrap().to_vec::<f64>(), vec![5.0, 6.0, 25.0, 28.0]);
        // d/de = g[dst] * u[src]
        assert_eq!(
            grads.rhs.unwrap().to_vec::<f64>(),
            vec![1.0, 2.0, 3.0, 4.0, 6.0, 8.0]
        );
    }

    #[test]
    fn test_min_routes_gradient_to_winner() {
        let u = Tensor::from_slice(&[2.0f64, 3.0], &[2], Device::Cpu);
        let e = Tensor::from_slice(&[1.0f64, 1.0, 1.0], &[3], Device::Cpu);
        let case = Case {
            op: BinaryOp::Add,
            reduce: ReduceOp::Min,
            lhs: Operand::src(&u),
            rhs: Operand::edge(&e),
            out_target: Target::Dst,
        };
        let grads = run(&graph(), &case, &[2.0, 5.0]);
        // dst 0 won by edge 0 (src 0), dst 1 by edge 2 (src 1)
        assert_eq!(grads.lhs.unwrap().to_vec::<f64>(), vec![2.0, 5.0]);
        assert_eq!(grads.rhs.unwrap().to_vec::<f64>(), vec![2.0, 0.0, 5.0]);
    }

    #[test]
    fn test_mapped_operand_gradient_lands_on_feature_rows() {
        // src 0 reads feature row 2, src 1 reads row 0; row 1 is unused
        let u = Tensor::from_slice(&[10.0f64, 20.0, 30.0], &[3], Device::Cpu);
        let mapping = Tensor::from_slice(&[2i64, 0], &[2], Device::Cpu);
        let e = Tensor::from_slice(&[5.0f64, 7.0, 11.0], &[3], Device::Cpu);
        let case = Case {
            op: BinaryOp::Mul,
            reduce: ReduceOp::Sum,
            lhs: Operand::src(&u).with_mapping(&mapping),
            rhs: Operand::edge(&e),
            out_target: Target::Dst,
        };
        let grads = run(&graph(), &case, &[1.0, 10.0]);
        // row 0 <- edges 1, 2; row 2 <- edge 0
        assert_eq!(grads.lhs.unwrap().to_vec::<f64>(), vec![117.0, 0.0, 5.0]);
        assert_eq!(grads.rhs.unwrap().to_vec::<f64>(), vec![30.0, 10.0, 100.0]);
    }
}
