//! CPU implementation of message passing

use super::CpuClient;
use super::kernels::{EdgeGroups, backward_binary_reduce, binary_reduce};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::ops::{
    BcastInfo, BinaryOp, GradTarget, Gradients, MessagePassingOps, Operand, ReduceOp,
    ReduceOutput, Target,
};
use crate::runtime::Device;
use crate::sparse::Adjacency;
use crate::tensor::Tensor;
use tracing::debug;

/// Validated inputs of one binary-reduce call
struct Plan<'a> {
    dtype: DType,
    info: BcastInfo,
    edges: EdgeGroups,
    lhs: Option<Operand<'a>>,
    rhs: Option<Operand<'a>>,
    out_target: Target,
}

impl Plan<'_> {
    fn out_shape(&self) -> Vec<usize> {
        let rows = match self.out_target {
            Target::Edge => self.edges.nnz(),
            _ => self.edges.num_rows,
        };
        std::iter::once(rows)
            .chain(self.info.real_out_shape.iter().copied())
            .collect()
    }
}

fn check_tensor_device(graph: Device, t: &Tensor, name: &'static str) -> Result<()> {
    if t.device() != graph {
        return Err(Error::DeviceMismatch {
            expected: graph,
            got: t.device(),
            tensor: name,
        });
    }
    Ok(())
}

fn check_operand(
    graph: &Adjacency<'_>,
    operand: &Operand<'_>,
    data_name: &'static str,
    mapping_name: &'static str,
) -> Result<()> {
    check_tensor_device(graph.device(), operand.data, data_name)?;
    if operand.data.ndim() == 0 {
        return Err(Error::invalid_argument(
            data_name,
            "feature tensor needs a leading node/edge axis",
        ));
    }
    if let Some(mapping) = operand.mapping {
        check_tensor_device(graph.device(), mapping, mapping_name)?;
        if mapping.dtype() != graph.id_dtype() {
            return Err(Error::DTypeMismatch {
                lhs: graph.id_dtype(),
                rhs: mapping.dtype(),
            });
        }
        if mapping.ndim() != 1 {
            return Err(Error::invalid_argument(
                mapping_name,
                format!("expected a 1-D id tensor, got shape {:?}", mapping.shape()),
            ));
        }
    }
    Ok(())
}

fn check_reduce_target(reduce: ReduceOp, out_target: Target) -> Result<()> {
    match (out_target, reduce) {
        (Target::Src, _) => Err(Error::invalid_argument(
            "out_target",
            "outputs are indexed by destination or edge; transpose the graph to reduce onto sources",
        )),
        (Target::Edge, ReduceOp::None) => Ok(()),
        (Target::Edge, other) => Err(Error::invalid_argument(
            "reduce",
            format!("edge outputs take no reduction, got '{}'", other),
        )),
        (Target::Dst, ReduceOp::None) => Err(Error::invalid_argument(
            "reduce",
            "destination outputs need a reduction",
        )),
        (Target::Dst, _) => Ok(()),
    }
}

impl CpuClient {
    #[allow(clippy::too_many_arguments)]
    fn plan<'a>(
        &self,
        graph: Adjacency<'_>,
        op: BinaryOp,
        reduce: ReduceOp,
        lhs: Option<Operand<'a>>,
        rhs: Option<Operand<'a>>,
        out_target: Target,
        name: &'static str,
    ) -> Result<Plan<'a>> {
        self.check_device(graph.device(), name)?;
        check_reduce_target(reduce, out_target)?;

        let lhs = if op.uses_lhs() {
            Some(lhs.ok_or_else(|| {
                Error::invalid_argument("lhs", format!("'{}' reads an lhs operand", op))
            })?)
        } else {
            None
        };
        let rhs = if op.uses_rhs() {
            Some(rhs.ok_or_else(|| {
                Error::invalid_argument("rhs", format!("'{}' reads an rhs operand", op))
            })?)
        } else {
            None
        };
        if let Some(o) = &lhs {
            check_operand(&graph, o, "lhs", "lhs_mapping")?;
        }
        if let Some(o) = &rhs {
            check_operand(&graph, o, "rhs", "rhs_mapping")?;
        }

        let dtype = match (&lhs, &rhs) {
            (Some(l), Some(r)) if l.data.dtype() != r.data.dtype() => {
                return Err(Error::DTypeMismatch {
                    lhs: l.data.dtype(),
                    rhs: r.data.dtype(),
                });
            }
            (Some(o), _) | (None, Some(o)) => o.data.dtype(),
            (None, None) => return Err(Error::Internal(format!("'{}' has no operand", op))),
        };
        if !dtype.is_float() {
            return Err(Error::unsupported_dtype(dtype, name));
        }

        let info = BcastInfo::for_op(
            op,
            lhs.as_ref().map_or(&[][..], |o| o.data.feature_shape()),
            rhs.as_ref().map_or(&[][..], |o| o.data.feature_shape()),
        )?;
        let edges = EdgeGroups::new(graph)?;
        Ok(Plan {
            dtype,
            info,
            edges,
            lhs,
            rhs,
            out_target,
        })
    }
}

impl MessagePassingOps for CpuClient {
    fn binary_op_reduce(
        &self,
        graph: Adjacency<'_>,
        op: BinaryOp,
        reduce: ReduceOp,
        lhs: Option<Operand<'_>>,
        rhs: Option<Operand<'_>>,
        out_target: Target,
    ) -> Result<ReduceOutput> {
        const OP: &str = "binary_op_reduce";
        debug!(
            format = ?graph.format(),
            nnz = graph.nnz(),
            %op,
            %reduce,
            ?out_target,
            "{}",
            OP
        );
        let id_dtype = graph.id_dtype();
        let plan = self.plan(graph, op, reduce, lhs, rhs, out_target, OP)?;
        crate::dispatch_float_dtype!(plan.dtype, T => {
            binary_reduce::<T>(
                self,
                &plan.edges,
                &plan.info,
                op,
                reduce,
                plan.lhs.as_ref(),
                plan.rhs.as_ref(),
                plan.out_target,
                id_dtype,
            )
        }, OP)
    }

    fn backward_binary_op_reduce(
        &self,
        graph: Adjacency<'_>,
        op: BinaryOp,
        reduce: ReduceOp,
        lhs: Option<Operand<'_>>,
        rhs: Option<Operand<'_>>,
        out_target: Target,
        forward: &ReduceOutput,
        grad_out: &Tensor,
        grad: GradTarget,
    ) -> Result<Gradients> {
        const OP: &str = "backward_binary_op_reduce";
        debug!(
            format = ?graph.format(),
            nnz = graph.nnz(),
            %op,
            %reduce,
            ?grad,
            "{}",
            OP
        );
        let device = graph.device();
        let plan = self.plan(graph, op, reduce, lhs, rhs, out_target, OP)?;

        check_tensor_device(device, grad_out, "grad_out")?;
        if grad_out.dtype() != plan.dtype {
            return Err(Error::DTypeMismatch {
                lhs: plan.dtype,
                rhs: grad_out.dtype(),
            });
        }
        let expected = plan.out_shape();
        if grad_out.shape() != expected.as_slice() {
            return Err(Error::shape_mismatch(&expected, grad_out.shape()));
        }
        if forward.out.shape() != expected.as_slice() {
            return Err(Error::shape_mismatch(&expected, forward.out.shape()));
        }

        crate::dispatch_float_dtype!(plan.dtype, T => {
            backward_binary_reduce::<T>(
                self,
                &plan.edges,
                &plan.info,
                op,
                reduce,
                plan.lhs.as_ref(),
                plan.rhs.as_ref(),
                plan.out_target,
                forward,
                grad_out,
                grad,
            )
        }, OP)
    }
}
