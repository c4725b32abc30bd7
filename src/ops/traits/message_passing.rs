//! Message-passing (binary-reduce) operations trait

use crate::error::Result;
use crate::ops::{BinaryOp, GradTarget, ReduceOp, Target};
use crate::sparse::Adjacency;
use crate::tensor::Tensor;

/// One side of a binary operator: a feature tensor and what indexes it
///
/// The first axis of `data` is indexed by the source node, destination node
/// or edge id of every edge, optionally redirected through `mapping`
/// (`row = mapping[id]`).
#[derive(Clone, Copy, Debug)]
pub struct Operand<'a> {
    /// Feature tensor `[rows, feature...]`
    pub data: &'a Tensor,
    /// What the first axis of `data` is indexed by
    pub target: Target,
    /// Optional id tensor mapping node/edge ids to rows of `data`
    pub mapping: Option<&'a Tensor>,
}

impl<'a> Operand<'a> {
    /// Operand indexed directly by `target`
    pub fn new(data: &'a Tensor, target: Target) -> Self {
        Self {
            data,
            target,
            mapping: None,
        }
    }

    /// Source node features
    pub fn src(data: &'a Tensor) -> Self {
        Self::new(data, Target::Src)
    }

    /// Destination node features
    pub fn dst(data: &'a Tensor) -> Self {
        Self::new(data, Target::Dst)
    }

    /// Edge features
    pub fn edge(data: &'a Tensor) -> Self {
        Self::new(data, Target::Edge)
    }

    /// Read rows through `mapping`
    pub fn with_mapping(mut self, mapping: &'a Tensor) -> Self {
        self.mapping = Some(mapping);
        self
    }
}

/// Output of a forward binary-reduce
#[derive(Clone, Debug)]
pub struct ReduceOutput {
    /// Reduced features `[rows, out_feature...]`
    pub out: Tensor,
    /// Source node of the winning edge per output element (max/min only)
    pub arg_src: Option<Tensor>,
    /// Id of the winning edge per output element (max/min only)
    pub arg_edge: Option<Tensor>,
}

/// Gradients produced by a backward binary-reduce
#[derive(Clone, Debug, Default)]
pub struct Gradients {
    /// Gradient of the lhs feature tensor, same shape as its data
    pub lhs: Option<Tensor>,
    /// Gradient of the rhs feature tensor, same shape as its data
    pub rhs: Option<Tensor>,
}

/// Generalized sparse-dense message passing
///
/// Rows of the adjacency are destination nodes and columns are source
/// nodes, so the forward kernel reduces messages over the in-edges of every
/// row. Feature shapes broadcast following [`BcastInfo`].
///
/// [`BcastInfo`]: crate::ops::BcastInfo
pub trait MessagePassingOps {
    /// Compute `reduce` over the messages `op(lhs, rhs)` of every edge
    ///
    /// `out_target` is [`Target::Dst`] for a reduction onto nodes, or
    /// [`Target::Edge`] together with [`ReduceOp::None`] to write one message
    /// per edge. Max/min reductions also return the winning source and edge
    /// per output element; destinations without in-edges produce zeros and
    /// `-1` winners.
    fn binary_op_reduce(
        &self,
        graph: Adjacency<'_>,
        op: BinaryOp,
        reduce: ReduceOp,
        lhs: Option<Operand<'_>>,
        rhs: Option<Operand<'_>>,
        out_target: Target,
    ) -> Result<ReduceOutput>;

    /// Gradients of [`binary_op_reduce`](Self::binary_op_reduce)
    ///
    /// `forward` is the output of the forward call with the same arguments
    /// and `grad_out` the gradient of its `out`. Operand rows that received
    /// no contribution get zero gradients.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<Gradients>;

    /// Reduce one operand onto destination rows (or copy it per edge)
    fn copy_reduce(
        &self,
        graph: Adjacency<'_>,
        reduce: ReduceOp,
        input: Operand<'_>,
        out_target: Target,
    ) -> Result<ReduceOutput> {
        self.binary_op_reduce(graph, BinaryOp::CopyLhs, reduce, Some(input), None, out_target)
    }

    /// Gradient of [`copy_reduce`](Self::copy_reduce) with respect to its input
    fn backward_copy_reduce(
        &self,
        graph: Adjacency<'_>,
        reduce: ReduceOp,
        input: Operand<'_>,
        out_target: Target,
        forward: &ReduceOutput,
        grad_out: &Tensor,
    ) -> Result<Tensor> {
        let grads = self.backward_binary_op_reduce(
            graph,
            BinaryOp::CopyLhs,
            reduce,
            Some(input),
            None,
            out_target,
            forward,
            grad_out,
            GradTarget::Lhs,
        )?;
        grads.lhs.ok_or_else(|| {
            crate::error::Error::Internal("copy backward produced no gradient".to_string())
        })
    }

    /// Generalized SpMM: combine source node and edge features, reduce onto
    /// destination nodes
    ///
    /// # Example
    ///
    /// ```
    /// use graphr::prelude::*;
    ///
    /// let client = CpuClient::new();
    /// let csr = CsrData::from_slices(&[0i64, 2, 3], &[0, 1, 0], None, [2, 2]).unwrap();
    /// let feat = Tensor::from_slice(&[10.0f32, 20.0], &[2, 1], Device::Cpu);
    /// let out = client
    ///     .gspmm((&csr).into(), BinaryOp::CopyLhs, ReduceOp::Sum, Some(&feat), None)
    ///     .unwrap();
    /// assert_eq!(out.out.to_vec::<f32>(), vec![30.0, 10.0]);
    /// ```
    fn gspmm(
        &self,
        graph: Adjacency<'_>,
        op: BinaryOp,
        reduce: ReduceOp,
        ufeat: Option<&Tensor>,
        efeat: Option<&Tensor>,
    ) -> Result<ReduceOutput> {
        self.binary_op_reduce(
            graph,
            op,
            reduce,
            ufeat.map(Operand::src),
            efeat.map(Operand::edge),
            Target::Dst,
        )
    }

    /// Generalized SDDMM: one message per edge from two operands
    fn gsddmm(
        &self,
        graph: Adjacency<'_>,
        op: BinaryOp,
        lhs: Operand<'_>,
        rhs: Operand<'_>,
    ) -> Result<Tensor> {
        let (lhs, rhs) = match op {
            BinaryOp::CopyLhs => (Some(lhs), None),
            BinaryOp::CopyRhs => (None, Some(rhs)),
            _ => (Some(lhs), Some(rhs)),
        };
        Ok(self
            .binary_op_reduce(graph, op, ReduceOp::None, lhs, rhs, Target::Edge)?
            .out)
    }
}
