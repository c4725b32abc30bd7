//! Message-passing kernels over an adjacency
//!
//! A message is the value of a binary operator on the feature rows two
//! operands assign to an edge. The forward kernel reduces messages onto
//! destination rows (or writes them per edge); the backward kernel scatters
//! output gradients back onto operand rows.

mod backward;
mod binary_reduce;
mod edge_groups;

pub(crate) use backward::backward_binary_reduce;
pub(crate) use binary_reduce::binary_reduce;
pub(crate) use edge_groups::{EdgeGroups, id_tensor, id_values};

use crate::dtype::FloatElement;
use crate::error::{Error, Result};
use crate::ops::{BcastInfo, BinaryOp, Operand};
use edge_groups::Resolver;

/// Feature rows of one operand, resolved for every edge position
struct Side<'a, T> {
    data: &'a [T],
    width: usize,
    resolver: Resolver,
    by_pos: Vec<usize>,
}

impl<'a, T: FloatElement> Side<'a, T> {
    fn new(operand: &Operand<'a>, edges: &EdgeGroups) -> Result<Self> {
        let resolver = Resolver::new(operand)?;
        Ok(Self {
            data: operand.data.as_slice::<T>()?,
            width: resolver.width,
            by_pos: resolver.rows_by_position(edges)?,
            resolver,
        })
    }

    #[inline]
    fn row(&self, r: usize) -> &'a [T] {
        &self.data[r * self.width..(r + 1) * self.width]
    }
}

/// Message evaluation shared by the forward and backward passes
struct Messages<'a, T> {
    op: BinaryOp,
    lhs: Option<Side<'a, T>>,
    rhs: Option<Side<'a, T>>,
    lhs_off: Vec<usize>,
    rhs_off: Vec<usize>,
    reduce_size: usize,
    out_len: usize,
}

impl<'a, T: FloatElement> Messages<'a, T> {
    fn new(
        edges: &EdgeGroups,
        info: &BcastInfo,
        op: BinaryOp,
        lhs: Option<&Operand<'a>>,
        rhs: Option<&Operand<'a>>,
    ) -> Result<Self> {
        let lhs = match (op.uses_lhs(), lhs) {
            (true, Some(o)) => Some(Side::new(o, edges)?),
            (true, None) => return Err(Error::Internal(format!("{} without lhs", op))),
            (false, _) => None,
        };
        let rhs = match (op.uses_rhs(), rhs) {
            (true, Some(o)) => Some(Side::new(o, edges)?),
            (true, None) => return Err(Error::Internal(format!("{} without rhs", op))),
            (false, _) => None,
        };
        let (lhs_off, rhs_off) = info.offset_table();
        Ok(Self {
            op,
            lhs,
            rhs,
            lhs_off,
            rhs_off,
            reduce_size: info.reduce_size,
            out_len: info.out_len,
        })
    }

    fn lhs_row(&self, r: usize) -> &'a [T] {
        self.lhs.as_ref().map_or(&[][..], |s| s.row(r))
    }

    fn rhs_row(&self, r: usize) -> &'a [T] {
        self.rhs.as_ref().map_or(&[][..], |s| s.row(r))
    }

    /// Operand rows read by edge position `pos` (0 for an unused side)
    #[inline]
    fn rows_at(&self, pos: usize) -> (usize, usize) {
        (
            self.lhs.as_ref().map_or(0, |s| s.by_pos[pos]),
            self.rhs.as_ref().map_or(0, |s| s.by_pos[pos]),
        )
    }

    /// Operand rows read by an explicit edge
    fn rows_of(&self, src: usize, dst: usize, eid: usize) -> Result<(usize, usize)> {
        let l = match &self.lhs {
            Some(s) => s.resolver.row(src, dst, eid)?,
            None => 0,
        };
        let r = match &self.rhs {
            Some(s) => s.resolver.row(src, dst, eid)?,
            None => 0,
        };
        Ok((l, r))
    }

    /// Message of output coordinate `tx` for operand rows `(lr, rr)`
    #[inline]
    fn eval(&self, lr: usize, rr: usize, tx: usize) -> T {
        let l = self.lhs_row(lr);
        let r = self.rhs_row(rr);
        let lo = self.lhs_off[tx];
        let ro = self.rhs_off[tx];
        match self.op {
            BinaryOp::Add => l[lo] + r[ro],
            BinaryOp::Sub => l[lo] - r[ro],
            BinaryOp::Mul => l[lo] * r[ro],
            BinaryOp::Div => l[lo] / r[ro],
            BinaryOp::CopyLhs => l[lo],
            BinaryOp::CopyRhs => r[ro],
            BinaryOp::Dot => {
                let k = self.reduce_size;
                let l = &l[lo * k..(lo + 1) * k];
                let r = &r[ro * k..(ro + 1) * k];
                l.iter().zip(r).fold(T::zero(), |acc, (&a, &b)| acc + a * b)
            }
        }
    }
}
