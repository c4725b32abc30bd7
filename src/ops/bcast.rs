//! Broadcast inference between the feature shapes of two operands
//!
//! Feature shapes are aligned at their rightmost axis. Walking right to left,
//! runs of axes where both sides agree are merged into one synthetic axis;
//! every axis where they differ (one side must be 1) is kept on its own. All
//! three shape lists (lhs, rhs, out) therefore have the same rank, and a flat
//! output coordinate maps to a flat operand coordinate by decomposing it with
//! the output strides and recomposing it with the operand strides.

use super::BinaryOp;
use crate::error::{Error, Result};
use crate::tensor::{Shape, Tensor, row_major_strides};

/// Broadcast plan of a binary operator over two feature shapes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BcastInfo {
    /// False when both feature shapes are identical (offsets are the identity)
    pub use_bcast: bool,
    /// Number of elements of one lhs row, excluding the dot axis
    pub lhs_len: usize,
    /// Number of elements of one rhs row, excluding the dot axis
    pub rhs_len: usize,
    /// Number of elements of one output row
    pub out_len: usize,
    /// Length of the axis reduced by [`BinaryOp::Dot`], 1 otherwise
    pub reduce_size: usize,
    /// Merged lhs shape
    pub lhs_shape: Shape,
    /// Merged rhs shape
    pub rhs_shape: Shape,
    /// Merged output shape
    pub out_shape: Shape,
    /// Row-major strides of `lhs_shape`
    pub lhs_stride: Shape,
    /// Row-major strides of `rhs_shape`
    pub rhs_stride: Shape,
    /// Row-major strides of `out_shape`
    pub out_stride: Shape,
    /// Feature shape of the output, one entry per broadcast axis
    pub real_out_shape: Shape,
}

impl BcastInfo {
    /// Plan the broadcast of two feature shapes
    ///
    /// # Errors
    ///
    /// [`Error::BroadcastError`] if an axis pair differs and neither side is 1.
    ///
    /// # Example
    ///
    /// ```
    /// use graphr::ops::BcastInfo;
    /// let info = BcastInfo::new(&[4, 1], &[1, 5]).unwrap();
    /// assert_eq!(info.real_out_shape.as_slice(), &[4, 5]);
    /// assert!(BcastInfo::new(&[2], &[3]).is_err());
    /// ```
    pub fn new(lhs: &[usize], rhs: &[usize]) -> Result<Self> {
        let ndim = lhs.len().max(rhs.len());
        let mut lhs_shape = Shape::new();
        let mut rhs_shape = Shape::new();
        let mut out_shape = Shape::new();
        let mut real_out_shape = Shape::new();
        let mut accum = 1usize;

        for j in 0..ndim {
            let dl = if j < lhs.len() { lhs[lhs.len() - 1 - j] } else { 1 };
            let dr = if j < rhs.len() { rhs[rhs.len() - 1 - j] } else { 1 };
            let d_out = if dl == 1 { dr } else { dl };
            if dl != dr {
                if dl != 1 && dr != 1 {
                    return Err(Error::broadcast(lhs, rhs));
                }
                if accum != 1 {
                    lhs_shape.push(accum);
                    rhs_shape.push(accum);
                    out_shape.push(accum);
                    accum = 1;
                }
                lhs_shape.push(dl);
                rhs_shape.push(dr);
                out_shape.push(d_out);
            } else {
                accum *= dl;
            }
            real_out_shape.push(d_out);
        }
        if accum != 1 {
            lhs_shape.push(accum);
            rhs_shape.push(accum);
            out_shape.push(accum);
        }

        lhs_shape.reverse();
        rhs_shape.reverse();
        out_shape.reverse();
        real_out_shape.reverse();

        let lhs_stride = row_major_strides(&lhs_shape);
        let rhs_stride = row_major_strides(&rhs_shape);
        let out_stride = row_major_strides(&out_shape);

        Ok(Self {
            use_bcast: lhs != rhs,
            lhs_len: lhs_shape.iter().product(),
            rhs_len: rhs_shape.iter().product(),
            out_len: out_shape.iter().product(),
            reduce_size: 1,
            lhs_shape,
            rhs_shape,
            out_shape,
            lhs_stride,
            rhs_stride,
            out_stride,
            real_out_shape,
        })
    }

    /// Plan the broadcast for a specific operator
    ///
    /// Copy operators use only one side. [`BinaryOp::Dot`] requires the last
    /// axis of both shapes to agree, broadcasts the remaining axes, and
    /// appends a trailing axis of size 1 to the output shape.
    pub fn for_op(op: BinaryOp, lhs: &[usize], rhs: &[usize]) -> Result<Self> {
        match op {
            BinaryOp::CopyLhs => Self::new(lhs, lhs),
            BinaryOp::CopyRhs => Self::new(rhs, rhs),
            BinaryOp::Dot => {
                let (Some((&kl, lhs_rest)), Some((&kr, rhs_rest))) =
                    (lhs.split_last(), rhs.split_last())
                else {
                    return Err(Error::invalid_argument(
                        "op",
                        "dot requires at least one feature axis on both operands",
                    ));
                };
                if kl != kr {
                    return Err(Error::shape_mismatch(lhs, rhs));
                }
                let mut info = Self::new(lhs_rest, rhs_rest)?;
                info.use_bcast = lhs != rhs;
                info.reduce_size = kl;
                info.real_out_shape.push(1);
                Ok(info)
            }
            _ => Self::new(lhs, rhs),
        }
    }

    /// Returns true if the operands need broadcast offsets
    #[inline]
    pub fn has_bcast(&self) -> bool {
        self.use_bcast
    }

    /// Offset into an lhs row for flat output coordinate `tx`
    #[inline]
    pub fn lhs_offset(&self, tx: usize) -> usize {
        self.offset(tx, &self.lhs_shape, &self.lhs_stride)
    }

    /// Offset into an rhs row for flat output coordinate `tx`
    #[inline]
    pub fn rhs_offset(&self, tx: usize) -> usize {
        self.offset(tx, &self.rhs_shape, &self.rhs_stride)
    }

    fn offset(&self, tx: usize, shape: &[usize], stride: &[usize]) -> usize {
        if !self.use_bcast {
            return tx;
        }
        let mut off = 0;
        for d in 0..self.out_shape.len() {
            if shape[d] != 1 {
                let idx = (tx / self.out_stride[d]) % self.out_shape[d];
                off += idx * stride[d];
            }
        }
        off
    }

    /// Precomputed `(lhs_offset, rhs_offset)` for every output coordinate
    pub(crate) fn offset_table(&self) -> (Vec<usize>, Vec<usize>) {
        let lhs = (0..self.out_len).map(|tx| self.lhs_offset(tx)).collect();
        let rhs = (0..self.out_len).map(|tx| self.rhs_offset(tx)).collect();
        (lhs, rhs)
    }
}

/// Feature shape produced by `op` over the trailing axes of two tensors
///
/// The first axis of each tensor indexes nodes or edges and is ignored.
pub fn infer_binary_feature_shape(op: BinaryOp, lhs: &Tensor, rhs: &Tensor) -> Result<Shape> {
    Ok(BcastInfo::for_op(op, lhs.feature_shape(), rhs.feature_shape())?.real_out_shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::error::ErrorKind;
    use crate::runtime::Device;

    #[test]
    fn test_outer_broadcast() {
        let info = BcastInfo::new(&[4, 1], &[1, 5]).unwrap();
        assert_eq!(info.real_out_shape.as_slice(), &[4, 5]);
        assert_eq!(info.lhs_shape.as_slice(), &[4, 1]);
        assert_eq!(info.rhs_shape.as_slice(), &[1, 5]);
        assert_eq!(info.out_shape.as_slice(), &[4, 5]);
        assert_eq!(info.out_len, 20);
        assert!(info.has_bcast());
        // out (2, 3) reads lhs row 2 and rhs column 3
        assert_eq!(info.lhs_offset(2 * 5 + 3), 2);
        assert_eq!(info.rhs_offset(2 * 5 + 3), 3);
    }

    #[test]
    fn test_equal_shapes_merge_into_one_axis() {
        let info = BcastInfo::new(&[2, 3], &[2, 3]).unwrap();
        assert!(!info.has_bcast());
        assert_eq!(info.out_shape.as_slice(), &[6]);
        assert_eq!(info.real_out_shape.as_slice(), &[2, 3]);
        assert_eq!(info.lhs_offset(4), 4);
    }

    #[test]
    fn test_leading_axis_broadcast_keeps_merged_run() {
        // (2, 3, 4) with (3, 4): the trailing run (3, 4) merges into 12
        let info = BcastInfo::new(&[2, 3, 4], &[3, 4]).unwrap();
        assert_eq!(info.lhs_shape.as_slice(), &[2, 12]);
        assert_eq!(info.rhs_shape.as_slice(), &[1, 12]);
        assert_eq!(info.out_shape.as_slice(), &[2, 12]);
        assert_eq!(info.real_out_shape.as_slice(), &[2, 3, 4]);
        assert_eq!(info.rhs_offset(12 + 7), 7);
        assert_eq!(info.lhs_offset(12 + 7), 19);
    }

    #[test]
    fn test_same_shape_vectors() {
        let info = BcastInfo::new(&[3], &[3]).unwrap();
        assert_eq!(info.real_out_shape.as_slice(), &[3]);
    }

    #[test]
    fn test_incompatible_shapes() {
        let err = BcastInfo::new(&[2], &[3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_dot_reduces_last_axis() {
        let info = BcastInfo::for_op(BinaryOp::Dot, &[2, 8], &[1, 8]).unwrap();
        assert_eq!(info.reduce_size, 8);
        assert_eq!(info.out_len, 2);
        assert_eq!(info.real_out_shape.as_slice(), &[2, 1]);
        assert!(matches!(
            BcastInfo::for_op(BinaryOp::Dot, &[4], &[5]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_copy_ignores_other_side() {
        let info = BcastInfo::for_op(BinaryOp::CopyLhs, &[7], &[2, 2]).unwrap();
        assert_eq!(info.real_out_shape.as_slice(), &[7]);
        assert!(!info.has_bcast());
    }

    #[test]
    fn test_infer_from_tensors() {
        let lhs = Tensor::zeros(&[3, 4, 1], DType::F32, Device::Cpu);
        let rhs = Tensor::zeros(&[6, 1, 5], DType::F32, Device::Cpu);
        let shape = infer_binary_feature_shape(BinaryOp::Mul, &lhs, &rhs).unwrap();
        assert_eq!(shape.as_slice(), &[4, 5]);
    }
}
