//! Error types for graphr

use crate::dtype::DType;
use crate::runtime::Device;
use thiserror::Error;

/// Result type alias using graphr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in graphr operations
#[derive(Error, Debug)]
pub enum Error {
    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Feature shapes cannot be broadcast together
    #[error("Invalid broadcasting between feature shapes {lhs:?} and {rhs:?}")]
    BroadcastError {
        /// Left-hand side feature shape
        lhs: Vec<usize>,
        /// Right-hand side feature shape
        rhs: Vec<usize>,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Tensors of one call live on different devices
    #[error("Expected device context {expected}, but got {got} for {tensor}")]
    DeviceMismatch {
        /// Device of the graph (or first operand)
        expected: Device,
        /// Device of the offending tensor
        got: Device,
        /// Which tensor mismatched
        tensor: &'static str,
    },

    /// Operation has no implementation for the device
    #[error("Unsupported device {device} for operation '{op}'")]
    UnsupportedDevice {
        /// The unsupported device
        device: Device,
        /// The operation name
        op: &'static str,
    },

    /// Unsupported dtype for an operation
    #[error("Unsupported dtype {dtype:?} for operation '{op}'")]
    UnsupportedDType {
        /// The unsupported dtype
        dtype: DType,
        /// The operation name
        op: &'static str,
    },

    /// DType mismatch between operands
    #[error("DType mismatch: {lhs:?} vs {rhs:?}")]
    DTypeMismatch {
        /// Left-hand side dtype
        lhs: DType,
        /// Right-hand side dtype
        rhs: DType,
    },

    /// Index out of bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Size of the dimension
        size: usize,
    },

    /// An id was not found in the compacted id universe
    #[error("Id {id} does not exist in {universe}")]
    IdNotFound {
        /// The missing id
        id: i64,
        /// Name of the id set that was searched
        universe: &'static str,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`Error`] values
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Non-broadcastable or otherwise incompatible shapes
    ShapeMismatch,
    /// Caller passed an argument that violates the operation contract
    InvalidArgument,
    /// Inputs live on different devices, or on a device without a kernel
    DeviceContextMismatch,
    /// No kernel for the dtype combination
    UnsupportedDtype,
    /// An id or index fell outside of the valid range
    OutOfRange,
    /// Bug in graphr itself
    Internal,
}

impl Error {
    /// Returns the coarse kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ShapeMismatch { .. } | Self::BroadcastError { .. } => ErrorKind::ShapeMismatch,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::DeviceMismatch { .. } | Self::UnsupportedDevice { .. } => {
                ErrorKind::DeviceContextMismatch
            }
            Self::UnsupportedDType { .. } | Self::DTypeMismatch { .. } => {
                ErrorKind::UnsupportedDtype
            }
            Self::IndexOutOfBounds { .. } | Self::IdNotFound { .. } => ErrorKind::OutOfRange,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a broadcast error
    pub fn broadcast(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::BroadcastError {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create an unsupported dtype error
    pub fn unsupported_dtype(dtype: DType, op: &'static str) -> Self {
        Self::UnsupportedDType { dtype, op }
    }
}
