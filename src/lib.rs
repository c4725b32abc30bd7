//! # graphr
//!
//! **Graph-learning kernels for Rust: sampling, message passing and id compaction.**
//!
//! graphr provides the core operations a graph neural network framework
//! runs between its graph storage and its tensors, over CSR and COO
//! adjacencies with 32- or 64-bit ids.
//!
//! ## Features
//!
//! - **Row-wise sampling**: uniform, weighted, tag-biased and top-k
//!   neighbor selection with per-row reproducible randomness
//! - **Message passing**: broadcast-aware binary-reduce (SpMM / SDDMM) with
//!   sum, mean, max and min, plus the matching backward pass
//! - **Compaction**: concurrent id hash map relabelling sampled subgraphs
//!   onto dense node ranges
//!
//! ## Quick Start
//!
//! ```rust
//! use graphr::prelude::*;
//!
//! # fn main() -> graphr::error::Result<()> {
//! let client = CpuClient::new();
//! // two destination rows: 0 <- {0, 1}, 1 <- {0}
//! let csr = CsrData::from_slices(&[0i64, 2, 3], &[0, 1, 0], None, [2, 2])?;
//!
//! let feat = Tensor::from_slice(&[10.0f32, 20.0], &[2, 1], Device::Cpu);
//! let out = client.gspmm((&csr).into(), BinaryOp::CopyLhs, ReduceOp::Sum, Some(&feat), None)?;
//! assert_eq!(out.out.to_vec::<f32>(), vec![30.0, 10.0]);
//!
//! let rows = Tensor::from_slice(&[0i64], &[1], Device::Cpu);
//! let picked = client.csr_rowwise_sampling_uniform(&csr, &rows, 1, false)?;
//! assert_eq!(picked.nnz(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): Multi-threaded CPU kernels
//! - `f16`: Half-precision feature tensors (F16, BF16)
//! - `serde`: Serialization of tensors, adjacencies and compaction results

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod dtype;
pub mod error;
pub mod ops;
pub mod runtime;
pub mod sparse;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::DType;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::ops::{
        BinaryOp, CompactionOps, GradTarget, MessagePassingOps, Operand, ReduceOp, SamplingOps,
        Target,
    };
    pub use crate::runtime::Device;
    pub use crate::runtime::cpu::{ClientConfig, CpuClient};
    pub use crate::sparse::{Adjacency, CooData, CsrData, SparseFormat};
    pub use crate::tensor::Tensor;
}
