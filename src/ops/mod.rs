//! Graph operations
//!
//! This module defines the operation traits implemented by the runtime
//! client, the operator enums they take, and the broadcast planner shared by
//! the message-passing kernels.
//!
//! # Design
//!
//! Operations are defined as traits implemented by the client. This gives
//! operations access to the thread pool and configuration of the backend.
//!
//! ```text
//! CpuClient
//!   ├── implements SamplingOps
//!   │     └── uniform, weighted, biased sampling and top-k (CSR / COO)
//!   ├── implements MessagePassingOps
//!   │     └── binary_op_reduce, backward, gspmm, gsddmm
//!   └── implements CompactionOps
//!         └── compact_ids, unique_and_compact, compact_graphs
//! ```
//!
//! # Operator Kinds
//!
//! - [`BinaryOp`] - message operator of an edge (`add`, `mul`, `dot`, copies)
//! - [`ReduceOp`] - reduction onto destination rows (`sum`, `max`, ...)
//! - [`Target`] - what indexes an operand's rows (source, destination, edge)
//! - [`GradTarget`] - which operand gradients a backward pass computes

mod bcast;
mod dispatch;
mod kinds;
mod traits;

pub use bcast::{BcastInfo, infer_binary_feature_shape};
pub use kinds::{BinaryOp, GradTarget, ReduceOp, Target};
pub use traits::*;
