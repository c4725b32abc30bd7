//! Operation traits for graph kernels.
//!
//! This module contains trait definitions for the graph operations.
//! Implementations live in the backend module (`runtime::cpu`).

mod compaction;
mod message_passing;
mod sampling;

pub use compaction::{CompactedEdges, CompactedGraphs, CompactedIds, CompactionOps};
pub use message_passing::{Gradients, MessagePassingOps, Operand, ReduceOutput};
pub use sampling::SamplingOps;
