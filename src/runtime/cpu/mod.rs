//! CPU runtime implementation
//!
//! Every kernel of the crate runs here. Work is split across rayon workers
//! (when the `rayon` feature is on) inside the client's thread pool;
//! without the feature each helper in `parallel` runs sequentially with
//! identical results.
//!
//! # Layout
//!
//! - [`CpuClient`] dispatches operations and owns the configuration
//! - [`IdHashMap`] relabels ids concurrently
//! - [`rowwise`] holds the pick engine and the built-in pick policies
//! - `kernels` holds the binary-reduce forward and backward passes

mod client;
mod compaction;
mod id_hash_map;
pub(crate) mod kernels;
mod message_passing;
pub(crate) mod parallel;
pub(crate) mod random;
pub mod rowwise;
mod sampling;

pub use client::{ClientConfig, CpuClient};
pub use id_hash_map::IdHashMap;
