//! Tensor types
//!
//! This module provides the `Tensor` type: an n-dimensional, typed,
//! reference-counted buffer tagged with the device it belongs to. Graph
//! kernels only need typed slice access, shape introspection and fresh
//! allocation, so every tensor is contiguous and row-major.

mod core;
mod layout;
mod storage;

pub use core::Tensor;
pub use layout::{Layout, Shape};
pub(crate) use layout::row_major_strides;
pub use storage::Storage;
