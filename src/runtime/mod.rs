//! Runtime support for graph kernels
//!
//! This module defines the device tag carried by every tensor and the CPU
//! backend that executes all kernels.
//!
//! # Architecture
//!
//! ```text
//! Device (context tag: which device a buffer lives on)
//! cpu
//! ├── CpuClient (dispatches operations, owns the thread pool and config)
//! ├── IdHashMap (concurrent id -> compacted index map)
//! ├── rowwise (row-wise pick engine and its policies)
//! └── kernels (binary-reduce forward/backward)
//! ```
//!
//! Accelerator devices exist only as tags: a tensor may claim to live on
//! `Device::Cuda(n)`, but every operation in this crate rejects such inputs
//! with [`Error::UnsupportedDevice`](crate::error::Error::UnsupportedDevice).

mod device;

pub mod cpu;

pub use device::Device;
