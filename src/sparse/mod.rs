//! Sparse graph adjacency
//!
//! Graphs enter the kernels as a flat adjacency in one of two formats:
//!
//! - [`CsrData`]: row pointers + column ids + optional edge ids
//! - [`CooData`]: row ids + column ids + optional edge ids
//!
//! Both are immutable value types built once per call; every conversion
//! or filtering operation returns a new adjacency whose `data` array names
//! the original edge ids.

mod conversion;
mod coo;
mod csr;
mod format;
mod remove;

pub use coo::CooData;
pub use csr::CsrData;
pub use format::{Adjacency, SparseFormat};

pub(crate) use conversion::{coo_to_csr_parts, expand_rows, group_by_key};
pub(crate) use coo::{CooParts, CooView};
pub(crate) use csr::{CsrParts, CsrView};
