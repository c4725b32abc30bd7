//! Sparse format definitions

use super::{CooData, CsrData};
use crate::dtype::DType;
use crate::runtime::Device;

/// Sparse adjacency storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseFormat {
    /// Coordinate format (COO)
    ///
    /// Stores explicit (row, col, edge id) triplets.
    /// Best for: construction, edge-parallel scatter, edge filtering
    Coo,

    /// Compressed Sparse Row (CSR)
    ///
    /// Row pointers + column indices + edge ids.
    /// Best for: row-wise sampling, per-destination reduction
    Csr,
}

impl SparseFormat {
    /// Returns the format name as a string
    pub fn name(&self) -> &'static str {
        match self {
            SparseFormat::Coo => "COO",
            SparseFormat::Csr => "CSR",
        }
    }
}

impl std::fmt::Display for SparseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A graph adjacency in either supported format
///
/// Message-passing kernels read rows as destination nodes and columns as
/// source nodes.
#[derive(Debug, Clone, Copy)]
pub enum Adjacency<'a> {
    /// Row-compressed adjacency
    Csr(&'a CsrData),
    /// Coordinate-list adjacency
    Coo(&'a CooData),
}

impl Adjacency<'_> {
    /// Storage format
    pub fn format(&self) -> SparseFormat {
        match self {
            Self::Csr(_) => SparseFormat::Csr,
            Self::Coo(_) => SparseFormat::Coo,
        }
    }

    /// Shape as `[num_rows, num_cols]`
    pub fn shape(&self) -> [usize; 2] {
        match self {
            Self::Csr(csr) => csr.shape(),
            Self::Coo(coo) => coo.shape(),
        }
    }

    /// Number of edges
    pub fn nnz(&self) -> usize {
        match self {
            Self::Csr(csr) => csr.nnz(),
            Self::Coo(coo) => coo.nnz(),
        }
    }

    /// Dtype of the id arrays
    pub fn id_dtype(&self) -> DType {
        match self {
            Self::Csr(csr) => csr.id_dtype(),
            Self::Coo(coo) => coo.id_dtype(),
        }
    }

    /// Device of the id arrays
    pub fn device(&self) -> Device {
        match self {
            Self::Csr(csr) => csr.device(),
            Self::Coo(coo) => coo.device(),
        }
    }
}

impl<'a> From<&'a CsrData> for Adjacency<'a> {
    fn from(csr: &'a CsrData) -> Self {
        Self::Csr(csr)
    }
}

impl<'a> From<&'a CooData> for Adjacency<'a> {
    fn from(coo: &'a CooData) -> Self {
        Self::Coo(coo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_format_display() {
        assert_eq!(SparseFormat::Coo.to_string(), "COO");
        assert_eq!(SparseFormat::Csr.to_string(), "CSR");
    }

    #[test]
    fn test_adjacency_forwards_metadata() {
        let csr = CsrData::from_slices(&[0i64, 2, 3], &[0, 1, 0], None, [2, 2]).unwrap();
        let adj = Adjacency::from(&csr);
        assert_eq!(adj.format(), SparseFormat::Csr);
        assert_eq!(adj.nnz(), 3);
        assert_eq!(adj.id_dtype(), DType::I64);
        assert_eq!(adj.shape(), [2, 2]);
    }
}
