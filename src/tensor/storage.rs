//! Storage: host memory with Arc-based sharing

use crate::error::{Error, Result};
use bytemuck::Pod;
use std::sync::Arc;

/// Reference-counted host buffer backing a tensor
///
/// The bytes live in a `u64` word buffer so that every supported element
/// type (at most 8 bytes wide) can be viewed in place without realignment.
/// Cloning shares the buffer; memory is released with the last reference.
#[derive(Clone)]
pub struct Storage {
    words: Arc<Vec<u64>>,
    nbytes: usize,
}

impl Storage {
    /// Zero-initialized storage of `nbytes` bytes
    pub fn zeroed(nbytes: usize) -> Self {
        Self {
            words: Arc::new(vec![0u64; nbytes.div_ceil(8)]),
            nbytes,
        }
    }

    /// Copy `data` into fresh storage
    pub fn from_slice<T: Pod>(data: &[T]) -> Self {
        let src: &[u8] = bytemuck::cast_slice(data);
        let mut words = vec![0u64; src.len().div_ceil(8)];
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..src.len()].copy_from_slice(src);
        Self {
            words: Arc::new(words),
            nbytes: src.len(),
        }
    }

    /// Size in bytes
    #[inline]
    pub fn nbytes(&self) -> usize {
        self.nbytes
    }

    /// Raw bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.nbytes]
    }

    /// View the bytes as elements of `T`
    pub fn as_slice<T: Pod>(&self) -> Result<&[T]> {
        bytemuck::try_cast_slice(self.as_bytes())
            .map_err(|e| Error::Internal(format!("storage cast failed: {:?}", e)))
    }

    /// Returns true if another tensor shares this buffer
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.words) > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_odd_byte_count() {
        let storage = Storage::from_slice(&[1i8, -2, 3]);
        assert_eq!(storage.nbytes(), 3);
        assert_eq!(storage.as_slice::<i8>().unwrap(), &[1, -2, 3]);
    }

    #[test]
    fn test_clone_shares() {
        let a = Storage::from_slice(&[1.5f64, 2.5]);
        let b = a.clone();
        assert!(a.is_shared());
        assert_eq!(b.as_slice::<f64>().unwrap(), &[1.5, 2.5]);
    }
}
