//! Core Tensor type

use super::{Layout, Storage};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::Device;
use std::fmt;

/// N-dimensional array tagged with a dtype and a device
///
/// `Tensor` is:
/// - **Type-erased**: the element type is a runtime [`DType`]; typed access
///   goes through [`Tensor::as_slice`]
/// - **Reference-counted**: cloning shares the underlying [`Storage`]
/// - **Device-tagged**: kernels check the [`Device`] before touching data
///
/// Graph kernels treat the first axis as the node or edge index and the
/// remaining axes as the feature shape.
#[derive(Clone)]
pub struct Tensor {
    storage: Storage,
    layout: Layout,
    dtype: DType,
    device: Device,
}

impl Tensor {
    /// Create a tensor from a slice of data
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of `shape`. Use
    /// [`Self::try_from_slice`] for a fallible alternative.
    ///
    /// # Example
    ///
    /// ```
    /// use graphr::runtime::Device;
    /// use graphr::tensor::Tensor;
    ///
    /// let t = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2], Device::Cpu);
    /// assert_eq!(t.feature_shape(), &[2]);
    /// ```
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize], device: Device) -> Self {
        Self::try_from_slice(data, shape, device).expect("Tensor::from_slice failed")
    }

    /// Create a tensor from a slice of data (fallible version)
    pub fn try_from_slice<T: Element>(data: &[T], shape: &[usize], device: Device) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Self {
            storage: Storage::from_slice(data),
            layout: Layout::contiguous(shape),
            dtype: T::DTYPE,
            device,
        })
    }

    /// Create a CPU tensor taking the values of a vector
    pub(crate) fn from_vec<T: Element>(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        Self::try_from_slice(&data, shape, Device::Cpu)
    }

    /// Create a 1-D CPU tensor
    pub(crate) fn from_vec1<T: Element>(data: Vec<T>) -> Self {
        let len = data.len();
        Self {
            storage: Storage::from_slice(&data),
            layout: Layout::contiguous(&[len]),
            dtype: T::DTYPE,
            device: Device::Cpu,
        }
    }

    /// Create a zero-filled tensor
    pub fn zeros(shape: &[usize], dtype: DType, device: Device) -> Self {
        let layout = Layout::contiguous(shape);
        Self {
            storage: Storage::zeroed(layout.elem_count() * dtype.size_in_bytes()),
            layout,
            dtype,
            device,
        }
    }

    // ===== Accessors =====

    /// Get the storage
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Get the layout
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Number of dimensions
    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.layout.elem_count()
    }

    /// Element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Device the tensor belongs to
    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Size of the first axis (number of nodes or edges)
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.shape().first().copied().unwrap_or(1)
    }

    /// Trailing axes (everything but the first)
    #[inline]
    pub fn feature_shape(&self) -> &[usize] {
        let shape = self.shape();
        if shape.is_empty() { shape } else { &shape[1..] }
    }

    /// Number of elements in one row of the first axis
    #[inline]
    pub fn row_numel(&self) -> usize {
        self.feature_shape().iter().product()
    }

    // ===== Views =====

    /// Same data with a different shape
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        let layout = self
            .layout
            .reshape(shape)
            .ok_or_else(|| Error::shape_mismatch(shape, self.shape()))?;
        Ok(Self {
            storage: self.storage.clone(),
            layout,
            dtype: self.dtype,
            device: self.device,
        })
    }

    /// Same data tagged with another device
    ///
    /// Only the tag changes: there is no accelerator memory to move to.
    pub fn with_device(&self, device: Device) -> Self {
        Self {
            device,
            ..self.clone()
        }
    }

    // ===== Data Access =====

    /// Borrow the elements as a typed slice
    ///
    /// Fails with [`Error::DTypeMismatch`] if `T` is not the tensor's dtype.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        if T::DTYPE != self.dtype {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype,
                rhs: T::DTYPE,
            });
        }
        self.storage.as_slice()
    }

    /// Copy the elements to a Vec (fallible version)
    pub fn try_to_vec<T: Element>(&self) -> Result<Vec<T>> {
        Ok(self.as_slice::<T>()?.to_vec())
    }

    /// Copy the elements to a Vec
    ///
    /// # Panics
    ///
    /// Panics if `T` does not match the tensor's dtype.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        self.try_to_vec().expect("Tensor::to_vec dtype mismatch")
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .field("dtype", &self.dtype)
            .field("device", &self.device)
            .finish()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor({:?}, dtype={}, device={})",
            self.shape(),
            self.dtype,
            self.device
        )
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct TensorRepr {
        dtype: DType,
        shape: Vec<usize>,
        device: Device,
        bytes: Vec<u8>,
    }

    impl Serialize for Tensor {
        fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
            TensorRepr {
                dtype: self.dtype,
                shape: self.shape().to_vec(),
                device: self.device,
                bytes: self.storage.as_bytes().to_vec(),
            }
            .serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Tensor {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
            let repr = TensorRepr::deserialize(deserializer)?;
            let layout = Layout::contiguous(&repr.shape);
            if layout.elem_count() * repr.dtype.size_in_bytes() != repr.bytes.len() {
                return Err(serde::de::Error::custom(format!(
                    "{} bytes do not fill a {} tensor of shape {:?}",
                    repr.bytes.len(),
                    repr.dtype,
                    repr.shape
                )));
            }
            Ok(Tensor {
                storage: Storage::from_slice(&repr.bytes),
                layout,
                dtype: repr.dtype,
                device: repr.device,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_shape_check() {
        let err = Tensor::try_from_slice(&[1.0f32, 2.0, 3.0], &[2, 2], Device::Cpu).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_typed_access_checks_dtype() {
        let t = Tensor::from_slice(&[1i64, 2, 3], &[3], Device::Cpu);
        assert_eq!(t.as_slice::<i64>().unwrap(), &[1, 2, 3]);
        assert!(matches!(
            t.as_slice::<i32>(),
            Err(Error::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_feature_shape() {
        let t = Tensor::zeros(&[5, 2, 3], DType::F32, Device::Cpu);
        assert_eq!(t.num_rows(), 5);
        assert_eq!(t.feature_shape(), &[2, 3]);
        assert_eq!(t.row_numel(), 6);
        assert_eq!(t.to_vec::<f32>(), vec![0.0; 30]);
    }

    #[test]
    fn test_reshape_and_retag() {
        let t = Tensor::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[4], Device::Cpu);
        let r = t.reshape(&[2, 2]).unwrap();
        assert_eq!(r.shape(), &[2, 2]);
        assert!(t.reshape(&[3]).is_err());
        assert_eq!(t.with_device(Device::Cuda(0)).device(), Device::Cuda(0));
    }
}
