//! DType dispatch utilities
//!
//! Kernels are written once as generics over [`FloatElement`] (features,
//! weights) and [`IdElement`] (node and edge ids). These macros turn a runtime
//! [`DType`] into a concrete type parameter so that the right monomorphized
//! kernel is selected per call.
//!
//! # Usage
//!
//! ```ignore
//! fn spmm(csr: &CsrData, feat: &Tensor) -> Result<Tensor> {
//!     dispatch_id_dtype!(csr.id_dtype(), I => {
//!         dispatch_float_dtype!(feat.dtype(), T => {
//!             spmm_impl::<I, T>(csr, feat)
//!         }, "spmm")
//!     }, "spmm")
//! }
//! ```
//!
//! Unsupported dtypes make the enclosing function return
//! [`Error::UnsupportedDType`], so the caller must return `Result`.
//!
//! [`FloatElement`]: crate::dtype::FloatElement
//! [`IdElement`]: crate::dtype::IdElement
//! [`DType`]: crate::dtype::DType
//! [`Error::UnsupportedDType`]: crate::error::Error::UnsupportedDType

/// Internal helper macro to dispatch types requiring the "f16" feature.
#[macro_export]
#[doc(hidden)]
macro_rules! dispatch_f16_type {
    ($T:ident, $body:block, $dtype:expr, $error_op:expr, $type:ty) => {{
        #[cfg(feature = "f16")]
        {
            type $T = $type;
            $body
        }
        #[cfg(not(feature = "f16"))]
        {
            return Err($crate::error::Error::UnsupportedDType {
                dtype: $dtype,
                op: $error_op,
            });
        }
    }};
}

/// Dispatch a floating point dtype (`F32`, `F64`, and `F16`/`BF16` with the
/// "f16" feature) to a block with `T` bound to the Rust type.
#[macro_export]
macro_rules! dispatch_float_dtype {
    ($dtype:expr, $T:ident => $body:block, $error_op:expr) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, $error_op, half::f16)
            }
            $crate::dtype::DType::BF16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, $error_op, half::bf16)
            }
            other => {
                return Err($crate::error::Error::UnsupportedDType {
                    dtype: other,
                    op: $error_op,
                })
            }
        }
    };
}

/// Dispatch an id dtype (`I32`, `I64`) to a block with `I` bound to the Rust type.
#[macro_export]
macro_rules! dispatch_id_dtype {
    ($dtype:expr, $I:ident => $body:block, $error_op:expr) => {
        match $dtype {
            $crate::dtype::DType::I64 => {
                type $I = i64;
                $body
            }
            $crate::dtype::DType::I32 => {
                type $I = i32;
                $body
            }
            other => {
                return Err($crate::error::Error::UnsupportedDType {
                    dtype: other,
                    op: $error_op,
                })
            }
        }
    };
}

/// Dispatch a weight dtype (`F32`, `F64`) to a block with `T` bound to the Rust type.
///
/// Sampling probabilities and top-k weights are never stored in half precision.
#[macro_export]
macro_rules! dispatch_weight_dtype {
    ($dtype:expr, $T:ident => $body:block, $error_op:expr) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            other => {
                return Err($crate::error::Error::UnsupportedDType {
                    dtype: other,
                    op: $error_op,
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::dtype::{DType, Element};
    use crate::error::{Error, Result};

    fn width(dtype: DType) -> Result<usize> {
        dispatch_float_dtype!(dtype, T => {
            Ok(std::mem::size_of::<T>())
        }, "width")
    }

    fn id_dtype(dtype: DType) -> Result<DType> {
        dispatch_id_dtype!(dtype, I => {
            Ok(<I as Element>::DTYPE)
        }, "id_dtype")
    }

    #[test]
    fn test_float_dispatch() {
        assert_eq!(width(DType::F32).unwrap(), 4);
        assert_eq!(width(DType::F64).unwrap(), 8);
        assert!(matches!(
            width(DType::I32),
            Err(Error::UnsupportedDType { op: "width", .. })
        ));
    }

    #[test]
    fn test_id_dispatch() {
        assert_eq!(id_dtype(DType::I32).unwrap(), DType::I32);
        assert_eq!(id_dtype(DType::I64).unwrap(), DType::I64);
        assert!(id_dtype(DType::U8).is_err());
    }
}
