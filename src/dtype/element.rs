//! Element traits for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Trait for types that can be elements of a tensor
///
/// This trait connects Rust's type system to graphr's runtime dtype system.
/// It's implemented for all primitive numeric types graphr stores.
///
/// # Bounds
/// - `Copy + Send + Sync + 'static` - Basic trait requirements
/// - `Pod + Zeroable` - Safe memory transmutation (bytemuck)
/// - `Add + Sub + Mul + Div` - Arithmetic operations (Output = Self)
/// - `PartialOrd` - Comparison for min/max operations
pub trait Element:
    Copy
    + Clone
    + Debug
    + Send
    + Sync
    + Pod
    + Zeroable
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Convert to f64 for generic numeric operations
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;
}

/// Floating point element, used for features, probabilities and weights
///
/// Kernels accumulate in the element's own precision, so this trait only adds
/// what max/min reductions and gradient formulas need on top of [`Element`].
pub trait FloatElement: Element + Neg<Output = Self> {
    /// Positive infinity (identity of `min`)
    fn infinity() -> Self;

    /// Negative infinity (identity of `max`)
    fn neg_infinity() -> Self;

    /// Returns true if the value is neither infinite nor NaN
    fn is_finite(self) -> bool;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr, $zero:expr, $one:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $ty
            }

            #[inline]
            fn zero() -> Self {
                $zero
            }

            #[inline]
            fn one() -> Self {
                $one
            }
        }
    };
}

impl_element!(f64, DType::F64, 0.0, 1.0);
impl_element!(f32, DType::F32, 0.0, 1.0);
impl_element!(i64, DType::I64, 0, 1);
impl_element!(i32, DType::I32, 0, 1);
impl_element!(i8, DType::I8, 0, 1);
impl_element!(u8, DType::U8, 0, 1);

macro_rules! impl_float_element {
    ($ty:ty) => {
        impl FloatElement for $ty {
            #[inline]
            fn infinity() -> Self {
                <$ty>::INFINITY
            }

            #[inline]
            fn neg_infinity() -> Self {
                <$ty>::NEG_INFINITY
            }

            #[inline]
            fn is_finite(self) -> bool {
                <$ty>::is_finite(self)
            }
        }
    };
}

impl_float_element!(f64);
impl_float_element!(f32);

#[cfg(feature = "f16")]
macro_rules! impl_half_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            #[inline]
            fn to_f64(self) -> f64 {
                <$ty>::to_f64(self)
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                <$ty>::from_f64(v)
            }

            #[inline]
            fn zero() -> Self {
                <$ty>::ZERO
            }

            #[inline]
            fn one() -> Self {
                <$ty>::ONE
            }
        }

        impl_float_element!($ty);
    };
}

#[cfg(feature = "f16")]
impl_half_element!(half::f16, DType::F16);
#[cfg(feature = "f16")]
impl_half_element!(half::bf16, DType::BF16);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_dtypes() {
        assert_eq!(<f32 as Element>::DTYPE, DType::F32);
        assert_eq!(<i64 as Element>::DTYPE, DType::I64);
        assert_eq!(<u8 as Element>::DTYPE, DType::U8);
    }

    #[test]
    fn test_float_identities() {
        assert_eq!(f32::neg_infinity(), f32::NEG_INFINITY);
        assert_eq!(f64::infinity(), f64::INFINITY);
        assert!(!FloatElement::is_finite(f32::NAN));
        assert!(FloatElement::is_finite(1.5f64));
    }
}
