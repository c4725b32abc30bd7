//! Id element trait: node and edge ids stored as 32- or 64-bit integers

use super::Element;
use std::hash::Hash;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

/// Atomic cell holding an id, used by the concurrent id hash map
pub trait AtomicId<I>: Send + Sync {
    /// Create a new atomic cell
    fn new(v: I) -> Self;

    /// Load the current value
    fn load(&self, order: Ordering) -> I;

    /// Store a value
    fn store(&self, v: I, order: Ordering);

    /// Compare-and-swap; returns the previous value on both success and failure
    fn compare_exchange(
        &self,
        current: I,
        new: I,
        success: Ordering,
        failure: Ordering,
    ) -> std::result::Result<I, I>;
}

/// Trait for integer types used as node or edge ids (`i32`, `i64`)
///
/// Ids are non-negative in every valid adjacency; the all-bits-set value
/// (`-1`) is reserved as the empty-slot sentinel of [`IdHashMap`] and as the
/// "no contribution" marker of argmax/argmin outputs.
///
/// [`IdHashMap`]: crate::runtime::cpu::IdHashMap
pub trait IdElement: Element + Ord + Hash + Eq {
    /// Atomic counterpart of this id type
    type Atomic: AtomicId<Self>;

    /// Sentinel value with all bits set
    const EMPTY: Self;

    /// Convert to usize (the id must be non-negative)
    fn to_usize(self) -> usize;

    /// Convert to i64
    fn to_i64(self) -> i64;

    /// Convert from usize (truncates if it does not fit)
    fn from_usize(v: usize) -> Self;

    /// Bit pattern as u64 (two's complement, zero-extended)
    fn to_bits64(self) -> u64;

    /// Returns true if the id is a valid non-negative index
    #[inline]
    fn is_valid_index(self) -> bool {
        self.to_i64() >= 0
    }
}

macro_rules! impl_id_element {
    ($ty:ty, $uty:ty, $atomic:ty) => {
        impl AtomicId<$ty> for $atomic {
            #[inline]
            fn new(v: $ty) -> Self {
                <$atomic>::new(v)
            }

            #[inline]
            fn load(&self, order: Ordering) -> $ty {
                <$atomic>::load(self, order)
            }

            #[inline]
            fn store(&self, v: $ty, order: Ordering) {
                <$atomic>::store(self, v, order)
            }

            #[inline]
            fn compare_exchange(
                &self,
                current: $ty,
                new: $ty,
                success: Ordering,
                failure: Ordering,
            ) -> std::result::Result<$ty, $ty> {
                <$atomic>::compare_exchange(self, current, new, success, failure)
            }
        }

        impl IdElement for $ty {
            type Atomic = $atomic;

            const EMPTY: Self = -1;

            #[inline]
            fn to_usize(self) -> usize {
                debug_assert!(self >= 0, "negative id {} used as index", self);
                self as usize
            }

            #[inline]
            fn to_i64(self) -> i64 {
                self as i64
            }

            #[inline]
            fn from_usize(v: usize) -> Self {
                v as $ty
            }

            #[inline]
            fn to_bits64(self) -> u64 {
                (self as $uty) as u64
            }
        }
    };
}

impl_id_element!(i32, u32, AtomicI32);
impl_id_element!(i64, u64, AtomicI64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sentinel_is_all_bits() {
        assert_eq!(<i32 as IdElement>::EMPTY.to_bits64(), u32::MAX as u64);
        assert_eq!(<i64 as IdElement>::EMPTY.to_bits64(), u64::MAX);
    }

    #[test]
    fn test_atomic_cas() {
        let cell = <AtomicI64 as AtomicId<i64>>::new(-1);
        assert_eq!(
            AtomicId::compare_exchange(&cell, -1, 5, Ordering::AcqRel, Ordering::Acquire),
            Ok(-1)
        );
        assert_eq!(
            AtomicId::compare_exchange(&cell, -1, 6, Ordering::AcqRel, Ordering::Acquire),
            Err(5)
        );
        assert_eq!(AtomicId::<i64>::load(&cell, Ordering::Acquire), 5);
    }
}
