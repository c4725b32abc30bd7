//! Concurrent id hash map used for id relabelling
//!
//! Open addressing over a power-of-two table of `(atomic key, atomic value)`
//! slots with double hashing. The table is sized once for the worst case
//! (every input id distinct, load factor at most 0.5) and never grows, so
//! workers can claim slots with a compare-exchange on the key and no lock.

use super::CpuClient;
use super::parallel::{exclusive_scan, for_each_grain_mut, map_range};
use crate::dtype::{AtomicId, IdElement};
use crate::error::{Error, Result};
use std::sync::atomic::Ordering;

const HASH_FACTOR: u64 = 0x9E37_79B9_7F4A_7C15;

#[inline]
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Double-hashing probe sequence over a table of `mask + 1` slots
///
/// The stride is odd, so the sequence visits every slot of the
/// power-of-two table before repeating.
#[derive(Clone, Copy, Debug)]
struct Probe {
    pos: usize,
    stride: usize,
    mask: usize,
}

impl Probe {
    #[inline]
    fn new(bits: u64, mask: usize) -> Self {
        Self {
            pos: (bits.wrapping_mul(HASH_FACTOR) as usize) & mask,
            stride: (mix(bits) as usize & mask) | 1,
            mask,
        }
    }

    #[inline]
    fn advance(&mut self) {
        self.pos = (self.pos + self.stride) & self.mask;
    }
}

/// Outcome of one insertion attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Claim {
    /// This call wrote the key
    First,
    /// The key was already present
    Duplicate,
}

/// Concurrent map from node id to compacted index
///
/// # Example
///
/// ```
/// use graphr::runtime::cpu::{CpuClient, IdHashMap};
///
/// let client = CpuClient::new();
/// let (map, unique) = IdHashMap::init(&client, &[7i64, 3, 7, 9]).unwrap();
/// assert_eq!(unique.len(), 3);
/// assert!(map.map(3, -1) < 3);
/// assert_eq!(map.map(42, -1), -1);
/// ```
pub struct IdHashMap<I: IdElement> {
    keys: Vec<I::Atomic>,
    values: Vec<I::Atomic>,
    mask: usize,
    len: usize,
}

impl<I: IdElement> IdHashMap<I> {
    fn with_capacity_for(n: usize) -> Self {
        let capacity = (2 * n.max(1)).next_power_of_two();
        let keys = (0..capacity).map(|_| I::Atomic::new(I::EMPTY)).collect();
        let values = (0..capacity).map(|_| I::Atomic::new(I::EMPTY)).collect();
        tracing::trace!(capacity, ids = n, "allocated id hash map");
        Self {
            keys,
            values,
            mask: capacity - 1,
            len: 0,
        }
    }

    /// Build a map over `ids` and return it with the distinct ids
    ///
    /// Every distinct id appears exactly once in the returned vector, with
    /// value equal to its position there. The order follows the
    /// occurrence that won the insertion race and is not guaranteed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if an id equals the reserved `-1`.
    pub fn init(client: &CpuClient, ids: &[I]) -> Result<(Self, Vec<I>)> {
        check_ids("ids", ids)?;
        let mut map = Self::with_capacity_for(ids.len());
        let unique = map.insert_all(client, ids);
        map.assign_dense_values(client, &unique, 0);
        map.len = unique.len();
        Ok((map, unique))
    }

    /// Build a map whose first entries are `leading`, in order
    ///
    /// `leading[i]` maps to `i`. The remaining distinct ids of `ids` that
    /// are not in `leading` get values `leading.len()..` and are returned.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `leading` contains duplicates or if
    /// any id equals the reserved `-1`.
    pub fn init_with_leading(client: &CpuClient, leading: &[I], ids: &[I]) -> Result<(Self, Vec<I>)> {
        check_ids("leading", leading)?;
        check_ids("ids", ids)?;
        let mut map = Self::with_capacity_for(leading.len() + ids.len());

        let leading_unique = map.insert_all(client, leading);
        if leading_unique.len() != leading.len() {
            return Err(Error::invalid_argument(
                "leading",
                format!(
                    "{} duplicate ids among {} leading ids",
                    leading.len() - leading_unique.len(),
                    leading.len()
                ),
            ));
        }
        map.assign_dense_values(client, leading, 0);

        let new_ids = map.insert_all(client, ids);
        map.assign_dense_values(client, &new_ids, leading.len());
        map.len = leading.len() + new_ids.len();
        Ok((map, new_ids))
    }

    /// Insert every id; return the first-claiming occurrences in input order
    fn insert_all(&self, client: &CpuClient, ids: &[I]) -> Vec<I> {
        let grain = client.hash_grain();
        let mut valid = vec![false; ids.len()];
        for_each_grain_mut(client, &mut valid, grain, |chunk, flags| {
            let base = chunk * grain;
            for (j, flag) in flags.iter_mut().enumerate() {
                *flag = self.insert(ids[base + j]) == Claim::First;
            }
        });

        let counts: Vec<usize> = valid.iter().map(|&v| v as usize).collect();
        let offsets = exclusive_scan(&counts);
        let mut unique = vec![I::EMPTY; offsets[ids.len()]];
        for (i, &v) in valid.iter().enumerate() {
            if v {
                unique[offsets[i]] = ids[i];
            }
        }
        unique
    }

    fn assign_dense_values(&self, client: &CpuClient, ids: &[I], base: usize) {
        map_range(client, ids.len(), |i| self.set_value(ids[i], I::from_usize(base + i)));
    }

    fn insert(&self, id: I) -> Claim {
        let mut probe = Probe::new(id.to_bits64(), self.mask);
        loop {
            match self.keys[probe.pos].compare_exchange(
                I::EMPTY,
                id,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Claim::First,
                Err(existing) if existing == id => return Claim::Duplicate,
                Err(_) => probe.advance(),
            }
        }
    }

    /// Slot holding `id`, or `None` if absent
    fn find(&self, id: I) -> Option<usize> {
        let mut probe = Probe::new(id.to_bits64(), self.mask);
        for _ in 0..=self.mask {
            let key = self.keys[probe.pos].load(Ordering::Acquire);
            if key == id {
                return Some(probe.pos);
            }
            if key == I::EMPTY {
                return None;
            }
            probe.advance();
        }
        None
    }

    /// Attach `value` to an id that is already present
    ///
    /// Setting the value of an absent id is a caller bug; it trips a debug
    /// assertion and is ignored in release builds.
    pub fn set_value(&self, id: I, value: I) {
        match self.find(id) {
            Some(slot) => self.values[slot].store(value, Ordering::Release),
            None => debug_assert!(false, "set_value on absent id {}", id.to_i64()),
        }
    }

    /// Compacted index of `id`, or `default` if absent
    #[inline]
    pub fn map(&self, id: I, default: I) -> I {
        if id == I::EMPTY {
            return default;
        }
        match self.find(id) {
            Some(slot) => self.values[slot].load(Ordering::Acquire),
            None => default,
        }
    }

    /// Look up every id in parallel, writing `default` for absent ones
    pub fn map_ids(&self, client: &CpuClient, ids: &[I], default: I) -> Vec<I> {
        map_range(client, ids.len(), |i| self.map(ids[i], default))
    }

    /// Returns true if `id` is in the map
    pub fn contains(&self, id: I) -> bool {
        id != I::EMPTY && self.find(id).is_some()
    }

    /// Number of distinct ids
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map holds no id
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }
}

impl<I: IdElement> std::fmt::Debug for IdHashMap<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdHashMap")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

fn check_ids<I: IdElement>(arg: &'static str, ids: &[I]) -> Result<()> {
    if ids.contains(&I::EMPTY) {
        return Err(Error::invalid_argument(
            arg,
            "id -1 is reserved as the empty slot marker",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::ClientConfig;
    use std::collections::HashSet;

    fn small_grain_client() -> CpuClient {
        CpuClient::with_config(ClientConfig::default().with_hash_grain(3).with_min_len(1)).unwrap()
    }

    #[test]
    fn test_probe_visits_every_slot() {
        let mask = 15;
        let mut probe = Probe::new(12345, mask);
        let mut seen = HashSet::new();
        for _ in 0..=mask {
            seen.insert(probe.pos);
            probe.advance();
        }
        assert_eq!(seen.len(), mask + 1);
    }

    #[test]
    fn test_init_dedups() {
        let client = small_grain_client();
        let ids: Vec<i32> = vec![5, 1, 5, 9, 1, 1, 7, 5, 0];
        let (map, unique) = IdHashMap::init(&client, &ids).unwrap();
        let set: HashSet<i32> = unique.iter().copied().collect();
        assert_eq!(set, HashSet::from([0, 1, 5, 7, 9]));
        assert_eq!(unique.len(), 5);
        assert_eq!(map.len(), 5);
        for (i, &id) in unique.iter().enumerate() {
            assert_eq!(map.map(id, -1), i as i32);
        }
        assert_eq!(map.map(4, -1), -1);
        assert!(map.capacity() >= 2 * ids.len());
        assert!(map.capacity().is_power_of_two());
    }

    #[test]
    fn test_init_empty() {
        let client = CpuClient::new();
        let (map, unique) = IdHashMap::<i64>::init(&client, &[]).unwrap();
        assert!(unique.is_empty());
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 2);
        assert_eq!(map.map(3, -7), -7);
    }

    #[test]
    fn test_rejects_sentinel() {
        let client = CpuClient::new();
        assert!(matches!(
            IdHashMap::init(&client, &[1i64, -1]),
            Err(Error::InvalidArgument { arg: "ids", .. })
        ));
    }

    #[test]
    fn test_leading_ids_keep_order() {
        let client = small_grain_client();
        let (map, new_ids) = IdHashMap::init_with_leading(&client, &[30i64, 10], &[10, 20, 30, 40, 20]).unwrap();
        assert_eq!(map.map(30, -1), 0);
        assert_eq!(map.map(10, -1), 1);
        let mut sorted = new_ids.clone();
        sorted.sort();
        assert_eq!(sorted, vec![20, 40]);
        assert_eq!(map.len(), 4);
        for (i, &id) in new_ids.iter().enumerate() {
            assert_eq!(map.map(id, -1), 2 + i as i64);
        }
    }

    #[test]
    fn test_leading_duplicates_rejected() {
        let client = CpuClient::new();
        assert!(matches!(
            IdHashMap::init_with_leading(&client, &[1i32, 1], &[2]),
            Err(Error::InvalidArgument { arg: "leading", .. })
        ));
    }

    #[test]
    fn test_map_ids_and_set_value() {
        let client = CpuClient::new();
        let (map, _) = IdHashMap::init(&client, &[100i64, 200]).unwrap();
        map.set_value(200, 9);
        assert_eq!(map.map_ids(&client, &[200, 300, 100], -1)[..2], [9, -1]);
        assert!(map.contains(100));
        assert!(!map.contains(-1));
    }

    #[test]
    fn test_large_input_parallel_build() {
        let client = CpuClient::new();
        let ids: Vec<i64> = (0..20_000).map(|i| (i * 7919) % 5003).collect();
        let (map, unique) = IdHashMap::init(&client, &ids).unwrap();
        assert_eq!(unique.len(), 5003);
        let looked_up = map.map_ids(&client, &ids, -1);
        assert!(looked_up.iter().all(|&v| (0..5003).contains(&v)));
        for (&id, &v) in ids.iter().zip(&looked_up) {
            assert_eq!(unique[v as usize], id);
        }
    }
}
