//! Dense sorted key/value store
//!
//! Three parallel [`IntBuffer`]s hold keys, values and occupancy flags, kept
//! sorted by key at all times. Removal only clears the flag; [`compact`]
//! later strips every vacated slot from all three buffers in one pass each.
//!
//! ```text
//! slot:      0    1    2    3
//! keys:    [ 3 ][ 5 ][ 8 ][ 9 ]
//! values:  [30 ][50 ][80 ][90 ]
//! occupied:[ 1 ][ 0 ][ 1 ][ 1 ]   ← remove(5)
//!
//! compact() → keys [3, 8, 9], count 3
//! ```
//!
//! [`compact`]: SortedKvStore::compact

use super::buffer::{IntBuffer, RawBuffer};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

const MIN_STORE_CAPACITY: usize = 4;

pub struct SortedKvStore {
    keys: IntBuffer,
    values: IntBuffer,
    occupied: IntBuffer,
    active: usize,
    scratch: RawBuffer<usize>,
}

impl SortedKvStore {
    pub fn new() -> Result<Self> {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(StoreConfig {
            initial_capacity: capacity,
        })
    }

    /// A zero capacity is promoted to a small minimum
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        let capacity = if config.initial_capacity == 0 {
            MIN_STORE_CAPACITY
        } else {
            config.initial_capacity
        };

        Ok(Self {
            keys: IntBuffer::with_capacity(capacity)?,
            values: IntBuffer::with_capacity(capacity)?,
            occupied: IntBuffer::with_capacity(capacity)?,
            active: 0,
            scratch: RawBuffer::with_capacity(0)?,
        })
    }

    /// Insert, update, or reoccupy a vacated slot for `key`
    pub fn add(&mut self, key: i32, value: i32) -> Result<()> {
        match self.binary_search(key) {
            Ok(idx) => {
                if self.occupied.get(idx) == 0 {
                    self.occupied.set(idx, 1);
                    self.active += 1;
                }
                self.values.set(idx, value);
            }
            Err(idx) => {
                // Reserve all three first so a failed allocation leaves
                // the buffers the same length.
                let needed = self.keys.len() + 1;
                self.keys.ensure_capacity(needed)?;
                self.values.ensure_capacity(needed)?;
                self.occupied.ensure_capacity(needed)?;

                self.keys.insert_at(idx, key, 1)?;
                self.values.insert_at(idx, value, 1)?;
                self.occupied.insert_at(idx, 1, 1)?;
                self.active += 1;
            }
        }
        Ok(())
    }

    #[inline]
    pub fn try_get(&self, key: i32) -> Option<i32> {
        self.live_index(key).map(|idx| self.values.get(idx))
    }

    /// Value for `key`, or [`Error::NotFound`]
    pub fn get(&self, key: i32) -> Result<i32> {
        self.try_get(key)
            .ok_or_else(|| Error::NotFound(format!("Key {} not found", key)))
    }

    #[inline]
    pub fn contains_key(&self, key: i32) -> bool {
        self.live_index(key).is_some()
    }

    /// Vacate `key`. Returns false when it was not present.
    pub fn remove(&mut self, key: i32) -> bool {
        self.try_remove(key).is_some()
    }

    /// Vacate `key` and return the physical slot it occupied
    pub fn try_remove(&mut self, key: i32) -> Option<usize> {
        let idx = self.live_index(key)?;
        self.vacate(idx);
        Some(idx)
    }

    /// Vacate every listed key, returning how many were present.
    ///
    /// Ascending input is merged against the key buffer in one linear pass;
    /// anything else falls back to one binary search per key.
    pub fn remove_many(&mut self, keys: &[i32]) -> usize {
        if keys.windows(2).all(|w| w[0] <= w[1]) {
            self.remove_sorted(keys)
        } else {
            keys.iter().filter(|&&key| self.remove(key)).count()
        }
    }

    fn remove_sorted(&mut self, keys: &[i32]) -> usize {
        let mut removed = 0;
        let (mut i, mut j) = (0, 0);
        let slots = self.keys.len();

        while i < slots && j < keys.len() {
            let stored = self.keys.get(i);
            match stored.cmp(&keys[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if self.occupied.get(i) != 0 {
                        self.vacate(i);
                        removed += 1;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        removed
    }

    /// Physically drop every vacated slot. Returns the number dropped.
    pub fn compact(&mut self) -> Result<usize> {
        let slots = self.keys.len();
        let vacated = slots - self.active;
        if vacated == 0 {
            return Ok(0);
        }

        self.scratch.truncate(0);
        self.scratch.ensure_capacity(vacated)?;
        for (idx, &flag) in self.occupied.iter().enumerate() {
            if flag == 0 {
                self.scratch.push(idx)?;
            }
        }

        let gaps = self.scratch.as_slice();
        self.keys.remove_multiple(gaps);
        self.values.remove_multiple(gaps);
        let dropped = self.occupied.remove_multiple(gaps);

        debug!(dropped, remaining = self.active, "Compacted sorted store");
        Ok(dropped)
    }

    /// Binary search over physical slots, vacated ones included.
    ///
    /// Returns `Ok(slot)` on a key match and `Err(insertion_point)` otherwise.
    #[inline]
    pub fn binary_search(&self, key: i32) -> std::result::Result<usize, usize> {
        self.keys.as_slice().binary_search(&key)
    }

    /// Live keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Live values in key order
    pub fn values(&self) -> impl Iterator<Item = i32> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Live `(key, value)` pairs in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.keys
            .iter()
            .zip(self.values.iter())
            .zip(self.occupied.iter())
            .filter(|&(_, &flag)| flag != 0)
            .map(|((&key, &value), _)| (key, value))
    }

    /// Number of live entries
    #[inline]
    pub fn count(&self) -> usize {
        self.active
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Physical slots in use, vacated ones included
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.keys.len()
    }

    pub fn free_capacity(&self) -> usize {
        self.keys.capacity().saturating_sub(self.keys.len())
    }

    /// Drop every entry, keeping the allocations
    pub fn clear(&mut self) {
        self.keys.truncate(0);
        self.values.truncate(0);
        self.occupied.truncate(0);
        self.active = 0;
    }

    /// Release all memory. The store stays usable and regrows on `add`.
    pub fn dispose(&mut self) {
        self.keys.dispose();
        self.values.dispose();
        self.occupied.dispose();
        self.scratch.dispose();
        self.active = 0;
    }

    #[inline]
    fn live_index(&self, key: i32) -> Option<usize> {
        match self.binary_search(key) {
            Ok(idx) if self.occupied.get(idx) != 0 => Some(idx),
            _ => None,
        }
    }

    #[inline]
    fn vacate(&mut self, idx: usize) {
        self.occupied.set(idx, 0);
        self.active -= 1;
    }
}

impl fmt::Display for SortedKvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Count: {}", self.active)?;
        for idx in 0..self.keys.len() {
            writeln!(
                f,
                "[{}] Key: {}, Value: {}, Occupied: {}",
                idx,
                self.keys.get(idx),
                self.values.get(idx),
                self.occupied.get(idx) != 0
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for SortedKvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(pairs: &[(i32, i32)]) -> SortedKvStore {
        let mut store = SortedKvStore::new().unwrap();
        for &(key, value) in pairs {
            store.add(key, value).unwrap();
        }
        store
    }

    #[test]
    fn test_parallel_buffers_grow_together() -> Result<()> {
        let mut store = SortedKvStore::with_capacity(1)?;
        for key in (0..300).rev() {
            store.add(key * 7 % 307, key)?;
            assert_eq!(store.keys.capacity(), store.values.capacity());
            assert_eq!(store.keys.capacity(), store.occupied.capacity());
        }

        assert_eq!(store.keys.len(), 300);
        assert_eq!(store.values.len(), 300);
        assert_eq!(store.occupied.len(), 300);
        let keys: Vec<i32> = store.keys().collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }

    #[test]
    fn test_add_keeps_keys_sorted() -> Result<()> {
        let mut store = store_with(&[(5, 50), (3, 30), (8, 80)]);
        assert_eq!(store.keys().collect::<Vec<_>>(), vec![3, 5, 8]);
        assert_eq!(store.try_get(5), Some(50));

        assert!(store.remove(5));
        assert_eq!(store.compact()?, 1);
        assert_eq!(store.keys().collect::<Vec<_>>(), vec![3, 8]);
        assert_eq!(store.count(), 2);
        assert_eq!(store.slot_count(), 2);
        Ok(())
    }

    #[test]
    fn test_update_and_reoccupy() -> Result<()> {
        let mut store = store_with(&[(1, 10), (2, 20)]);
        store.add(1, 11)?;
        assert_eq!(store.get(1)?, 11);
        assert_eq!(store.count(), 2);

        store.remove(2);
        assert!(store.try_get(2).is_none());
        assert_eq!(store.slot_count(), 2);

        store.add(2, 22)?;
        assert_eq!(store.get(2)?, 22);
        assert_eq!(store.count(), 2);
        assert_eq!(store.slot_count(), 2);
        Ok(())
    }

    #[test]
    fn test_vacated_key_is_a_miss() {
        let mut store = store_with(&[(4, 40)]);
        assert_eq!(store.try_remove(4), Some(0));
        assert!(!store.contains_key(4));
        assert!(matches!(store.get(4), Err(Error::NotFound(_))));
        assert_eq!(store.try_remove(4), None);
        assert!(!store.remove(4));
    }

    #[test]
    fn test_remove_many_sorted_and_unsorted_agree() {
        let pairs: Vec<(i32, i32)> = (0..50).map(|k| (k * 2, k)).collect();
        let mut sorted = store_with(&pairs);
        let mut unsorted = store_with(&pairs);

        let targets = [0, 3, 10, 10, 48, 98, 200];
        assert_eq!(sorted.remove_many(&targets), 4);
        assert_eq!(unsorted.remove_many(&[98, 10, 200, 0, 3, 48, 10]), 4);

        assert_eq!(
            sorted.iter().collect::<Vec<_>>(),
            unsorted.iter().collect::<Vec<_>>()
        );
        assert_eq!(sorted.count(), 46);
    }

    #[test]
    fn test_compact_scattered() -> Result<()> {
        let mut store = store_with(&(0..10).map(|k| (k, k * 10)).collect::<Vec<_>>());
        store.remove_many(&[1, 4, 5, 9]);
        assert_eq!(store.compact()?, 4);
        assert_eq!(store.keys().collect::<Vec<_>>(), vec![0, 2, 3, 6, 7, 8]);
        assert_eq!(store.values().collect::<Vec<_>>(), vec![0, 20, 30, 60, 70, 80]);
        assert_eq!(store.compact()?, 0);
        Ok(())
    }

    #[test]
    fn test_binary_search_positions() {
        let store = store_with(&[(10, 1), (20, 2), (30, 3)]);
        assert_eq!(store.binary_search(20), Ok(1));
        assert_eq!(store.binary_search(25), Err(2));
        assert_eq!(store.binary_search(-5), Err(0));
    }

    #[test]
    fn test_grows_past_initial_capacity() -> Result<()> {
        let mut store = SortedKvStore::with_capacity(0)?;
        for key in (0..100).rev() {
            store.add(key, -key)?;
        }
        assert_eq!(store.count(), 100);
        assert_eq!(store.keys().collect::<Vec<_>>(), (0..100).collect::<Vec<_>>());
        assert_eq!(store.get(42)?, -42);
        Ok(())
    }

    #[test]
    fn test_display() {
        let mut store = store_with(&[(1, 2)]);
        store.add(3, 4).unwrap();
        store.remove(3);
        let text = store.to_string();
        assert_eq!(
            text,
            "Count: 1\n[0] Key: 1, Value: 2, Occupied: true\n[1] Key: 3, Value: 4, Occupied: false\n"
        );
    }

    #[test]
    fn test_clear_and_dispose() -> Result<()> {
        let mut store = store_with(&[(1, 1), (2, 2)]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.slot_count(), 0);

        store.add(5, 5)?;
        store.dispose();
        store.dispose();
        assert_eq!(store.count(), 0);
        assert!(store.try_get(5).is_none());

        store.add(6, 6)?;
        assert_eq!(store.get(6)?, 6);
        Ok(())
    }
}
