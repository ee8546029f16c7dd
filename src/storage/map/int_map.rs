//! Integer-to-integer map
//!
//! Same engine as [`UnmanagedMap`](super::UnmanagedMap), fixed to `i32`
//! values and allowed to grow to `2^30` slots. Unlike the generic map an
//! out-of-range capacity request is an error rather than clamped.

use super::table::{Iter, MapStats, OpenTable};
use crate::config::{MapConfig, MAX_TABLE_POWER};
use crate::error::{Error, Result};
use std::fmt;

pub struct IntMap {
    table: OpenTable<i32>,
}

impl IntMap {
    pub fn new() -> Result<Self> {
        Self::with_config(MapConfig::int_map())
    }

    /// Map with `2^power` slots; `power` must be in `1..=30`
    pub fn with_capacity_power(power: u32) -> Result<Self> {
        if power == 0 || power > MAX_TABLE_POWER {
            return Err(Error::InvalidArgument(format!(
                "Capacity power must be between 1 and {}, got {}",
                MAX_TABLE_POWER, power
            )));
        }

        // Only the first table may sit below min_power; compaction never
        // shrinks under it.
        let mut config = MapConfig::int_map();
        config.initial_power = power;
        Ok(Self {
            table: OpenTable::new(power, config)?,
        })
    }

    pub fn with_config(config: MapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            table: OpenTable::new(config.initial_power, config)?,
        })
    }

    pub fn set(&mut self, key: i32, value: i32) -> Result<()> {
        self.table.set(key, value)
    }

    pub fn get(&self, key: i32) -> Result<i32> {
        self.table
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("Key {} not found", key)))
    }

    #[inline]
    pub fn try_get(&self, key: i32) -> Option<i32> {
        self.table.get(key)
    }

    #[inline]
    pub fn contains_key(&self, key: i32) -> bool {
        self.table.find_index(key).is_some()
    }

    pub fn try_remove(&mut self, key: i32) -> Option<i32> {
        self.table.remove(key)
    }

    /// Add `delta` to the value at `key`, starting from zero when absent
    pub fn increment(&mut self, key: i32, delta: i32) -> Result<i32> {
        let value = self.table.get(key).unwrap_or(0).wrapping_add(delta);
        self.table.set(key, value)?;
        Ok(value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn iter(&self) -> Iter<'_, i32> {
        self.table.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.table.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = i32> + '_ {
        self.table.iter().map(|(_, value)| value)
    }

    pub fn compact(&mut self) -> Result<()> {
        self.table.compact()
    }

    pub fn resize(&mut self) -> Result<()> {
        self.table.resize()
    }

    pub fn ensure_capacity(&mut self, expected: usize) -> Result<()> {
        self.table.ensure_capacity(expected)
    }

    pub fn clear(&mut self) {
        self.table.clear()
    }

    pub fn dispose(&mut self) {
        self.table.dispose()
    }

    pub fn stats(&self) -> MapStats {
        self.table.stats()
    }

    pub fn debug_validate(&self) {
        self.table.debug_validate()
    }
}

impl<'a> IntoIterator for &'a IntMap {
    type Item = (i32, i32);
    type IntoIter = Iter<'a, i32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for IntMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
