//! Generic integer-keyed map

use super::table::{Iter, MapStats, OpenTable};
use crate::config::MapConfig;
use crate::error::{Error, Result};
use std::fmt;

/// Map from `i32` keys to `Copy` values in one manually managed table
///
/// Deletes leave tombstones. `set` compacts and then grows when occupied
/// plus tombstoned slots reach the grow load factor.
///
/// # Example
///
/// ```
/// use photonmem::UnmanagedMap;
///
/// let mut map = UnmanagedMap::new()?;
/// map.set(1, 100u64)?;
/// map.set(2, 200u64)?;
/// assert_eq!(map.get(1)?, 100);
/// assert!(map.try_remove(2).is_some());
/// assert!(map.try_get(2).is_none());
/// # Ok::<(), photonmem::Error>(())
/// ```
pub struct UnmanagedMap<V: Copy> {
    table: OpenTable<V>,
}

impl<V: Copy> UnmanagedMap<V> {
    /// Map with the default 256-slot table
    pub fn new() -> Result<Self> {
        Self::with_config(MapConfig::default())
    }

    /// Map with `2^power` slots, clamped into the configured bounds
    pub fn with_capacity_power(power: u32) -> Result<Self> {
        let config = MapConfig::default();
        let power = power.clamp(config.min_power, config.max_power);
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

    /// Insert or overwrite
    pub fn set(&mut self, key: i32, value: V) -> Result<()> {
        self.table.set(key, value)
    }

    /// Value for `key`, or [`Error::NotFound`]
    pub fn get(&self, key: i32) -> Result<V> {
        self.table
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("Key {} not found", key)))
    }

    #[inline]
    pub fn try_get(&self, key: i32) -> Option<V> {
        self.table.get(key)
    }

    #[inline]
    pub fn contains_key(&self, key: i32) -> bool {
        self.table.find_index(key).is_some()
    }

    /// Remove `key`, leaving a tombstone
    pub fn try_remove(&mut self, key: i32) -> Option<V> {
        self.table.remove(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Slot count of the current table
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn config(&self) -> &MapConfig {
        self.table.config()
    }

    pub fn iter(&self) -> Iter<'_, V> {
        self.table.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.table.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = V> + '_ {
        self.table.iter().map(|(_, value)| value)
    }

    /// Drop tombstones and shrink while the table is sparse
    pub fn compact(&mut self) -> Result<()> {
        self.table.compact()
    }

    /// Double the table, unless it is already at maximum size
    pub fn resize(&mut self) -> Result<()> {
        self.table.resize()
    }

    /// Grow so `expected` entries fit without further rebuilds
    pub fn ensure_capacity(&mut self, expected: usize) -> Result<()> {
        self.table.ensure_capacity(expected)
    }

    pub fn clear(&mut self) {
        self.table.clear()
    }

    /// Release the table memory. The map stays usable and reallocates on
    /// the next `set`.
    pub fn dispose(&mut self) {
        self.table.dispose()
    }

    pub fn stats(&self) -> MapStats {
        self.table.stats()
    }

    /// Panic if the table's counters disagree with its slots (debug builds only)
    pub fn debug_validate(&self) {
        self.table.debug_validate()
    }
}

impl<'a, V: Copy> IntoIterator for &'a UnmanagedMap<V> {
    type Item = (i32, V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: Copy> fmt::Debug for UnmanagedMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("UnmanagedMap")
            .field("count", &stats.count)
            .field("capacity", &stats.capacity)
            .field("tombstones", &stats.tombstones)
            .finish()
    }
}
