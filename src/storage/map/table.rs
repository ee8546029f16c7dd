//! Open-addressing table engine
//!
//! One engine serves every map flavour in this crate. The table is a
//! power-of-two array of [`Entry`] slots in a single zeroed allocation;
//! deletes leave tombstones that only a rebuild reclaims.
//!
//! # Maintenance
//!
//! ```text
//! set(key, value)
//!   used = occupied + tombstones
//!   used >= capacity * grow?
//!     ├─→ compact()   drop tombstones, halve while sparse
//!     └─→ still over? resize()   double, up to 2^max_power
//!   probe → overwrite | first tombstone | empty slot
//!   no slot at all → InvariantViolation
//! ```
//!
//! Rebuilds allocate a fresh table, re-place every occupied entry and free
//! the old one.

use super::probe::ProbeSeq;
use super::slot::{Entry, SlotState};
use crate::config::MapConfig;
use crate::error::{Error, Result};
use crate::storage::raw::RawBlock;
use tracing::{debug, error};

/// Outcome of placing a key into a slot array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Inserted,
    Reused,
    Updated,
    Full,
}

/// Counters describing a table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapStats {
    pub capacity: usize,
    pub count: usize,
    pub tombstones: usize,
    pub load_factor: f64,
}

pub(crate) struct OpenTable<V: Copy> {
    entries: RawBlock<Entry<V>>,
    count: usize,
    tombstones: usize,
    power: u32,
    config: MapConfig,
}

impl<V: Copy> OpenTable<V> {
    /// Allocate an empty table of `2^power` slots
    pub(crate) fn new(power: u32, config: MapConfig) -> Result<Self> {
        if power > crate::config::MAX_TABLE_POWER {
            return Err(Error::InvalidArgument(format!(
                "Table power {} exceeds limit {}",
                power,
                crate::config::MAX_TABLE_POWER
            )));
        }

        Ok(Self {
            entries: RawBlock::allocate_zeroed(1usize << power)?,
            count: 0,
            tombstones: 0,
            power,
            config,
        })
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn config(&self) -> &MapConfig {
        &self.config
    }

    #[inline(always)]
    fn slots(&self) -> &[Entry<V>] {
        // SAFETY: the block is allocated zeroed and every bit pattern written
        //         since is a valid Entry (zero is SlotState::Empty).
        unsafe { self.entries.slice(self.entries.capacity()) }
    }

    #[inline(always)]
    fn slots_mut(&mut self) -> &mut [Entry<V>] {
        let capacity = self.entries.capacity();
        // SAFETY: see slots().
        unsafe { self.entries.slice_mut(capacity) }
    }

    #[inline(always)]
    fn probe(&self, key: i32) -> ProbeSeq {
        self.config.probing.sequence(key, self.capacity())
    }

    /// Slot index holding `key`, if present.
    ///
    /// Tombstones are skipped; the first empty slot ends the search.
    pub(crate) fn find_index(&self, key: i32) -> Option<usize> {
        if self.capacity() == 0 {
            return None;
        }

        let slots = self.slots();
        for idx in self.probe(key) {
            let slot = &slots[idx];
            match slot.state {
                SlotState::Empty => return None,
                SlotState::Occupied if slot.key == key => return Some(idx),
                _ => {}
            }
        }
        None
    }

    #[inline]
    pub(crate) fn get(&self, key: i32) -> Option<V> {
        self.find_index(key).and_then(|idx| self.slots()[idx].value())
    }

    /// Insert or overwrite, running maintenance first when the table is loaded
    pub(crate) fn set(&mut self, key: i32, value: V) -> Result<()> {
        if self.capacity() == 0 {
            self.rebuild(self.config.min_power)?;
        }

        if self.is_over_threshold() {
            self.compact()?;
            if self.is_over_threshold() {
                self.resize()?;
            }
        }

        let probe = self.probe(key);
        match place(self.slots_mut(), probe, key, value) {
            Placement::Inserted => self.count += 1,
            Placement::Reused => {
                self.count += 1;
                self.tombstones -= 1;
            }
            Placement::Updated => {}
            Placement::Full => {
                error!(
                    capacity = self.capacity(),
                    count = self.count,
                    "Map full after compact and resize"
                );
                return Err(Error::InvariantViolation(format!(
                    "map full after compact and resize (capacity {}, count {})",
                    self.capacity(),
                    self.count
                )));
            }
        }
        Ok(())
    }

    /// Insert a key that must not already be present
    pub(crate) fn insert_unique(&mut self, key: i32, value: V) -> Result<()> {
        if self.find_index(key).is_some() {
            return Err(Error::DuplicateKey(format!("Duplicate key detected: {}", key)));
        }
        self.set(key, value)
    }

    /// Tombstone `key` and hand back its value
    pub(crate) fn remove(&mut self, key: i32) -> Option<V> {
        let idx = self.find_index(key)?;
        let slot = &mut self.slots_mut()[idx];
        let value = slot.value();
        slot.bury();
        self.count -= 1;
        self.tombstones += 1;
        value
    }

    /// Double the capacity; stops silently at `2^max_power`
    pub(crate) fn resize(&mut self) -> Result<()> {
        if self.power >= self.config.max_power {
            debug!(
                capacity = self.capacity(),
                max_power = self.config.max_power,
                "Map at maximum capacity, growth stopped"
            );
            return Ok(());
        }
        self.rebuild(self.power + 1)
    }

    /// Drop tombstones and shrink while the table is sparse
    pub(crate) fn compact(&mut self) -> Result<()> {
        if self.capacity() == 0 {
            return Ok(());
        }

        let mut target = self.power;
        while target > self.config.min_power
            && (self.count as f64) < (1usize << target) as f64 * self.config.shrink_load_factor as f64
        {
            target -= 1;
        }

        if target == self.power && self.tombstones == 0 {
            return Ok(());
        }
        self.rebuild(target)
    }

    /// Grow ahead of time so `expected` entries fit under the load threshold
    pub(crate) fn ensure_capacity(&mut self, expected: usize) -> Result<()> {
        let mut target = self.power;
        while (expected as f64) > (1usize << target) as f64 * self.config.grow_load_factor as f64
            && target < self.config.max_power
        {
            target += 1;
        }

        if target > self.power || self.capacity() == 0 {
            self.rebuild(target)?;
        }
        Ok(())
    }

    /// Reset every slot to empty, keeping the allocation
    pub(crate) fn clear(&mut self) {
        self.entries.zero();
        self.count = 0;
        self.tombstones = 0;
    }

    /// Free the table. A later `set` reallocates at the minimum capacity.
    pub(crate) fn dispose(&mut self) {
        self.entries.release();
        self.count = 0;
        self.tombstones = 0;
    }

    pub(crate) fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots().iter(),
            remaining: self.count,
        }
    }

    pub(crate) fn stats(&self) -> MapStats {
        let capacity = self.capacity();
        MapStats {
            capacity,
            count: self.count,
            tombstones: self.tombstones,
            load_factor: if capacity == 0 {
                0.0
            } else {
                self.count as f64 / capacity as f64
            },
        }
    }

    /// Check slot states against the counters. No-op in release builds.
    pub(crate) fn debug_validate(&self) {
        if !cfg!(debug_assertions) {
            return;
        }

        let mut seen = std::collections::HashSet::with_capacity(self.count);
        let mut occupied = 0;
        let mut buried = 0;
        for slot in self.slots() {
            match slot.state {
                SlotState::Occupied => {
                    assert!(seen.insert(slot.key), "Duplicate key {} found", slot.key);
                    occupied += 1;
                }
                SlotState::Tombstone => buried += 1,
                SlotState::Empty => {}
            }
        }
        assert_eq!(occupied, self.count, "occupied slots disagree with count");
        assert_eq!(buried, self.tombstones, "tombstone slots disagree with counter");
    }

    #[inline(always)]
    fn is_over_threshold(&self) -> bool {
        let used = (self.count + self.tombstones) as f64;
        used >= self.capacity() as f64 * self.config.grow_load_factor as f64
    }

    /// Move every occupied entry into a fresh table of `2^power` slots
    fn rebuild(&mut self, power: u32) -> Result<()> {
        let mut fresh = RawBlock::<Entry<V>>::allocate_zeroed(1usize << power)?;
        let mut moved = 0;
        {
            let capacity = fresh.capacity();
            // SAFETY: zeroed memory is a table of empty slots.
            let target = unsafe { fresh.slice_mut(capacity) };
            for slot in self.slots() {
                let Some(value) = slot.value() else {
                    continue;
                };
                let probe = self.config.probing.sequence(slot.key, capacity);
                if place(target, probe, slot.key, value) != Placement::Inserted {
                    error!(key = slot.key, capacity, "Rebuild could not place entry");
                    return Err(Error::InvariantViolation(format!(
                        "rebuild to {} slots could not place key {}",
                        capacity, slot.key
                    )));
                }
                moved += 1;
            }
        }

        debug!(
            from = self.capacity(),
            to = fresh.capacity(),
            entries = moved,
            tombstones_dropped = self.tombstones,
            "Rebuilt map table"
        );

        self.entries = fresh;
        self.power = power;
        self.count = moved;
        self.tombstones = 0;
        Ok(())
    }
}

/// Place `key` along `probe`, preferring the first tombstone seen before an
/// empty slot. Only an occupied slot can match the key.
fn place<V: Copy>(slots: &mut [Entry<V>], probe: ProbeSeq, key: i32, value: V) -> Placement {
    let mut first_tombstone: Option<usize> = None;

    for idx in probe {
        let slot = &mut slots[idx];
        match slot.state {
            SlotState::Empty => {
                return match first_tombstone {
                    Some(tomb) => {
                        slots[tomb].occupy(key, value);
                        Placement::Reused
                    }
                    None => {
                        slot.occupy(key, value);
                        Placement::Inserted
                    }
                };
            }
            SlotState::Tombstone => {
                if first_tombstone.is_none() {
                    first_tombstone = Some(idx);
                }
            }
            SlotState::Occupied => {
                if slot.key == key {
                    slot.overwrite(value);
                    return Placement::Updated;
                }
            }
        }
    }

    // Every slot visited without an empty one: the key is absent.
    match first_tombstone {
        Some(tomb) => {
            slots[tomb].occupy(key, value);
            Placement::Reused
        }
        None => Placement::Full,
    }
}

/// Occupied entries in table order
#[derive(Clone)]
pub struct Iter<'a, V: Copy> {
    slots: std::slice::Iter<'a, Entry<V>>,
    remaining: usize,
}

impl<'a, V: Copy> Iterator for Iter<'a, V> {
    type Item = (i32, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for slot in self.slots.by_ref() {
            if let Some(value) = slot.value() {
                self.remaining -= 1;
                return Some((slot.key, value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V: Copy> ExactSizeIterator for Iter<'_, V> {}
