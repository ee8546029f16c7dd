//! Slot layout for open-addressing tables

use std::mem::MaybeUninit;

/// Lifecycle of one table slot
///
/// ```text
/// Empty ──set──→ Occupied ──remove──→ Tombstone ──set──→ Occupied
///                                          └──rebuild──→ (dropped)
/// ```
///
/// `Empty` is zero so a zeroed allocation is a table of empty slots.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty = 0,
    Occupied = 1,
    Tombstone = 2,
}

/// One slot of a table
///
/// The value is only initialized once the slot has been occupied, so it is
/// read exclusively through [`Entry::value`], which checks the state.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct Entry<V: Copy> {
    pub(crate) key: i32,
    pub(crate) state: SlotState,
    value: MaybeUninit<V>,
}

impl<V: Copy> Entry<V> {
    #[inline(always)]
    pub(crate) fn is_occupied(&self) -> bool {
        self.state == SlotState::Occupied
    }

    #[inline(always)]
    pub(crate) fn value(&self) -> Option<V> {
        if self.is_occupied() {
            // SAFETY: occupy() writes the value before marking the slot occupied.
            Some(unsafe { self.value.assume_init() })
        } else {
            None
        }
    }

    #[inline(always)]
    pub(crate) fn occupy(&mut self, key: i32, value: V) {
        self.key = key;
        self.value = MaybeUninit::new(value);
        self.state = SlotState::Occupied;
    }

    #[inline(always)]
    pub(crate) fn overwrite(&mut self, value: V) {
        debug_assert!(self.is_occupied());
        self.value = MaybeUninit::new(value);
    }

    /// Mark the slot deleted. Key and value bytes are left in place.
    #[inline(always)]
    pub(crate) fn bury(&mut self) {
        self.state = SlotState::Tombstone;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_entry() -> Entry<u64> {
        Entry {
            key: 0,
            state: SlotState::Empty,
            value: MaybeUninit::uninit(),
        }
    }

    #[test]
    fn test_slot_lifecycle() {
        let mut entry = empty_entry();
        assert!(entry.value().is_none());

        entry.occupy(7, 70);
        assert!(entry.is_occupied());
        assert_eq!(entry.value(), Some(70));

        entry.overwrite(71);
        assert_eq!(entry.value(), Some(71));

        entry.bury();
        assert_eq!(entry.state, SlotState::Tombstone);
        assert_eq!(entry.key, 7);
        assert!(entry.value().is_none());

        entry.occupy(8, 80);
        assert_eq!(entry.value(), Some(80));
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(SlotState::Empty as u8, 0);
    }
}
