//! Probe sequences
//!
//! Both strategies start at `key & (capacity - 1)` and yield exactly
//! `capacity` positions. Linear steps by one; quadratic steps by triangular
//! numbers (`+1, +3, +6, ...`), which on a power-of-two table also visits
//! every slot exactly once.

use serde::{Deserialize, Serialize};

/// Collision strategy for an open-addressing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Probing {
    #[default]
    Linear,
    Quadratic,
}

impl Probing {
    /// Probe sequence for `key` in a table of `capacity` slots.
    ///
    /// `capacity` must be a non-zero power of two.
    #[inline(always)]
    pub(crate) fn sequence(self, key: i32, capacity: usize) -> ProbeSeq {
        debug_assert!(capacity.is_power_of_two());
        let mask = capacity - 1;
        ProbeSeq {
            pos: (key as u32 as usize) & mask,
            stride: 0,
            mask,
            remaining: capacity,
            probing: self,
        }
    }
}

/// Iterator over the slot indices visited for one key
#[derive(Debug, Clone)]
pub(crate) struct ProbeSeq {
    pos: usize,
    stride: usize,
    mask: usize,
    remaining: usize,
    probing: Probing,
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let current = self.pos;
        self.stride += 1;
        self.pos = match self.probing {
            Probing::Linear => (self.pos + 1) & self.mask,
            Probing::Quadratic => (self.pos + self.stride) & self.mask,
        };
        Some(current)
    }
}
