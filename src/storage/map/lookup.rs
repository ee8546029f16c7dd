//! Immutable lookup tables built once from a list of pairs

use super::table::{Iter, OpenTable};
use crate::config::{MapConfig, MAX_TABLE_POWER};
use crate::error::{Error, Result};

const MIN_LOOKUP_POWER: u32 = 4;

/// A frozen map that forbids duplicate keys at construction
///
/// The table is sized to at least twice the pair count so probe chains stay
/// short, and uses quadratic probing.
pub struct LookupMap<V: Copy> {
    table: OpenTable<V>,
}

impl<V: Copy> LookupMap<V> {
    /// Build from `(key, value)` pairs; a repeated key is [`Error::DuplicateKey`]
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i32, V)>,
    {
        let pairs: Vec<(i32, V)> = pairs.into_iter().collect();
        let power = Self::power_for(pairs.len())?;

        let config = MapConfig {
            initial_power: power,
            ..MapConfig::lookup()
        };
        let mut table = OpenTable::new(power, config)?;
        for (key, value) in pairs {
            table.insert_unique(key, value)?;
        }

        Ok(Self { table })
    }

    fn power_for(len: usize) -> Result<u32> {
        let slots = len
            .checked_mul(2)
            .and_then(usize::checked_next_power_of_two)
            .ok_or_else(|| Error::InvalidArgument(format!("Too many pairs: {}", len)))?;
        let power = slots.trailing_zeros().max(MIN_LOOKUP_POWER);
        if power > MAX_TABLE_POWER {
            return Err(Error::InvalidArgument(format!(
                "{} pairs need 2^{} slots, limit is 2^{}",
                len, power, MAX_TABLE_POWER
            )));
        }
        Ok(power)
    }

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

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn iter(&self) -> Iter<'_, V> {
        self.table.iter()
    }
}
