//! Tuning knobs for the storage primitives
//!
//! Every structure can be built from defaults or from a config value. An
//! [`EngineConfig`] bundles all of them and can be read from TOML:
//!
//! ```toml
//! [map]
//! initial_power = 10
//! probing = "quadratic"
//!
//! [sorted_store]
//! initial_capacity = 1024
//!
//! [allocator]
//! capacity = 1048576
//! ```
//!
//! Missing tables and fields fall back to their defaults.

use crate::error::{Error, Result};
use crate::storage::map::Probing;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest power of two a table may be sized to
pub const MAX_TABLE_POWER: u32 = 30;

/// Open-addressing map configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial capacity as a power of two
    pub initial_power: u32,
    /// Compaction never shrinks below `2^min_power` slots
    pub min_power: u32,
    /// Growth silently stops at `2^max_power` slots
    pub max_power: u32,
    /// Used-slot ratio at which `set` compacts and then grows
    pub grow_load_factor: f32,
    /// Occupied ratio under which compaction halves the table
    pub shrink_load_factor: f32,
    /// Probe sequence used on collision
    pub probing: Probing,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_power: 8,
            min_power: 4,  // 16 slots
            max_power: 20, // ~1M slots
            grow_load_factor: 0.7,
            shrink_load_factor: 0.25,
            probing: Probing::Linear,
        }
    }
}

impl MapConfig {
    /// Profile for the integer-value map, which may grow to `2^30` slots
    pub fn int_map() -> Self {
        Self {
            max_power: MAX_TABLE_POWER,
            ..Self::default()
        }
    }

    /// Profile for the duplicate-forbidding lookup map
    pub fn lookup() -> Self {
        Self {
            max_power: MAX_TABLE_POWER,
            probing: Probing::Quadratic,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_power == 0 || self.min_power > self.max_power {
            return Err(Error::Config(format!(
                "min_power must be in 1..=max_power, got min_power={} max_power={}",
                self.min_power, self.max_power
            )));
        }
        if self.max_power > MAX_TABLE_POWER {
            return Err(Error::Config(format!(
                "max_power {} exceeds limit {}",
                self.max_power, MAX_TABLE_POWER
            )));
        }
        if self.initial_power == 0 || self.initial_power > self.max_power {
            return Err(Error::Config(format!(
                "initial_power must be in 1..=max_power, got {}",
                self.initial_power
            )));
        }
        let ordered = 0.0 < self.shrink_load_factor
            && self.shrink_load_factor < self.grow_load_factor
            && self.grow_load_factor < 1.0;
        if !ordered {
            return Err(Error::Config(format!(
                "load factors must satisfy 0 < shrink < grow < 1, got shrink={} grow={}",
                self.shrink_load_factor, self.grow_load_factor
            )));
        }
        Ok(())
    }
}

/// Sorted key/value store configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Initial slot capacity of each parallel buffer. Zero is promoted to 4.
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
        }
    }
}

/// Block allocator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Size of the managed region in bytes
    pub capacity: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            capacity: 64 * 1024, // 64KB
        }
    }
}

impl AllocatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Config(
                "allocator capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for every primitive in the crate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub map: MapConfig,
    pub int_map: MapConfig,
    pub sorted_store: StoreConfig,
    pub allocator: AllocatorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            int_map: MapConfig::int_map(),
            sorted_store: StoreConfig::default(),
            allocator: AllocatorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        self.map.validate()?;
        self.int_map.validate()?;
        self.allocator.validate()?;
        Ok(())
    }
}
