// PhotonMem - manually managed storage primitives
// Flat buffers, open-addressing maps, a sorted store and a block allocator

#![warn(rust_2018_idioms)]

pub mod config;
pub mod storage;

// Re-exports for convenience
pub use config::{AllocatorConfig, EngineConfig, MapConfig, StoreConfig};
pub use error::{Error, Result};
pub use storage::{
    AllocationRecord, AllocatorStats, IntBuffer, IntMap, LookupMap, MapStats, MemoryHandle,
    MemoryManager, Probing, RawBuffer, SortedKvStore, UnmanagedMap,
};

pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Not found: {0}")]
        NotFound(String),

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        #[error("Out of memory: {0}")]
        OutOfMemory(String),

        #[error("Duplicate key: {0}")]
        DuplicateKey(String),

        #[error("Invalid handle: {0}")]
        InvalidHandle(String),

        #[error("Configuration error: {0}")]
        Config(String),

        /// Internal defect; never a recoverable condition
        #[error("Invariant violation: {0}")]
        InvariantViolation(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
