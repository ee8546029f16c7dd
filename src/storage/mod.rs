//! Storage layer
//!
//! # Architecture
//!
//! Four independent primitives, each owning its own memory:
//!
//! ```text
//! RawBlock<T>                 one std::alloc allocation, released on drop
//!   ├─→ RawBuffer<T>          growable flat array (IntBuffer = RawBuffer<i32>)
//!   │     └─→ SortedKvStore   keys / values / occupied, sorted by key
//!   ├─→ OpenTable<V>          open addressing with tombstones
//!   │     └─→ UnmanagedMap, IntMap, LookupMap
//!   └─→ MemoryManager         first-fit region, handles resolved by id
//! ```
//!
//! None of them are thread-safe; wrap them in a lock to share.

pub(crate) mod raw;

pub mod alloc;
pub mod buffer;
pub mod map;
pub mod sorted;

mod scenario_tests;

pub use alloc::{AllocationRecord, AllocatorStats, MemoryHandle, MemoryManager};
pub use buffer::{IntBuffer, RawBuffer};
pub use map::{IntMap, LookupMap, MapStats, Probing, SlotState, UnmanagedMap};
pub use sorted::SortedKvStore;
