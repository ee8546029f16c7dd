//! Block allocator with handle indirection

mod handle;
mod manager;

pub use handle::MemoryHandle;
pub use manager::{AllocationRecord, AllocatorStats, MemoryManager};
