//! Opaque allocation handles

use std::fmt;

/// Stable reference to a block inside a [`MemoryManager`](super::MemoryManager)
///
/// A handle owns nothing. It names an allocation by id and resolves to an
/// address only through the manager that issued it, so it stays valid when
/// compaction moves the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryHandle {
    pub(crate) id: i32,
    pub(crate) owner: u64,
}

impl MemoryHandle {
    pub(crate) fn new(id: i32, owner: u64) -> Self {
        Self { id, owner }
    }

    /// Allocation id, unique within the issuing manager
    pub fn id(&self) -> i32 {
        self.id
    }
}

impl fmt::Display for MemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle(id={}, manager={})", self.id, self.owner)
    }
}
