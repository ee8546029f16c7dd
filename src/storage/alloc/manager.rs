//! First-fit block allocator over one contiguous region

use super::handle::MemoryHandle;
use crate::config::{AllocatorConfig, MapConfig};
use crate::error::{Error, Result};
use crate::storage::map::UnmanagedMap;
use crate::storage::raw::RawBlock;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Tags handles with the manager that issued them
static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Placement of one live allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRecord {
    pub offset: usize,
    pub size: usize,
    pub handle_id: i32,
}

impl AllocationRecord {
    #[inline]
    fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Allocator usage counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    pub capacity: usize,
    pub used: usize,
    pub free: usize,
    pub allocations: usize,
    pub largest_free_block: usize,
}

/// Hands out [`MemoryHandle`]s to byte ranges of a fixed-size region
///
/// Records are kept sorted by offset and allocation is first-fit over the
/// gaps between them. [`compact`](Self::compact) slides every live block to
/// the front of a fresh region; handles keep resolving because they name
/// records by id.
///
/// ```text
/// before: [ A ][----][ B ][--][ C ][------]
/// after:  [ A ][ B ][ C ][----------------]
/// ```
pub struct MemoryManager {
    id: u64,
    region: RawBlock<u8>,
    records: Vec<AllocationRecord>,
    handles: UnmanagedMap<AllocationRecord>,
    next_handle: i32,
}

impl MemoryManager {
    /// Create a manager over a zeroed region of `capacity` bytes
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_handle_config(capacity, MapConfig::int_map())
    }

    pub(crate) fn with_handle_config(capacity: usize, handle_config: MapConfig) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument(
                "Allocator capacity must be greater than 0".to_string(),
            ));
        }

        let id = NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed);
        let region = RawBlock::allocate_zeroed(capacity)?;
        debug!(manager = id, capacity, "Created memory region");

        Ok(Self {
            id,
            region,
            records: Vec::new(),
            handles: UnmanagedMap::with_config(handle_config)?,
            next_handle: 1,
        })
    }

    pub fn from_config(config: &AllocatorConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.capacity)
    }

    /// Total region size in bytes
    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Reserve `size` bytes at the first gap that fits
    pub fn allocate(&mut self, size: usize) -> Result<MemoryHandle> {
        if size == 0 {
            return Err(Error::InvalidArgument(
                "Allocation size must be greater than 0".to_string(),
            ));
        }

        let (offset, position) = self.find_gap(size).ok_or_else(|| {
            Error::OutOfMemory(format!(
                "No free block of {} bytes in region of {} bytes",
                size,
                self.capacity()
            ))
        })?;

        let handle_id = self.next_handle;
        let next_handle = handle_id
            .checked_add(1)
            .ok_or_else(|| Error::OutOfMemory("Handle ids exhausted".to_string()))?;

        let record = AllocationRecord {
            offset,
            size,
            handle_id,
        };
        self.handles.set(handle_id, record).map_err(|e| match e {
            Error::InvariantViolation(_) => Error::OutOfMemory(format!(
                "Handle table full at {} allocations",
                self.records.len()
            )),
            other => other,
        })?;
        self.records.insert(position, record);
        self.next_handle = next_handle;

        trace!("Allocated {} bytes at offset {} (handle {})", size, offset, handle_id);
        Ok(MemoryHandle::new(handle_id, self.id))
    }

    /// First gap of at least `size` bytes, with the record index to insert at
    fn find_gap(&self, size: usize) -> Option<(usize, usize)> {
        let mut cursor = 0;
        for (position, record) in self.records.iter().enumerate() {
            if record.offset - cursor >= size {
                return Some((cursor, position));
            }
            cursor = record.end();
        }

        if self.capacity() - cursor >= size {
            Some((cursor, self.records.len()))
        } else {
            None
        }
    }

    fn record(&self, handle: MemoryHandle) -> Result<AllocationRecord> {
        if handle.owner != self.id {
            return Err(Error::InvalidHandle(format!(
                "{} was issued by another manager",
                handle
            )));
        }
        self.handles
            .try_get(handle.id)
            .ok_or_else(|| Error::InvalidHandle(format!("{} is not allocated", handle)))
    }

    /// Current address of the block behind `handle`.
    ///
    /// The address moves on [`compact`](Self::compact); resolve again after.
    pub fn resolve(&self, handle: MemoryHandle) -> Result<NonNull<u8>> {
        let record = self.record(handle)?;
        let base = self.region.as_non_null();
        // SAFETY: offset + size <= capacity for every live record, so the
        //         result stays inside the non-null region.
        Ok(unsafe { NonNull::new_unchecked(base.as_ptr().add(record.offset)) })
    }

    /// Size in bytes of the block behind `handle`
    pub fn size_of(&self, handle: MemoryHandle) -> Result<usize> {
        Ok(self.record(handle)?.size)
    }

    pub fn bytes(&self, handle: MemoryHandle) -> Result<&[u8]> {
        let record = self.record(handle)?;
        // SAFETY: the region is allocated zeroed, so every byte is initialized.
        let region = unsafe { self.region.slice(self.region.capacity()) };
        Ok(&region[record.offset..record.end()])
    }

    pub fn bytes_mut(&mut self, handle: MemoryHandle) -> Result<&mut [u8]> {
        let record = self.record(handle)?;
        let capacity = self.region.capacity();
        // SAFETY: see bytes().
        let region = unsafe { self.region.slice_mut(capacity) };
        Ok(&mut region[record.offset..record.end()])
    }

    /// Release the block behind `handle`. The bytes are left as they are.
    ///
    /// Returns false for a handle that is already freed or foreign.
    pub fn free(&mut self, handle: MemoryHandle) -> bool {
        if handle.owner != self.id {
            return false;
        }
        let Some(record) = self.handles.try_remove(handle.id) else {
            return false;
        };

        if let Ok(position) = self
            .records
            .binary_search_by_key(&record.offset, |r| r.offset)
        {
            self.records.remove(position);
        }

        trace!("Freed {} bytes at offset {} (handle {})", record.size, record.offset, handle.id);
        true
    }

    /// Move every live block to the front of a fresh region.
    ///
    /// Handles stay valid; addresses obtained from `resolve` do not.
    pub fn compact(&mut self) -> Result<()> {
        let capacity = self.capacity();
        if capacity == 0 {
            return Ok(());
        }

        let fresh = RawBlock::<u8>::allocate_zeroed(capacity)?;
        let mut cursor = 0;
        for record in self.records.iter_mut() {
            // SAFETY: both ranges lie inside their own region and the two
            //         regions are distinct allocations.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.region.as_ptr().add(record.offset),
                    fresh.as_ptr().add(cursor),
                    record.size,
                );
            }
            record.offset = cursor;
            cursor += record.size;
            self.handles.set(record.handle_id, *record)?;
        }

        self.region = fresh;
        debug!(
            manager = self.id,
            allocations = self.records.len(),
            used = cursor,
            free = capacity - cursor,
            "Compacted memory region"
        );
        Ok(())
    }

    /// Live records in offset order
    pub fn records(&self) -> &[AllocationRecord] {
        &self.records
    }

    pub fn stats(&self) -> AllocatorStats {
        let capacity = self.capacity();
        let mut used = 0;
        let mut largest_free_block = 0;
        let mut cursor = 0;
        for record in &self.records {
            used += record.size;
            largest_free_block = largest_free_block.max(record.offset - cursor);
            cursor = record.end();
        }
        largest_free_block = largest_free_block.max(capacity - cursor);

        AllocatorStats {
            capacity,
            used,
            free: capacity - used,
            allocations: self.records.len(),
            largest_free_block,
        }
    }

    /// Release the region. Every handle becomes invalid and every later
    /// allocation fails.
    pub fn dispose(&mut self) {
        if self.region.capacity() == 0 {
            return;
        }
        self.region.release();
        self.records.clear();
        self.handles.dispose();
        debug!(manager = self.id, "Disposed memory region");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit_and_compact() -> Result<()> {
        let mut mm = MemoryManager::new(100)?;
        let first = mm.allocate(10)?;
        let second = mm.allocate(20)?;
        assert_eq!(mm.records()[0].offset, 0);
        assert_eq!(mm.records()[1].offset, 10);

        assert!(mm.free(first));
        let third = mm.allocate(5)?;
        assert_eq!(mm.records()[0].offset, 0);
        assert_eq!(mm.records()[0].handle_id, third.id());

        mm.bytes_mut(second)?.fill(0xAB);
        mm.bytes_mut(third)?.fill(0xCD);
        mm.compact()?;

        let offsets: Vec<(usize, usize)> = mm.records().iter().map(|r| (r.offset, r.size)).collect();
        assert_eq!(offsets, vec![(0, 5), (5, 20)]);
        assert!(mm.bytes(second)?.iter().all(|&b| b == 0xAB));
        assert!(mm.bytes(third)?.iter().all(|&b| b == 0xCD));

        let base = mm.resolve(third)?;
        let moved = mm.resolve(second)?;
        assert_eq!(moved.as_ptr() as usize - base.as_ptr() as usize, 5);
        Ok(())
    }

    #[test]
    fn test_out_of_memory() -> Result<()> {
        let mut mm = MemoryManager::new(32)?;
        mm.allocate(30)?;
        assert!(matches!(mm.allocate(3), Err(Error::OutOfMemory(_))));
        mm.allocate(2)?;
        assert_eq!(mm.stats().free, 0);
        Ok(())
    }

    #[test]
    fn test_fragmentation_needs_compaction() -> Result<()> {
        let mut mm = MemoryManager::new(30)?;
        let a = mm.allocate(10)?;
        let _b = mm.allocate(10)?;
        let c = mm.allocate(10)?;
        mm.free(a);
        mm.free(c);

        // 20 bytes free but split in two gaps.
        assert_eq!(mm.stats().largest_free_block, 10);
        assert!(matches!(mm.allocate(15), Err(Error::OutOfMemory(_))));

        mm.compact()?;
        assert_eq!(mm.stats().largest_free_block, 20);
        mm.allocate(15)?;
        Ok(())
    }

    #[test]
    fn test_handle_table_exhaustion_is_out_of_memory() -> Result<()> {
        let capped = MapConfig {
            initial_power: 4,
            min_power: 4,
            max_power: 4,
            ..MapConfig::default()
        };
        let mut mm = MemoryManager::with_handle_config(100, capped)?;
        for _ in 0..16 {
            mm.allocate(1)?;
        }

        assert!(matches!(mm.allocate(1), Err(Error::OutOfMemory(_))));
        let stats = mm.stats();
        assert_eq!(stats.allocations, 16);
        assert_eq!(stats.free, 84);
        Ok(())
    }

    #[test]
    fn test_handle_table_grows_with_int_map_limit() -> Result<()> {
        let mut mm = MemoryManager::new(4096)?;
        assert_eq!(mm.handles.config().max_power, MapConfig::int_map().max_power);
        for _ in 0..2000 {
            mm.allocate(1)?;
        }
        assert_eq!(mm.stats().allocations, 2000);
        Ok(())
    }

    #[test]
    fn test_zero_size_rejected() -> Result<()> {
        let mut mm = MemoryManager::new(16)?;
        assert!(matches!(mm.allocate(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(MemoryManager::new(0), Err(Error::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn test_free_is_idempotent() -> Result<()> {
        let mut mm = MemoryManager::new(64)?;
        let handle = mm.allocate(8)?;
        assert!(mm.free(handle));
        assert!(!mm.free(handle));
        assert!(matches!(mm.resolve(handle), Err(Error::InvalidHandle(_))));
        assert!(matches!(mm.size_of(handle), Err(Error::InvalidHandle(_))));
        Ok(())
    }

    #[test]
    fn test_foreign_handle_rejected() -> Result<()> {
        let mut left = MemoryManager::new(64)?;
        let mut right = MemoryManager::new(64)?;
        let handle = left.allocate(8)?;
        right.allocate(8)?;

        // Same id, different manager.
        assert!(matches!(right.resolve(handle), Err(Error::InvalidHandle(_))));
        assert!(!right.free(handle));
        assert!(left.resolve(handle).is_ok());
        Ok(())
    }

    #[test]
    fn test_handle_ids_are_not_reused() -> Result<()> {
        let mut mm = MemoryManager::new(64)?;
        let first = mm.allocate(8)?;
        mm.free(first);
        let second = mm.allocate(8)?;
        assert_ne!(first.id(), second.id());
        assert!(mm.resolve(first).is_err());
        Ok(())
    }

    #[test]
    fn test_stats() -> Result<()> {
        let mut mm = MemoryManager::from_config(&AllocatorConfig { capacity: 100 })?;
        let a = mm.allocate(10)?;
        mm.allocate(20)?;
        mm.free(a);

        let stats = mm.stats();
        assert_eq!(stats.capacity, 100);
        assert_eq!(stats.used, 20);
        assert_eq!(stats.free, 80);
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.largest_free_block, 70);
        Ok(())
    }

    #[test]
    fn test_dispose() -> Result<()> {
        let mut mm = MemoryManager::new(64)?;
        let handle = mm.allocate(8)?;
        mm.dispose();
        mm.dispose();

        assert_eq!(mm.capacity(), 0);
        assert!(mm.resolve(handle).is_err());
        assert!(matches!(mm.allocate(1), Err(Error::OutOfMemory(_))));
        mm.compact()?;
        Ok(())
    }
}
