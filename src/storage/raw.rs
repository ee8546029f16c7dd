//! Raw memory blocks
//!
//! Every structure in this crate owns its memory through a [`RawBlock`]:
//! one heap allocation of `capacity` elements obtained straight from
//! `std::alloc`, with no initialization tracking of its own. The owner
//! decides which prefix of the block holds live values.
//!
//! ```text
//! RawBlock<T>
//!   ptr ──→ [ T | T | T | ? | ? | ? ]
//!            └─ live ──┘ └─ spare ─┘
//!            0        len       capacity
//! ```
//!
//! Release is idempotent: after [`RawBlock::release`] the pointer is dangling
//! and the capacity is zero, so a second release (or the one in `Drop`) is a
//! no-op.

use crate::error::{Error, Result};
use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// One manually allocated block of `capacity` elements of `T`
pub(crate) struct RawBlock<T> {
    ptr: NonNull<T>,
    capacity: usize,
    _marker: PhantomData<T>,
}

// SAFETY: RawBlock uniquely owns its allocation, like Box<[T]>.
unsafe impl<T: Send> Send for RawBlock<T> {}
unsafe impl<T: Sync> Sync for RawBlock<T> {}

impl<T> RawBlock<T> {
    /// An empty block that owns no memory
    pub(crate) const fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            _marker: PhantomData,
        }
    }

    /// Allocate a block whose contents are uninitialized
    pub(crate) fn allocate(capacity: usize) -> Result<Self> {
        Self::allocate_with(capacity, false)
    }

    /// Allocate a block whose bytes are all zero
    pub(crate) fn allocate_zeroed(capacity: usize) -> Result<Self> {
        Self::allocate_with(capacity, true)
    }

    fn allocate_with(capacity: usize, zeroed: bool) -> Result<Self> {
        let layout = Self::layout(capacity)?;
        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                capacity,
                _marker: PhantomData,
            });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe {
            if zeroed {
                alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc(layout)
            }
        };

        let ptr = NonNull::new(raw as *mut T).ok_or_else(|| {
            Error::OutOfMemory(format!(
                "Failed to allocate {} bytes for {} elements",
                layout.size(),
                capacity
            ))
        })?;

        Ok(Self {
            ptr,
            capacity,
            _marker: PhantomData,
        })
    }

    /// Grow or shrink the block in place where the allocator allows it.
    ///
    /// The first `min(old, new)` elements are preserved; anything past the
    /// old capacity is uninitialized.
    pub(crate) fn reallocate(&mut self, new_capacity: usize) -> Result<()> {
        if new_capacity == self.capacity {
            return Ok(());
        }

        let old_layout = Self::layout(self.capacity)?;
        let new_layout = Self::layout(new_capacity)?;

        if old_layout.size() == 0 || new_layout.size() == 0 {
            // One side owns no memory, so there is nothing to carry over.
            let mut fresh = Self::allocate(new_capacity)?;
            std::mem::swap(self, &mut fresh);
            return Ok(());
        }

        // SAFETY: ptr was allocated with old_layout by this type and the new
        //         size is non-zero and was validated by Layout::array.
        let raw = unsafe {
            alloc::realloc(self.ptr.as_ptr() as *mut u8, old_layout, new_layout.size())
        };

        let ptr = NonNull::new(raw as *mut T).ok_or_else(|| {
            Error::OutOfMemory(format!(
                "Failed to reallocate block from {} to {} bytes",
                old_layout.size(),
                new_layout.size()
            ))
        })?;

        self.ptr = ptr;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Free the memory. Safe to call more than once.
    pub(crate) fn release(&mut self) {
        if self.capacity == 0 {
            return;
        }

        if let Ok(layout) = Self::layout(self.capacity) {
            if layout.size() > 0 {
                // SAFETY: ptr was allocated with exactly this layout and is
                //         nulled out below, so it is never freed twice.
                unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout) };
            }
        }

        self.ptr = NonNull::dangling();
        self.capacity = 0;
    }

    /// Overwrite every byte of the block with zero
    pub(crate) fn zero(&mut self) {
        if self.capacity > 0 {
            // SAFETY: the block spans `capacity` elements.
            unsafe { ptr::write_bytes(self.ptr.as_ptr(), 0, self.capacity) };
        }
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline(always)]
    pub(crate) fn as_non_null(&self) -> NonNull<T> {
        self.ptr
    }

    /// View the first `len` elements.
    ///
    /// # Safety
    ///
    /// `len <= capacity` and every element in `0..len` must be initialized.
    #[inline(always)]
    pub(crate) unsafe fn slice(&self, len: usize) -> &[T] {
        debug_assert!(len <= self.capacity);
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), len) }
    }

    /// Mutable view of the first `len` elements.
    ///
    /// # Safety
    ///
    /// `len <= capacity` and every element in `0..len` must be initialized.
    #[inline(always)]
    pub(crate) unsafe fn slice_mut(&mut self, len: usize) -> &mut [T] {
        debug_assert!(len <= self.capacity);
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), len) }
    }

    fn layout(capacity: usize) -> Result<Layout> {
        Layout::array::<T>(capacity).map_err(|_| {
            Error::InvalidArgument(format!(
                "Capacity {} overflows the address space for {}-byte elements",
                capacity,
                std::mem::size_of::<T>()
            ))
        })
    }
}

impl<T> Drop for RawBlock<T> {
    fn drop(&mut self) {
        self.release();
    }
}
