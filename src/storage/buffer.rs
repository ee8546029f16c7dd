//! Growable flat buffers over raw memory
//!
//! [`RawBuffer`] is a resizable array of `Copy` elements living in one
//! [`RawBlock`]. It never zero-fills on growth: capacity changes only through
//! [`RawBuffer::resize`] and [`RawBuffer::ensure_capacity`], and elements past
//! `len` are never read.
//!
//! # Bulk removal
//!
//! ```text
//! remove_multiple([1, 3]) on [10, 20, 30, 40, 50]
//!
//!   read:   10  20  30  40  50
//!            │   ╳   │   ╳   │
//!   write:  10  30  50
//! ```
//!
//! A single contiguous run of indices is removed with one block move of the
//! tail; scattered indices are removed with one forward pass that moves each
//! surviving run to its final position. Both paths leave identical contents.

use super::raw::RawBlock;
use crate::error::Result;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Buffer of 32-bit integers, the element type used by the sorted store
pub type IntBuffer = RawBuffer<i32>;

const MIN_GROWTH: usize = 4;

/// A resizable, manually allocated array
pub struct RawBuffer<T: Copy + Default> {
    block: RawBlock<T>,
    len: usize,
}

impl<T: Copy + Default> RawBuffer<T> {
    /// Create a buffer of `size` default-valued elements
    pub fn new(size: usize) -> Result<Self> {
        let block: RawBlock<T> = RawBlock::allocate(size)?;
        let fill = T::default();
        for i in 0..size {
            // SAFETY: i < capacity; writing initializes the slot.
            unsafe { block.as_ptr().add(i).write(fill) };
        }
        Ok(Self { block, len: size })
    }

    /// Create an empty buffer with room for `capacity` elements
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            block: RawBlock::allocate(capacity)?,
            len: 0,
        })
    }

    /// Copy a slice into a new buffer
    pub fn from_slice(values: &[T]) -> Result<Self> {
        let mut buffer = Self::with_capacity(values.len())?;
        buffer.extend_from_slice(values)?;
        Ok(buffer)
    }

    /// Number of live elements
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the current allocation can hold
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.block.capacity()
    }

    /// Read the element at `index`. Panics if out of range.
    #[inline(always)]
    pub fn get(&self, index: usize) -> T {
        self.as_slice()[index]
    }

    /// Write the element at `index`. Panics if out of range.
    #[inline(always)]
    pub fn set(&mut self, index: usize, value: T) {
        self.as_mut_slice()[index] = value;
    }

    /// Read without a bounds check in release builds.
    ///
    /// # Safety
    ///
    /// `index < self.len()`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> T {
        debug_assert!(index < self.len, "index {} out of range {}", index, self.len);
        // SAFETY: guaranteed by the caller.
        unsafe { *self.block.as_ptr().add(index) }
    }

    /// Write without a bounds check in release builds.
    ///
    /// # Safety
    ///
    /// `index < self.len()`.
    #[inline(always)]
    pub unsafe fn set_unchecked(&mut self, index: usize, value: T) {
        debug_assert!(index < self.len, "index {} out of range {}", index, self.len);
        // SAFETY: guaranteed by the caller.
        unsafe { *self.block.as_ptr().add(index) = value };
    }

    /// View of the live elements.
    ///
    /// The view borrows the buffer, so it cannot outlive a reallocation.
    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: 0..len is always initialized.
        unsafe { self.block.slice(self.len) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: 0..len is always initialized.
        unsafe { self.block.slice_mut(self.len) }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Reallocate to exactly `new_size` elements of capacity.
    ///
    /// The shared prefix is preserved. `len` shrinks to `new_size` when it
    /// was larger and is otherwise unchanged.
    pub fn resize(&mut self, new_size: usize) -> Result<()> {
        self.block.reallocate(new_size)?;
        if self.len > new_size {
            self.len = new_size;
        }
        Ok(())
    }

    /// Grow capacity exponentially until it holds at least `min_capacity`
    pub fn ensure_capacity(&mut self, min_capacity: usize) -> Result<()> {
        if min_capacity <= self.capacity() {
            return Ok(());
        }

        let mut new_capacity = self.capacity().max(MIN_GROWTH);
        while new_capacity < min_capacity {
            new_capacity = new_capacity.saturating_mul(2);
        }

        self.resize(new_capacity)
    }

    /// Append one element, growing if needed
    pub fn push(&mut self, value: T) -> Result<()> {
        self.ensure_capacity(self.len + 1)?;
        // SAFETY: len < capacity after ensure_capacity.
        unsafe { self.block.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()> {
        self.ensure_capacity(self.len + values.len())?;
        // SAFETY: capacity covers len + values.len() and the source is a
        //         distinct borrow, so the ranges cannot overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(
                values.as_ptr(),
                self.block.as_ptr().add(self.len),
                values.len(),
            );
        }
        self.len += values.len();
        Ok(())
    }

    /// Insert `count` copies of `value` at `index`, shifting the tail right.
    ///
    /// Panics if `index > len`.
    pub fn insert_at(&mut self, index: usize, value: T, count: usize) -> Result<()> {
        assert!(index <= self.len, "insert index {} out of range {}", index, self.len);
        if count == 0 {
            return Ok(());
        }

        self.ensure_capacity(self.len + count)?;

        let base = self.block.as_ptr();
        let shift = self.len - index;
        // SAFETY: source index..len and destination index+count..len+count
        //         both lie within capacity; ptr::copy handles the overlap.
        unsafe {
            std::ptr::copy(base.add(index), base.add(index + count), shift);
            for i in 0..count {
                base.add(index + i).write(value);
            }
        }

        self.len += count;
        Ok(())
    }

    /// Remove the element at `index`, shifting the tail left.
    ///
    /// Panics if `index >= len`.
    pub fn remove_at(&mut self, index: usize) -> T {
        let removed = self.get(index);
        self.as_mut_slice().copy_within(index + 1.., index);
        self.len -= 1;
        removed
    }

    /// Remove every listed index in a single pass.
    ///
    /// Indices may be given in any order and may repeat. Survivors keep their
    /// relative order and stay densely packed at the front. Returns the
    /// number of elements removed.
    pub fn remove_multiple(&mut self, indices: &[usize]) -> usize {
        if indices.is_empty() {
            return 0;
        }

        let normalized;
        let sorted: &[usize] = if is_strictly_ascending(indices) {
            indices
        } else {
            let mut owned = indices.to_vec();
            owned.sort_unstable();
            owned.dedup();
            normalized = owned;
            &normalized
        };

        debug_assert!(
            sorted.last().map_or(true, |&last| last < self.len),
            "remove index {:?} out of range {}",
            sorted.last(),
            self.len
        );
        let in_range = sorted.partition_point(|&i| i < self.len);
        let sorted = &sorted[..in_range];
        if sorted.is_empty() {
            return 0;
        }

        let len = self.len;
        let first = sorted[0];
        let run = sorted.len();
        let data = self.as_mut_slice();

        if sorted[run - 1] - first == run - 1 {
            // One contiguous run: move the tail down in one block.
            data.copy_within(first + run..len, first);
        } else {
            let mut write = first;
            for (n, &gap) in sorted.iter().enumerate() {
                let next = sorted.get(n + 1).copied().unwrap_or(len);
                let live = gap + 1..next;
                let live_len = live.len();
                data.copy_within(live, write);
                write += live_len;
            }
        }

        self.len -= run;
        run
    }

    /// Shorten to `len` elements; no-op when already shorter
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    /// Reset every live element to `T::default()`. Length is unchanged.
    pub fn clear(&mut self) {
        self.as_mut_slice().fill(T::default());
    }

    /// Release the memory. The buffer stays usable as an empty buffer.
    pub fn dispose(&mut self) {
        // Dropping the old block releases it.
        self.block = RawBlock::empty();
        self.len = 0;
    }
}

fn is_strictly_ascending(indices: &[usize]) -> bool {
    indices.windows(2).all(|w| w[0] < w[1])
}

impl<T: Copy + Default> Index<usize> for RawBuffer<T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T: Copy + Default> IndexMut<usize> for RawBuffer<T> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<'a, T: Copy + Default> IntoIterator for &'a RawBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Copy + Default + fmt::Debug> fmt::Debug for RawBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("data", &self.as_slice())
            .finish()
    }
}
