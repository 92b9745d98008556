//! # Element Buffer
//!
//! Double-ended raw storage used by every array-backed container.
//!
//! ```text
//! |----|----|XXXX|XXXX|XXXX|XXXX|----|----|----|
//! 0         start               end            cap
//!
//! '----' - uninitialized slot
//! 'XXXX' - live element
//! ```
//!
//! Live elements occupy `[start, end)`. Removing at the front leaves spare
//! room at the front, so a later front insert costs nothing. The buffer never
//! grows on its own: the owning container re-allocates it with
//! [`ElementBuffer::alloc`] before inserting into a full buffer.

// SAFETY: This module manages partially initialized storage by hand.
// Every unsafe block keeps live elements inside [start, end).
#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::ptr::{self, NonNull};
use std::slice;

use crate::memory::raw;

/// Contiguous storage with spare room at both ends.
pub struct ElementBuffer<T> {
    /// Start of the allocation.
    buf: NonNull<T>,
    /// Allocated slots.
    cap: usize,
    /// Index of the first live element.
    start: usize,
    /// One past the last live element.
    end: usize,
    /// Owns values of T.
    _marker: PhantomData<T>,
}

// SAFETY: ElementBuffer owns its elements like a Vec does.
unsafe impl<T: Send> Send for ElementBuffer<T> {}
// SAFETY: Shared access only hands out &T.
unsafe impl<T: Sync> Sync for ElementBuffer<T> {}

impl<T> ElementBuffer<T> {
    /// Creates an empty buffer without allocating.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: NonNull::dangling(),
            cap: 0,
            start: 0,
            end: 0,
            _marker: PhantomData,
        }
    }

    /// Creates a buffer with `capacity` slots and `front_spare` free slots
    /// before the first element.
    #[must_use]
    pub fn with_capacity(capacity: usize, front_spare: usize) -> Self {
        let mut buffer = Self::new();
        if capacity > 0 {
            buffer.alloc(capacity, front_spare);
        }
        buffer
    }

    /// Number of live elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if no element is live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Total number of slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Free slots before the first element.
    #[inline]
    #[must_use]
    pub const fn front_spare(&self) -> usize {
        self.start
    }

    /// Free slots after the last element.
    #[inline]
    #[must_use]
    pub const fn back_spare(&self) -> usize {
        self.cap - self.end
    }

    /// Free slots at both ends.
    #[inline]
    #[must_use]
    pub const fn spare(&self) -> usize {
        self.cap - self.len()
    }

    #[inline]
    fn slot(&self, index: usize) -> *mut T {
        debug_assert!(index <= self.cap);
        // SAFETY: index is within (or one past) the allocation.
        unsafe { self.buf.as_ptr().add(index) }
    }

    /// Live elements as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: [start, end) is initialized.
        unsafe { slice::from_raw_parts(self.slot(self.start), self.len()) }
    }

    /// Live elements as a mutable slice.
    #[inline]
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len();
        // SAFETY: [start, end) is initialized and we hold &mut self.
        unsafe { slice::from_raw_parts_mut(self.slot(self.start), len) }
    }

    /// First element.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    #[inline]
    #[must_use]
    pub fn front(&self) -> &T {
        assert!(!self.is_empty(), "ElementBuffer::front on empty buffer");
        &self.as_slice()[0]
    }

    /// Last element.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    #[inline]
    #[must_use]
    pub fn back(&self) -> &T {
        assert!(!self.is_empty(), "ElementBuffer::back on empty buffer");
        &self.as_slice()[self.len() - 1]
    }

    /// Mutable first element.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    #[inline]
    pub fn front_mut(&mut self) -> &mut T {
        assert!(!self.is_empty(), "ElementBuffer::front_mut on empty buffer");
        &mut self.as_mut_slice()[0]
    }

    /// Mutable last element.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    #[inline]
    pub fn back_mut(&mut self) -> &mut T {
        assert!(!self.is_empty(), "ElementBuffer::back_mut on empty buffer");
        let last = self.len() - 1;
        &mut self.as_mut_slice()[last]
    }

    /// Re-allocates to `capacity` slots with `front_spare` free slots before
    /// the first element, moving every live element over.
    ///
    /// With an unchanged capacity the elements are shifted in place.
    ///
    /// # Panics
    ///
    /// Panics if the live elements do not fit.
    pub fn alloc(&mut self, capacity: usize, front_spare: usize) {
        let len = self.len();
        assert!(
            front_spare + len <= capacity,
            "ElementBuffer::alloc: {len} elements do not fit capacity {capacity} with front spare {front_spare}"
        );
        if capacity == self.cap {
            if front_spare != self.start && len > 0 {
                // SAFETY: both ranges lie inside the allocation; ptr::copy
                // handles the overlap.
                unsafe { ptr::copy(self.slot(self.start), self.buf.as_ptr().add(front_spare), len) };
            }
            self.start = front_spare;
            self.end = front_spare + len;
            return;
        }

        let new_buf = raw::alloc_array::<T>(capacity);
        if len > 0 {
            // SAFETY: both regions are valid for `len` elements and belong to
            // different allocations.
            unsafe {
                ptr::copy_nonoverlapping(self.slot(self.start), new_buf.as_ptr().add(front_spare), len);
            }
        }
        // SAFETY: the old storage came from alloc_array with self.cap and its
        // elements were moved out above.
        unsafe { raw::free_array(self.buf, self.cap) };

        self.buf = new_buf;
        self.cap = capacity;
        self.start = front_spare;
        self.end = front_spare + len;
    }

    /// Slides the live elements down so the front spare becomes back spare.
    pub fn move_to_front(&mut self) {
        let len = self.len();
        if self.start > 0 && len > 0 {
            // SAFETY: both ranges are inside the allocation; ptr::copy
            // handles the overlap.
            unsafe { ptr::copy(self.slot(self.start), self.buf.as_ptr(), len) };
        }
        self.start = 0;
        self.end = len;
    }

    /// Drops every element and frees the storage.
    pub fn destroy(&mut self) {
        let buf = self.buf;
        let cap = self.cap;
        let start = self.start;
        let len = self.len();
        self.buf = NonNull::dangling();
        self.cap = 0;
        self.start = 0;
        self.end = 0;
        // SAFETY: [start, start+len) was live; the buffer no longer tracks it.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(buf.as_ptr().add(start), len));
            raw::free_array(buf, cap);
        }
    }

    /// Drops every element, keeping the storage.
    pub fn clear(&mut self) {
        let len = self.len();
        let first = self.slot(self.start);
        self.end = self.start;
        // SAFETY: the elements were live and are no longer tracked.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, len)) };
    }

    /// Appends an element into the back spare.
    ///
    /// # Panics
    ///
    /// Panics if there is no back spare.
    #[inline]
    pub fn push_back(&mut self, value: T) {
        assert!(self.end < self.cap, "ElementBuffer::push_back: no back spare");
        // SAFETY: slot `end` is allocated and uninitialized.
        unsafe { ptr::write(self.slot(self.end), value) };
        self.end += 1;
    }

    /// Prepends an element into the front spare.
    ///
    /// # Panics
    ///
    /// Panics if there is no front spare.
    #[inline]
    pub fn push_front(&mut self, value: T) {
        assert!(self.start > 0, "ElementBuffer::push_front: no front spare");
        // SAFETY: slot `start - 1` is allocated and uninitialized.
        unsafe { ptr::write(self.slot(self.start - 1), value) };
        self.start -= 1;
    }

    /// Constructs an element directly into the back spare.
    ///
    /// # Panics
    ///
    /// Panics if there is no back spare.
    #[inline]
    pub fn emplace_back(&mut self, make: impl FnOnce() -> T) -> &mut T {
        assert!(self.end < self.cap, "ElementBuffer::emplace_back: no back spare");
        let slot = self.slot(self.end);
        // SAFETY: slot `end` is allocated and uninitialized.
        unsafe { ptr::write(slot, make()) };
        self.end += 1;
        // SAFETY: just initialized.
        unsafe { &mut *slot }
    }

    /// Constructs an element directly into the front spare.
    ///
    /// # Panics
    ///
    /// Panics if there is no front spare.
    #[inline]
    pub fn emplace_front(&mut self, make: impl FnOnce() -> T) -> &mut T {
        assert!(self.start > 0, "ElementBuffer::emplace_front: no front spare");
        let slot = self.slot(self.start - 1);
        // SAFETY: slot `start - 1` is allocated and uninitialized.
        unsafe { ptr::write(slot, make()) };
        self.start -= 1;
        // SAFETY: just initialized.
        unsafe { &mut *slot }
    }

    /// Removes and returns the last element.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    #[inline]
    pub fn pop_back(&mut self) -> T {
        assert!(!self.is_empty(), "ElementBuffer::pop_back on empty buffer");
        self.end -= 1;
        // SAFETY: slot `end` was the last live element.
        unsafe { ptr::read(self.slot(self.end)) }
    }

    /// Removes and returns the first element.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    #[inline]
    pub fn pop_front(&mut self) -> T {
        assert!(!self.is_empty(), "ElementBuffer::pop_front on empty buffer");
        self.start += 1;
        // SAFETY: slot `start - 1` was the first live element.
        unsafe { ptr::read(self.slot(self.start - 1)) }
    }

    /// Inserts `value` at logical `index`, keeping element order.
    ///
    /// Shifts the shorter side of the buffer when both ends have spare room,
    /// otherwise the side that has room. Returns the number of elements that
    /// were shifted, which is never more than `len()`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()` or the buffer has no spare room.
    pub fn insert(&mut self, index: usize, value: T) -> usize {
        let len = self.len();
        assert!(index <= len, "ElementBuffer::insert: index {index} out of range 0..={len}");
        assert!(self.spare() > 0, "ElementBuffer::insert: no spare room, grow first");

        let before = index;
        let after = len - index;
        let shift_front = if self.start == 0 {
            false
        } else if self.end == self.cap {
            true
        } else {
            before <= after
        };

        if shift_front {
            // SAFETY: slot start-1 is free; the `before` elements move one
            // slot toward the front, opening slot start-1+index.
            unsafe {
                let first = self.slot(self.start);
                ptr::copy(first, first.sub(1), before);
                self.start -= 1;
                ptr::write(self.slot(self.start + index), value);
            }
            before
        } else {
            // SAFETY: slot end is free; the `after` elements move one slot
            // toward the back, opening slot start+index.
            unsafe {
                let at = self.slot(self.start + index);
                ptr::copy(at, at.add(1), after);
                ptr::write(at, value);
            }
            self.end += 1;
            after
        }
    }

    /// Removes the element at `index`, keeping element order.
    ///
    /// The shorter half of the buffer is moved to close the gap.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase(&mut self, index: usize) -> T {
        let len = self.len();
        assert!(index < len, "ElementBuffer::erase: index {index} out of range 0..{len}");
        if index == len - 1 {
            return self.pop_back();
        }
        if index == 0 {
            return self.pop_front();
        }
        // SAFETY: `index` is live; the moved ranges stay inside [start, end).
        unsafe {
            let at = self.slot(self.start + index);
            let removed = ptr::read(at);
            if index < (len >> 1) {
                let first = self.slot(self.start);
                ptr::copy(first, first.add(1), index);
                self.start += 1;
            } else {
                ptr::copy(at.add(1), at, len - index - 1);
                self.end -= 1;
            }
            removed
        }
    }

    /// Removes the element at `index` and fills the hole with the first or
    /// last element, whichever keeps front and back spare balanced.
    ///
    /// Does not preserve element order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase_swap(&mut self, index: usize) -> T {
        let len = self.len();
        assert!(index < len, "ElementBuffer::erase_swap: index {index} out of range 0..{len}");
        if index == 0 {
            self.pop_front()
        } else if index == len - 1 {
            self.pop_back()
        } else if self.front_spare() > self.back_spare() {
            self.swap_in_back(index)
        } else {
            self.swap_in_front(index)
        }
    }

    /// Removes the element at `index`, filling the hole from the back.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase_swap_back(&mut self, index: usize) -> T {
        let len = self.len();
        assert!(index < len, "ElementBuffer::erase_swap_back: index {index} out of range 0..{len}");
        if index == len - 1 {
            self.pop_back()
        } else {
            self.swap_in_back(index)
        }
    }

    /// Removes the element at `index`, filling the hole from the front.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase_swap_front(&mut self, index: usize) -> T {
        let len = self.len();
        assert!(index < len, "ElementBuffer::erase_swap_front: index {index} out of range 0..{len}");
        if index == 0 {
            self.pop_front()
        } else {
            self.swap_in_front(index)
        }
    }

    fn swap_in_back(&mut self, index: usize) -> T {
        // SAFETY: index and end-1 are distinct live slots.
        unsafe {
            let at = self.slot(self.start + index);
            let removed = ptr::read(at);
            self.end -= 1;
            ptr::copy_nonoverlapping(self.slot(self.end), at, 1);
            removed
        }
    }

    fn swap_in_front(&mut self, index: usize) -> T {
        // SAFETY: index and start are distinct live slots.
        unsafe {
            let at = self.slot(self.start + index);
            let removed = ptr::read(at);
            ptr::copy_nonoverlapping(self.slot(self.start), at, 1);
            self.start += 1;
            removed
        }
    }

    /// Removes `count` elements starting at `index`, keeping element order.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds `len()`.
    pub fn erase_range(&mut self, index: usize, count: usize) {
        let len = self.len();
        assert!(
            index + count <= len,
            "ElementBuffer::erase_range: {index}+{count} out of range 0..{len}"
        );
        if count == 0 {
            return;
        }
        let tail = len - index - count;
        let at = self.slot(self.start + index);
        // Forget the tail while the erased range drops.
        self.end = self.start + index;
        // SAFETY: [at, at+count) is live; the tail is moved down afterwards.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(at, count));
            ptr::copy(at.add(count), at, tail);
        }
        self.end += tail;
    }

    /// Returns the element at `index`, or None when out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// Returns the element at `index` mutably, or None when out of range.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }
}

impl<T> Default for ElementBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ElementBuffer<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Cloning trims the capacity to the number of live elements.
impl<T: Clone> Clone for ElementBuffer<T> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_capacity(self.len(), 0);
        for value in self.as_slice() {
            copy.push_back(value.clone());
        }
        copy
    }
}

impl<T> Index<usize> for ElementBuffer<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        let len = self.len();
        match self.as_slice().get(index) {
            Some(value) => value,
            None => panic!("ElementBuffer index {index} out of range 0..{len}"),
        }
    }
}

impl<T> IndexMut<usize> for ElementBuffer<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        match self.as_mut_slice().get_mut(index) {
            Some(value) => value,
            None => panic!("ElementBuffer index {index} out of range 0..{len}"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ElementBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
