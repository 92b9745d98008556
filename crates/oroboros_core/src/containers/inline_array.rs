//! # Inline Array
//!
//! An [`Array`](super::Array) with its capacity in the type and its storage
//! inline: no heap allocation, no growth. Adding past `N` panics.

// Slots [0, len) are initialized; every unsafe block keeps that true.
#![allow(unsafe_code)]

use std::fmt;
use std::mem::MaybeUninit;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::slice;

/// Fixed-capacity array stored inline.
pub struct InlineArray<T, const N: usize> {
    items: [MaybeUninit<T>; N],
    len: usize,
}

impl<T, const N: usize> InlineArray<T, N> {
    /// Creates an empty array.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            // SAFETY: an array of MaybeUninit needs no initialization.
            items: unsafe { MaybeUninit::<[MaybeUninit<T>; N]>::uninit().assume_init() },
            len: 0,
        }
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there are no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of elements, `N`.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns true if no more elements fit.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Appends an element.
    ///
    /// # Panics
    ///
    /// Panics if the array is full.
    pub fn add(&mut self, value: T) {
        if self.try_add(value).is_err() {
            panic!("InlineArray: capacity {N} exceeded");
        }
    }

    /// Appends an element, handing it back if the array is full.
    ///
    /// # Errors
    ///
    /// Returns `value` when `len() == N`.
    pub fn try_add(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.items[self.len].write(value);
        self.len += 1;
        Ok(())
    }

    /// Inserts an element at `index`, shifting later ones back.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()` or the array is full.
    pub fn insert(&mut self, index: usize, value: T) {
        let len = self.len;
        assert!(index <= len, "InlineArray: insert at {index} past length {len}");
        assert!(len < N, "InlineArray: capacity {N} exceeded");
        // SAFETY: len < N, so [index, len] is in bounds; the gap is written
        // before len covers it.
        unsafe {
            let slot = self.slot_mut(index);
            ptr::copy(slot, slot.add(1), len - index);
            ptr::write(slot, value);
        }
        self.len += 1;
    }

    /// Removes and returns the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot len was initialized and is now outside [0, len).
        Some(unsafe { self.items[self.len].assume_init_read() })
    }

    /// Removes the element at `index`, keeping order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase(&mut self, index: usize) -> T {
        let len = self.len;
        assert!(index < len, "InlineArray: index {index} out of bounds for length {len}");
        // SAFETY: index is initialized; the tail moves down over it and
        // len shrinks past the stale last slot.
        unsafe {
            let slot = self.slot_mut(index);
            let value = ptr::read(slot);
            ptr::copy(slot.add(1), slot, len - index - 1);
            self.len -= 1;
            value
        }
    }

    /// Removes the element at `index`, moving the last element into its
    /// place.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase_swap(&mut self, index: usize) -> T {
        let len = self.len;
        assert!(index < len, "InlineArray: index {index} out of bounds for length {len}");
        self.as_mut_slice().swap(index, len - 1);
        self.len -= 1;
        // SAFETY: the removed element now sits in the stale last slot.
        unsafe { self.items[len - 1].assume_init_read() }
    }

    /// Drops every element.
    pub fn clear(&mut self) {
        let len = self.len;
        // Leak rather than double drop if an element's Drop panics.
        self.len = 0;
        // SAFETY: [0, len) was initialized and is no longer reachable.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.slot_mut(0), len)) };
    }

    /// Elements as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: [0, len) is initialized.
        unsafe { slice::from_raw_parts(self.items.as_ptr().cast::<T>(), self.len) }
    }

    /// Elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: [0, len) is initialized.
        unsafe { slice::from_raw_parts_mut(self.slot_mut(0), self.len) }
    }

    #[inline]
    fn slot_mut(&mut self, index: usize) -> *mut T {
        self.items.as_mut_ptr().cast::<T>().wrapping_add(index)
    }
}

impl<T, const N: usize> Drop for InlineArray<T, N> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, const N: usize> Default for InlineArray<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Deref for InlineArray<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize> DerefMut for InlineArray<T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone, const N: usize> Clone for InlineArray<T, N> {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        for item in self.iter() {
            copy.add(item.clone());
        }
        copy
    }
}

impl<T: PartialEq, const N: usize> PartialEq for InlineArray<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const N: usize> Eq for InlineArray<T, N> {}

impl<T: fmt::Debug, const N: usize> fmt::Debug for InlineArray<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, const N: usize> FromIterator<T> for InlineArray<T, N> {
    /// # Panics
    ///
    /// Panics if the iterator yields more than `N` items.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        for item in iter {
            array.add(item);
        }
        array
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a InlineArray<T, N> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
