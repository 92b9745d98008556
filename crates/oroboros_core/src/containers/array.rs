//! # Dynamic Array
//!
//! Growable sequence on top of [`ElementBuffer`].
//!
//! Unlike `Vec`, growth is bounded: a full array grows by half its capacity,
//! clamped to the [`AllocStrategy`] bounds, so very large arrays never double
//! in one step. Removing from the front leaves spare room there, which makes
//! a following front insert O(1).

use std::fmt;
use std::ops::{Bound, Deref, DerefMut, RangeBounds};

use super::element_buffer::ElementBuffer;
use crate::config::AllocStrategy;

/// Growable array with a configurable growth strategy.
pub struct Array<T> {
    buffer: ElementBuffer<T>,
    strategy: AllocStrategy,
}

impl<T> Array<T> {
    /// Creates an empty array with the default growth strategy.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_strategy(AllocStrategy::default())
    }

    /// Creates an empty array growing by the given strategy.
    #[inline]
    #[must_use]
    pub fn with_strategy(strategy: AllocStrategy) -> Self {
        Self {
            buffer: ElementBuffer::new(),
            strategy,
        }
    }

    /// Creates an empty array with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut array = Self::new();
        array.reserve(capacity);
        array
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the array holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Allocated slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Free slots at both ends.
    #[inline]
    #[must_use]
    pub fn spare(&self) -> usize {
        self.buffer.spare()
    }

    /// Free slots before the first element.
    #[inline]
    #[must_use]
    pub fn front_spare(&self) -> usize {
        self.buffer.front_spare()
    }

    /// Free slots after the last element.
    #[inline]
    #[must_use]
    pub fn back_spare(&self) -> usize {
        self.buffer.back_spare()
    }

    /// Current growth strategy.
    #[inline]
    #[must_use]
    pub fn alloc_strategy(&self) -> AllocStrategy {
        self.strategy
    }

    /// Replaces the growth bounds.
    pub fn set_alloc_strategy(&mut self, min_grow: usize, max_grow: usize) {
        self.strategy = AllocStrategy::new(min_grow, max_grow);
    }

    /// Sets the capacity to exactly `capacity` slots and disables growth.
    ///
    /// Adding beyond this capacity panics.
    ///
    /// # Panics
    ///
    /// Panics if the array already holds more than `capacity` elements.
    pub fn set_fixed_capacity(&mut self, capacity: usize) {
        self.strategy = AllocStrategy::fixed();
        self.adjust_capacity(capacity);
    }

    /// Makes room for `additional` more elements without further growth.
    pub fn reserve(&mut self, additional: usize) {
        let wanted = self.len() + additional;
        if wanted > self.capacity() {
            self.adjust_capacity(wanted);
        }
    }

    /// Shrinks the capacity to the number of elements.
    pub fn trim(&mut self) {
        let len = self.len();
        if len == 0 {
            self.buffer.destroy();
        } else {
            self.adjust_capacity(len);
        }
    }

    /// Drops every element, keeping the capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn adjust_capacity(&mut self, capacity: usize) {
        tracing::trace!("array realloc: {} -> {} slots", self.capacity(), capacity);
        self.buffer.alloc(capacity, 0);
    }

    fn grow(&mut self) {
        let capacity = self.capacity();
        let grow_by = self.strategy.grow_by(capacity);
        assert!(grow_by > 0, "Array: fixed capacity {capacity} exceeded");
        self.adjust_capacity(capacity + grow_by);
    }

    /// Appends an element.
    #[inline]
    pub fn add(&mut self, value: T) {
        if self.buffer.back_spare() == 0 {
            self.grow();
        }
        self.buffer.push_back(value);
    }

    /// Constructs an element at the back and returns it.
    #[inline]
    pub fn emplace_back(&mut self, make: impl FnOnce() -> T) -> &mut T {
        if self.buffer.back_spare() == 0 {
            self.grow();
        }
        self.buffer.emplace_back(make)
    }

    /// Inserts an element at `index`, shifting later elements.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) {
        if self.buffer.spare() == 0 {
            self.grow();
        }
        self.buffer.insert(index, value);
    }

    /// Removes and returns the last element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    pub fn pop_back(&mut self) -> T {
        self.buffer.pop_back()
    }

    /// Removes and returns the first element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    pub fn pop_front(&mut self) -> T {
        self.buffer.pop_front()
    }

    /// Removes the element at `index`, keeping order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn erase(&mut self, index: usize) -> T {
        self.buffer.erase(index)
    }

    /// Removes the element at `index` without keeping order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn erase_swap(&mut self, index: usize) -> T {
        self.buffer.erase_swap(index)
    }

    /// Removes the element at `index`, moving the last element into its place.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn erase_swap_back(&mut self, index: usize) -> T {
        self.buffer.erase_swap_back(index)
    }

    /// Removes the element at `index`, moving the first element into its place.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn erase_swap_front(&mut self, index: usize) -> T {
        self.buffer.erase_swap_front(index)
    }

    /// Removes `count` elements starting at `index`, keeping order.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds `len()`.
    #[inline]
    pub fn erase_range(&mut self, index: usize, count: usize) {
        self.buffer.erase_range(index, count);
    }

    /// First element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    #[must_use]
    pub fn front(&self) -> &T {
        self.buffer.front()
    }

    /// Last element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    #[must_use]
    pub fn back(&self) -> &T {
        self.buffer.back()
    }

    /// Mutable first element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    pub fn front_mut(&mut self) -> &mut T {
        self.buffer.front_mut()
    }

    /// Mutable last element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    pub fn back_mut(&mut self) -> &mut T {
        self.buffer.back_mut()
    }

    /// Elements as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.buffer.as_slice()
    }

    /// Elements as a mutable slice.
    #[inline]
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buffer.as_mut_slice()
    }
}

impl<T: PartialEq> Array<T> {
    /// Index of the first element equal to `value` inside `range`.
    ///
    /// # Panics
    ///
    /// Panics if `range` exceeds `len()`.
    #[must_use]
    pub fn find_index_linear(&self, value: &T, range: impl RangeBounds<usize>) -> Option<usize> {
        let first = match range.start_bound() {
            Bound::Included(&i) => i,
            Bound::Excluded(&i) => i + 1,
            Bound::Unbounded => 0,
        };
        let window = &self.as_slice()[(range.start_bound().cloned(), range.end_bound().cloned())];
        window.iter().position(|e| e == value).map(|i| first + i)
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning trims the capacity to the number of elements.
impl<T: Clone> Clone for Array<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            strategy: self.strategy,
        }
    }
}

impl<T> Deref for Array<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for Array<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: PartialEq> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for Array<T> {}

impl<T: fmt::Debug> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T> Extend<T> for Array<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.add(value);
        }
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T: Clone> From<&[T]> for Array<T> {
    fn from(values: &[T]) -> Self {
        values.iter().cloned().collect()
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Array<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

impl<T> IntoIterator for Array<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { buffer: self.buffer }
    }
}

/// Owning iterator over an [`Array`].
pub struct IntoIter<T> {
    buffer: ElementBuffer<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.pop_front())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.buffer.len();
        (len, Some(len))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.pop_back())
        }
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_and_insert() {
        let mut a = Array::new();
        a.reserve(0);
        a.add(1);
        a.add(2);
        a.insert(1, 99);
        assert_eq!(a.as_slice(), &[1, 99, 2]);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_first_growth_uses_min_grow() {
        let mut a = Array::new();
        a.add(0u32);
        assert_eq!(a.capacity(), 16);
        for i in 1..17 {
            a.add(i);
        }
        assert_eq!(a.capacity(), 32);
    }

    #[test]
    fn test_growth_clamped_to_max_grow() {
        let mut a = Array::with_strategy(AllocStrategy::new(4, 8));
        let mut caps = Vec::new();
        for i in 0..60 {
            a.add(i);
            if caps.last() != Some(&a.capacity()) {
                caps.push(a.capacity());
            }
        }
        assert_eq!(caps, vec![4, 8, 12, 18, 26, 34, 42, 50, 58, 66]);
    }

    #[test]
    fn test_front_erase_gives_cheap_front_insert() {
        let mut a: Array<i32> = (0..10).collect();
        let cap = a.capacity();
        assert_eq!(a.erase(0), 0);
        assert_eq!(a.front_spare(), 1);
        a.insert(0, -1);
        assert_eq!(a.front_spare(), 0);
        assert_eq!(a.capacity(), cap);
        assert_eq!(a[0], -1);
    }

    #[test]
    fn test_insert_grows_when_full() {
        let mut a = Array::new();
        a.set_fixed_capacity(2);
        a.add(1);
        a.add(3);
        a.set_alloc_strategy(1, 1);
        a.insert(1, 2);
        assert_eq!(a.capacity(), 3);
        assert_eq!(a.as_slice(), &[1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "fixed capacity 2 exceeded")]
    fn test_fixed_capacity_overflow_panics() {
        let mut a = Array::new();
        a.set_fixed_capacity(2);
        a.add(1);
        a.add(2);
        a.add(3);
    }

    #[test]
    fn test_reserve_and_trim() {
        let mut a: Array<u8> = Array::new();
        a.reserve(100);
        assert_eq!(a.capacity(), 100);
        a.add(1);
        a.add(2);
        a.reserve(10);
        assert_eq!(a.capacity(), 100);
        a.trim();
        assert_eq!(a.capacity(), 2);
        a.clear();
        a.trim();
        assert_eq!(a.capacity(), 0);
    }

    #[test]
    fn test_find_index_linear() {
        let a: Array<i32> = [5, 1, 5, 7, 5].iter().copied().collect();
        assert_eq!(a.find_index_linear(&5, ..), Some(0));
        assert_eq!(a.find_index_linear(&5, 1..), Some(2));
        assert_eq!(a.find_index_linear(&5, 3..4), None);
        assert_eq!(a.find_index_linear(&7, 2..=3), Some(3));
        assert_eq!(a.find_index_linear(&9, ..), None);
    }

    #[test]
    fn test_erase_family() {
        let mut a: Array<i32> = (0..8).collect();
        assert_eq!(a.erase_swap_back(0), 0);
        assert_eq!(a.as_slice(), &[7, 1, 2, 3, 4, 5, 6]);
        assert_eq!(a.erase_swap_front(3), 3);
        assert_eq!(a.as_slice(), &[1, 2, 7, 4, 5, 6]);
        a.erase_range(1, 2);
        assert_eq!(a.as_slice(), &[1, 4, 5, 6]);
        assert_eq!(a.pop_back(), 6);
        assert_eq!(a.pop_front(), 1);
        assert_eq!(a.as_slice(), &[4, 5]);
    }

    #[test]
    fn test_clone_trims_and_keeps_strategy() {
        let mut a = Array::with_strategy(AllocStrategy::new(2, 4));
        a.add("x".to_string());
        let b = a.clone();
        assert_eq!(b.capacity(), 1);
        assert_eq!(b.alloc_strategy(), AllocStrategy::new(2, 4));
        assert_eq!(a, b);
    }

    #[test]
    fn test_into_iter_both_ends() {
        let a: Array<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
        let mut it = a.into_iter();
        assert_eq!(it.len(), 3);
        assert_eq!(it.next_back().as_deref(), Some("c"));
        assert_eq!(it.next().as_deref(), Some("a"));
        assert_eq!(it.collect::<Vec<_>>(), vec!["b".to_string()]);
    }

    #[test]
    fn test_deref_slice_methods() {
        let mut a: Array<i32> = [3, 1, 2].iter().copied().collect();
        a.sort_unstable();
        assert_eq!(a.iter().sum::<i32>(), 6);
        assert_eq!(a.binary_search(&2), Ok(1));
    }

    proptest! {
        #[test]
        fn prop_growth_law_and_order(values in proptest::collection::vec(any::<i64>(), 0..600),
                                     min_grow in 1usize..32,
                                     extra in 0usize..64) {
            let max_grow = min_grow + extra;
            let strategy = AllocStrategy::new(min_grow, max_grow);
            let mut a = Array::with_strategy(strategy);
            for v in &values {
                let before = a.capacity();
                a.add(*v);
                if a.capacity() != before {
                    prop_assert_eq!(a.capacity(), before + strategy.grow_by(before));
                }
            }
            prop_assert_eq!(a.as_slice(), values.as_slice());
        }
    }
}
