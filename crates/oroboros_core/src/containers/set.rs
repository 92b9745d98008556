//! # Sorted Set
//!
//! Unique values kept in ascending order inside an [`Array`].
//!
//! Lookups are binary searches. Inserts shift the tail of the array, so
//! filling a large set one by one is quadratic; use bulk mode for that:
//!
//! ```rust,ignore
//! set.begin_bulk();
//! for v in values {
//!     set.insert_bulk(v);
//! }
//! set.end_bulk(); // one sort
//! ```

use std::cmp::Ordering;
use std::fmt;

use super::array::Array;
use crate::config::AllocStrategy;
use crate::error::{CoreError, CoreResult};

/// Ordered collection of unique values.
pub struct Set<T> {
    values: Array<T>,
    in_bulk: bool,
}

impl<T: Ord> Set<T> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_strategy(AllocStrategy::default())
    }

    /// Creates an empty set growing by the given strategy.
    #[must_use]
    pub fn with_strategy(strategy: AllocStrategy) -> Self {
        Self {
            values: Array::with_strategy(strategy),
            in_bulk: false,
        }
    }

    /// Replaces the growth bounds of the backing array.
    pub fn set_alloc_strategy(&mut self, min_grow: usize, max_grow: usize) {
        self.values.set_alloc_strategy(min_grow, max_grow);
    }

    /// Growth strategy of the backing array.
    #[inline]
    #[must_use]
    pub fn alloc_strategy(&self) -> AllocStrategy {
        self.values.alloc_strategy()
    }

    /// Number of values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the set is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Allocated slots of the backing array.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Makes room for `additional` more values.
    pub fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
    }

    /// Shrinks the backing array to the number of values.
    pub fn trim(&mut self) {
        self.values.trim();
    }

    /// Drops every value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[inline]
    fn lower_bound(&self, value: &T) -> usize {
        self.values.partition_point(|e| e < value)
    }

    #[inline]
    fn check_sorted_mode(&self, op: &str) {
        assert!(!self.in_bulk, "Set::{op} called in bulk mode");
    }

    /// Inserts `value` at its sorted position.
    ///
    /// # Panics
    ///
    /// Panics if an equal value is already present.
    pub fn insert(&mut self, value: T) {
        if let Err(err) = self.try_insert(value) {
            panic!("Set::insert: {err}");
        }
    }

    /// Inserts `value` at its sorted position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`] if an equal value is present; the
    /// set is left unchanged.
    pub fn try_insert(&mut self, value: T) -> CoreResult<()> {
        self.check_sorted_mode("insert");
        let index = self.lower_bound(&value);
        if index < self.len() && self.values[index] == value {
            return Err(CoreError::DuplicateKey);
        }
        self.values.insert(index, value);
        Ok(())
    }

    /// Returns true if an equal value is present.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.find(value).is_some()
    }

    /// Returns the stored value equal to `value`.
    #[must_use]
    pub fn find(&self, value: &T) -> Option<&T> {
        self.check_sorted_mode("find");
        self.values.binary_search(value).ok().map(|i| &self.values[i])
    }

    /// Looks up a value by a comparator instead of a `T`.
    ///
    /// `cmp` orders a stored value relative to the probe and must agree with
    /// the order of `T`.
    pub fn find_by(&self, cmp: impl FnMut(&T) -> Ordering) -> Option<&T> {
        self.check_sorted_mode("find_by");
        self.values.binary_search_by(cmp).ok().map(|i| &self.values[i])
    }

    /// Removes the value equal to `value`. Returns false if it was absent.
    pub fn erase(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Removes and returns the value equal to `value`.
    pub fn take(&mut self, value: &T) -> Option<T> {
        self.check_sorted_mode("erase");
        let index = self.values.binary_search(value).ok()?;
        Some(self.values.erase(index))
    }

    /// Value at sorted position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn value_at_index(&self, index: usize) -> &T {
        &self.values[index]
    }

    /// Enters bulk mode: values are appended unsorted until [`Set::end_bulk`].
    ///
    /// # Panics
    ///
    /// Panics if already in bulk mode.
    pub fn begin_bulk(&mut self) {
        assert!(!self.in_bulk, "Set::begin_bulk: already in bulk mode");
        self.in_bulk = true;
    }

    /// Appends `value` without sorting.
    ///
    /// # Panics
    ///
    /// Panics outside bulk mode.
    pub fn insert_bulk(&mut self, value: T) {
        assert!(self.in_bulk, "Set::insert_bulk outside bulk mode");
        if self.values.front_spare() > self.values.back_spare() {
            self.values.insert(0, value);
        } else {
            self.values.add(value);
        }
    }

    /// Leaves bulk mode and sorts the values once.
    ///
    /// # Panics
    ///
    /// Panics outside bulk mode or if two equal values were inserted.
    pub fn end_bulk(&mut self) {
        assert!(self.in_bulk, "Set::end_bulk outside bulk mode");
        self.in_bulk = false;
        self.values.sort_unstable();
        if self.values.windows(2).any(|w| w[0] == w[1]) {
            panic!("Set::end_bulk: {}", CoreError::DuplicateKey);
        }
    }

    /// Returns true between [`Set::begin_bulk`] and [`Set::end_bulk`].
    #[inline]
    #[must_use]
    pub fn in_bulk_mode(&self) -> bool {
        self.in_bulk
    }
}

impl<T> Set<T> {
    /// Values in ascending order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.values.as_slice()
    }

    /// Iterates in ascending order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.as_slice().iter()
    }
}

impl<T: Ord> Default for Set<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Set<T> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            in_bulk: self.in_bulk,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.iter()).finish()
    }
}

impl<T: Ord> FromIterator<T> for Set<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.begin_bulk();
        for value in iter {
            set.insert_bulk(value);
        }
        set.end_bulk();
        set
    }
}

impl<'a, T> IntoIterator for &'a Set<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
