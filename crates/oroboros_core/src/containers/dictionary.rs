//! # Dictionary
//!
//! Sorted key/value map backed by an [`Array`] of [`KeyValuePair`]s.
//! Supports the same bulk mode as [`Set`](super::Set), and by-index access
//! for walking entries in key order without repeated lookups.

use std::fmt;
use std::ops::{Index, IndexMut};

use super::array::Array;
use super::key_value::KeyValuePair;
use crate::config::AllocStrategy;
use crate::error::{CoreError, CoreResult};

/// Ordered map with unique keys.
pub struct Dictionary<K, V> {
    entries: Array<KeyValuePair<K, V>>,
    in_bulk: bool,
}

impl<K: Ord, V> Dictionary<K, V> {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_strategy(AllocStrategy::default())
    }

    /// Creates an empty dictionary growing by the given strategy.
    #[must_use]
    pub fn with_strategy(strategy: AllocStrategy) -> Self {
        Self {
            entries: Array::with_strategy(strategy),
            in_bulk: false,
        }
    }

    /// Replaces the growth bounds of the backing array.
    pub fn set_alloc_strategy(&mut self, min_grow: usize, max_grow: usize) {
        self.entries.set_alloc_strategy(min_grow, max_grow);
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allocated slots of the backing array.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Makes room for `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    /// Shrinks the backing array to the number of entries.
    pub fn trim(&mut self) {
        self.entries.trim();
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn lower_bound(&self, key: &K) -> usize {
        assert!(!self.in_bulk, "Dictionary lookup in bulk mode");
        self.entries.partition_point(|e| e.key < *key)
    }

    /// Inserts a new entry.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already present.
    pub fn insert(&mut self, key: K, value: V) {
        if let Err(err) = self.try_insert(key, value) {
            panic!("Dictionary::insert: {err}");
        }
    }

    /// Inserts a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`] if `key` is present; the entry is
    /// dropped and the dictionary left unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> CoreResult<()> {
        let index = self.lower_bound(&key);
        if index < self.len() && self.entries[index].key == key {
            return Err(CoreError::DuplicateKey);
        }
        self.entries.insert(index, KeyValuePair::new(key, value));
        Ok(())
    }

    /// Inserts the entry unless `key` is present. Returns true if inserted.
    pub fn add_unique(&mut self, key: K, value: V) -> bool {
        self.try_insert(key, value).is_ok()
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.find_index(key).is_some()
    }

    /// Sorted position of `key`.
    #[must_use]
    pub fn find_index(&self, key: &K) -> Option<usize> {
        let index = self.lower_bound(key);
        (index < self.len() && self.entries[index].key == *key).then_some(index)
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn find(&self, key: &K) -> Option<&V> {
        self.find_index(key).map(|i| &self.entries[i].value)
    }

    /// Value stored under `key`, mutably.
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.find_index(key)?;
        Some(&mut self.entries[index].value)
    }

    /// Removes the entry under `key` and returns its value.
    pub fn erase(&mut self, key: &K) -> Option<V> {
        let index = self.find_index(key)?;
        Some(self.entries.erase(index).value)
    }

    /// Removes the entry at sorted position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase_index(&mut self, index: usize) -> KeyValuePair<K, V> {
        self.entries.erase(index)
    }

    /// Key at sorted position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn key_at_index(&self, index: usize) -> &K {
        &self.entries[index].key
    }

    /// Value at sorted position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn value_at_index(&self, index: usize) -> &V {
        &self.entries[index].value
    }

    /// Value at sorted position `index`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn value_at_index_mut(&mut self, index: usize) -> &mut V {
        &mut self.entries[index].value
    }

    /// Enters bulk mode.
    ///
    /// # Panics
    ///
    /// Panics if already in bulk mode.
    pub fn begin_bulk(&mut self) {
        assert!(!self.in_bulk, "Dictionary::begin_bulk: already in bulk mode");
        self.in_bulk = true;
    }

    /// Appends an entry without sorting.
    ///
    /// # Panics
    ///
    /// Panics outside bulk mode.
    pub fn insert_bulk(&mut self, key: K, value: V) {
        assert!(self.in_bulk, "Dictionary::insert_bulk outside bulk mode");
        let entry = KeyValuePair::new(key, value);
        if self.entries.front_spare() > self.entries.back_spare() {
            self.entries.insert(0, entry);
        } else {
            self.entries.add(entry);
        }
    }

    /// Leaves bulk mode and sorts the entries once.
    ///
    /// # Panics
    ///
    /// Panics outside bulk mode or if a key was inserted twice.
    pub fn end_bulk(&mut self) {
        assert!(self.in_bulk, "Dictionary::end_bulk outside bulk mode");
        self.in_bulk = false;
        self.entries.sort_unstable();
        if self.entries.windows(2).any(|w| w[0].key == w[1].key) {
            panic!("Dictionary::end_bulk: {}", CoreError::DuplicateKey);
        }
    }
}

impl<K, V> Dictionary<K, V> {
    /// Iterates entries in key order.
    pub fn iter(&self) -> std::slice::Iter<'_, KeyValuePair<K, V>> {
        self.entries.as_slice().iter()
    }

    /// Iterates keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(KeyValuePair::key)
    }

    /// Iterates values in key order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(KeyValuePair::value)
    }

    /// Iterates values in key order, mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.entries.as_mut_slice().iter_mut().map(KeyValuePair::value_mut)
    }
}

impl<K: Ord, V> Index<&K> for Dictionary<K, V> {
    type Output = V;

    /// # Panics
    ///
    /// Panics if `key` is missing.
    fn index(&self, key: &K) -> &V {
        match self.find(key) {
            Some(value) => value,
            None => panic!("Dictionary: key not found"),
        }
    }
}

impl<K: Ord, V> IndexMut<&K> for Dictionary<K, V> {
    fn index_mut(&mut self, key: &K) -> &mut V {
        match self.find_mut(key) {
            Some(value) => value,
            None => panic!("Dictionary: key not found"),
        }
    }
}

impl<K: Ord, V> Default for Dictionary<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for Dictionary<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            in_bulk: self.in_bulk,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Dictionary<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter().map(|e| (&e.key, &e.value))).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for Dictionary<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Self::new();
        dict.begin_bulk();
        for (key, value) in iter {
            dict.insert_bulk(key, value);
        }
        dict.end_bulk();
        dict
    }
}

impl<'a, K, V> IntoIterator for &'a Dictionary<K, V> {
    type Item = &'a KeyValuePair<K, V>;
    type IntoIter = std::slice::Iter<'a, KeyValuePair<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
