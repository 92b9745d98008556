//! # Array Map
//!
//! Keyed lookup over values that stay in insertion order. Keys live in a
//! sorted [`Dictionary`] mapping to value positions; values live in their
//! own [`Array`] and only move on erase.

use std::fmt;
use std::ops::{Index, IndexMut};

use super::array::Array;
use super::dictionary::Dictionary;
use crate::error::CoreResult;

/// Map whose values are stored, and iterated, in insertion order.
pub struct ArrayMap<K, V> {
    slots: Dictionary<K, usize>,
    keys: Array<K>,
    values: Array<V>,
}

impl<K: Ord + Clone, V> ArrayMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Dictionary::new(),
            keys: Array::new(),
            values: Array::new(),
        }
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the map is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.keys.clear();
        self.values.clear();
    }

    /// Appends a value under a new key.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already present.
    pub fn insert(&mut self, key: K, value: V) {
        if let Err(err) = self.try_insert(key, value) {
            panic!("ArrayMap::insert: {err}");
        }
    }

    /// Appends a value under a new key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`] if `key` is present; the map is
    /// left unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> CoreResult<()> {
        self.slots.try_insert(key.clone(), self.values.len())?;
        self.keys.add(key);
        self.values.add(value);
        Ok(())
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains(key)
    }

    /// Insertion position of the value under `key`.
    #[must_use]
    pub fn value_index(&self, key: &K) -> Option<usize> {
        self.slots.find(key).copied()
    }

    /// Value under `key`.
    #[must_use]
    pub fn find(&self, key: &K) -> Option<&V> {
        self.value_index(key).map(|i| &self.values[i])
    }

    /// Value under `key`, mutably.
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.value_index(key)?;
        Some(&mut self.values[index])
    }

    /// Value at insertion position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn value_at_index(&self, index: usize) -> &V {
        &self.values[index]
    }

    /// Value at insertion position `index`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn value_at_index_mut(&mut self, index: usize) -> &mut V {
        &mut self.values[index]
    }

    /// Key of the value at insertion position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn key_at_index(&self, index: usize) -> &K {
        &self.keys[index]
    }

    /// Removes the entry under `key`, keeping the order of the others.
    /// Every later value shifts down one position.
    pub fn erase(&mut self, key: &K) -> Option<V> {
        let index = self.slots.erase(key)?;
        for slot in self.slots.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        self.keys.erase(index);
        Some(self.values.erase(index))
    }

    /// Removes the entry under `key`, moving the last value into its place.
    pub fn erase_swap(&mut self, key: &K) -> Option<V> {
        let index = self.slots.erase(key)?;
        self.keys.erase_swap_back(index);
        let value = self.values.erase_swap_back(index);
        if index < self.keys.len() {
            let moved = &self.keys[index];
            if let Some(slot) = self.slots.find_mut(moved) {
                *slot = index;
            }
        }
        Some(value)
    }

    /// Values in insertion order.
    pub fn values(&self) -> std::slice::Iter<'_, V> {
        self.values.iter()
    }

    /// Values in insertion order, mutably.
    pub fn values_mut(&mut self) -> std::slice::IterMut<'_, V> {
        self.values.iter_mut()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.keys.iter().zip(self.values.iter())
    }
}

impl<K: Ord + Clone, V> Default for ArrayMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> Index<&K> for ArrayMap<K, V> {
    type Output = V;

    /// # Panics
    ///
    /// Panics if `key` is absent.
    fn index(&self, key: &K) -> &V {
        match self.find(key) {
            Some(value) => value,
            None => panic!("ArrayMap: key not found"),
        }
    }
}

impl<K: Ord + Clone, V> IndexMut<&K> for ArrayMap<K, V> {
    fn index_mut(&mut self, key: &K) -> &mut V {
        match self.find_mut(key) {
            Some(value) => value,
            None => panic!("ArrayMap: key not found"),
        }
    }
}

impl<K: Clone, V: Clone> Clone for ArrayMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            keys: self.keys.clone(),
            values: self.values.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ArrayMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.keys.iter().zip(self.values.iter())).finish()
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for ArrayMap<K, V> {
    /// # Panics
    ///
    /// Panics on a duplicate key.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn sample() -> ArrayMap<&'static str, u32> {
        [("delta", 4), ("alpha", 1), ("charlie", 3), ("bravo", 2)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_values_keep_insertion_order() {
        let map = sample();
        assert_eq!(map.len(), 4);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), [4, 1, 3, 2]);
        assert_eq!(map[&"charlie"], 3);
        assert_eq!(map.value_index(&"alpha"), Some(1));
        assert_eq!(*map.key_at_index(0), "delta");
        assert!(map.find(&"echo").is_none());
    }

    #[test]
    fn test_duplicate_insert_leaves_map_unchanged() {
        let mut map = sample();
        assert!(matches!(map.try_insert("alpha", 9), Err(CoreError::DuplicateKey)));
        assert_eq!(map.len(), 4);
        assert_eq!(map[&"alpha"], 1);
    }

    #[test]
    fn test_erase_shifts_later_values() {
        let mut map = sample();
        assert_eq!(map.erase(&"alpha"), Some(1));
        assert_eq!(map.erase(&"alpha"), None);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), [4, 3, 2]);
        assert_eq!(map.value_index(&"bravo"), Some(2));
        assert_eq!(map[&"bravo"], 2);
    }

    #[test]
    fn test_erase_swap_relinks_moved_value() {
        let mut map = sample();
        assert_eq!(map.erase_swap(&"delta"), Some(4));
        assert_eq!(map.values().copied().collect::<Vec<_>>(), [2, 1, 3]);
        assert_eq!(map.value_index(&"bravo"), Some(0));
        assert_eq!(map[&"bravo"], 2);

        assert_eq!(map.erase_swap(&"charlie"), Some(3));
        assert_eq!(map.iter().map(|(k, _)| *k).collect::<Vec<_>>(), ["bravo", "alpha"]);
        map[&"alpha"] += 10;
        assert_eq!(*map.value_at_index(1), 11);
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_missing_key_index_panics() {
        let map = sample();
        let _value: u32 = map[&"echo"];
    }
}
