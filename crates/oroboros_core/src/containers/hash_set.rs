//! # Hash Set
//!
//! `N` sorted [`Set`] buckets selected by `hash(value) % N`.
//!
//! Each bucket is a small sorted array, so there is no collision chain to
//! allocate and a lookup is one hash plus a short binary search.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use super::set::Set;
use crate::error::CoreResult;

/// Hash function used to pick a [`HashSet`] bucket.
pub trait SetHasher<T: ?Sized> {
    /// Hashes `value` to 32 bits.
    fn hash(value: &T) -> u32;
}

/// Fixed-bucket hash set of unique values.
pub struct HashSet<T, H, const N: usize> {
    buckets: Box<[Set<T>]>,
    size: usize,
    _hasher: PhantomData<fn() -> H>,
}

impl<T: Ord, H: SetHasher<T>, const N: usize> HashSet<T, H, N> {
    /// Creates an empty set with `N` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `N` is zero.
    #[must_use]
    pub fn new() -> Self {
        assert!(N > 0, "HashSet needs at least one bucket");
        Self {
            buckets: (0..N).map(|_| Set::new()).collect(),
            size: 0,
            _hasher: PhantomData,
        }
    }

    /// Applies a growth strategy to every bucket.
    pub fn set_alloc_strategy(&mut self, min_grow: usize, max_grow: usize) {
        for bucket in self.buckets.iter_mut() {
            bucket.set_alloc_strategy(min_grow, max_grow);
        }
    }

    /// Number of values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the set is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of buckets.
    #[inline]
    #[must_use]
    pub const fn bucket_count(&self) -> usize {
        N
    }

    #[inline]
    fn bucket_index(hash: u32) -> usize {
        hash as usize % N
    }

    #[inline]
    fn bucket(&self, value: &T) -> &Set<T> {
        &self.buckets[Self::bucket_index(H::hash(value))]
    }

    /// Inserts a value.
    ///
    /// # Panics
    ///
    /// Panics if an equal value is already present.
    pub fn insert(&mut self, value: T) {
        let index = Self::bucket_index(H::hash(&value));
        self.buckets[index].insert(value);
        self.size += 1;
    }

    /// Inserts a value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`](crate::CoreError::DuplicateKey) if
    /// an equal value is present.
    pub fn try_insert(&mut self, value: T) -> CoreResult<()> {
        let index = Self::bucket_index(H::hash(&value));
        self.buckets[index].try_insert(value)?;
        self.size += 1;
        Ok(())
    }

    /// Removes a value. Returns false if it was absent.
    ///
    /// # Panics
    ///
    /// Panics if the set is empty.
    pub fn erase(&mut self, value: &T) -> bool {
        assert!(self.size > 0, "HashSet::erase on empty set");
        let index = Self::bucket_index(H::hash(value));
        let removed = self.buckets[index].erase(value);
        if removed {
            self.size -= 1;
        }
        removed
    }

    /// Returns true if an equal value is present.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.bucket(value).contains(value)
    }

    /// Returns the stored value equal to `value`.
    #[must_use]
    pub fn find(&self, value: &T) -> Option<&T> {
        self.bucket(value).find(value)
    }

    /// Looks up a value by a precomputed hash and a comparator, without
    /// building a `T` to search for.
    pub fn find_by_hash(&self, hash: u32, cmp: impl FnMut(&T) -> Ordering) -> Option<&T> {
        self.buckets[Self::bucket_index(hash)].find_by(cmp)
    }

    /// Drops every value, keeping bucket storage.
    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
        self.size = 0;
    }
}

impl<T, H, const N: usize> HashSet<T, H, N> {
    /// Iterates bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.buckets.iter().flat_map(Set::iter)
    }
}

impl<T: Ord, H: SetHasher<T>, const N: usize> Default for HashSet<T, H, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, H, const N: usize> Clone for HashSet<T, H, N> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            size: self.size,
            _hasher: PhantomData,
        }
    }
}

impl<T: fmt::Debug, H, const N: usize> fmt::Debug for HashSet<T, H, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    struct Identity;

    impl SetHasher<u32> for Identity {
        fn hash(value: &u32) -> u32 {
            *value
        }
    }

    struct Len;

    impl SetHasher<String> for Len {
        fn hash(value: &String) -> u32 {
            value.len() as u32
        }
    }

    #[test]
    fn test_insert_contains_len() {
        let mut s: HashSet<u32, Identity, 8> = HashSet::new();
        for v in [1, 9, 17, 4, 100] {
            s.insert(v);
        }
        assert_eq!(s.len(), 5);
        assert!(s.contains(&17));
        assert!(!s.contains(&25));
        assert_eq!(s.find(&9), Some(&9));
        assert_eq!(s.bucket_count(), 8);
    }

    #[test]
    fn test_size_matches_bucket_sum() {
        let mut s: HashSet<u32, Identity, 4> = HashSet::new();
        for v in 0..50 {
            s.insert(v * 3);
        }
        assert!(s.erase(&9));
        assert!(!s.erase(&10));
        assert_eq!(s.len(), 49);
        assert_eq!(s.iter().count(), 49);
    }

    #[test]
    #[should_panic(expected = "duplicate key")]
    fn test_duplicate_panics() {
        let mut s: HashSet<u32, Identity, 8> = HashSet::new();
        s.insert(3);
        s.insert(3);
    }

    #[test]
    fn test_try_insert_keeps_size() {
        let mut s: HashSet<u32, Identity, 8> = HashSet::new();
        s.try_insert(3).unwrap();
        assert_eq!(s.try_insert(3), Err(CoreError::DuplicateKey));
        assert_eq!(s.len(), 1);
    }

    #[test]
    #[should_panic(expected = "erase on empty set")]
    fn test_erase_empty_panics() {
        let mut s: HashSet<u32, Identity, 8> = HashSet::new();
        s.erase(&1);
    }

    #[test]
    fn test_find_by_hash() {
        let mut s: HashSet<String, Len, 16> = HashSet::new();
        s.insert("abc".to_string());
        s.insert("xyz".to_string());
        s.insert("hello".to_string());
        let hit = s.find_by_hash(3, |e| e.as_str().cmp("xyz"));
        assert_eq!(hit.map(String::as_str), Some("xyz"));
        assert!(s.find_by_hash(5, |e| e.as_str().cmp("world")).is_none());
    }

    #[test]
    fn test_clear_and_strategy() {
        let mut s: HashSet<u32, Identity, 2> = HashSet::new();
        s.set_alloc_strategy(1, 2);
        for v in 0..10 {
            s.insert(v);
        }
        s.clear();
        assert!(s.is_empty());
        assert!(!s.contains(&3));
    }
}
