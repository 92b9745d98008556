//! # String Atoms
//!
//! A [`StringAtom`] is a handle to a string interned in a per-thread table.
//! Creating one costs a hash and a lookup; comparing two atoms from the same
//! thread is a pointer compare.
//!
//! ## Threads
//!
//! Atoms may be sent to other threads. There they still read and compare
//! correctly (content compare across tables), and cloning one re-interns it
//! into the receiving thread's table so later compares are fast again.
//! Ordering is by content and agrees with `==` across threads.
//!
//! ```rust,ignore
//! let a = StringAtom::new("diffuse");
//! let b = StringAtom::from("diffuse");
//! assert!(a.ptr_eq(&b));
//! assert_eq!(a, "diffuse");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::buffer::{AtomBuffer, AtomEntry};
use crate::table;

#[derive(Clone)]
struct Interned {
    entry: AtomEntry,
    // Keeps the entry's storage alive past its table.
    _buffer: Arc<AtomBuffer>,
}

impl Interned {
    fn in_local_table(value: &str) -> Self {
        table::with_local(|table| Self {
            entry: table.intern(value),
            _buffer: Arc::clone(table.buffer()),
        })
    }

    fn try_in_local_table(value: &str) -> Option<Self> {
        table::try_with_local(|table| Self {
            entry: table.intern(value),
            _buffer: Arc::clone(table.buffer()),
        })
    }
}

/// Interned, immutable string.
///
/// The default atom is invalid and reads as `""`.
#[derive(Default)]
pub struct StringAtom {
    data: Option<Interned>,
}

impl StringAtom {
    /// The invalid atom.
    #[inline]
    #[must_use]
    pub const fn invalid() -> Self {
        Self { data: None }
    }

    /// Interns `value` in this thread's table. An empty string gives the
    /// invalid atom.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread-local destructor after the thread's
    /// table has been dropped.
    #[must_use]
    pub fn new(value: &str) -> Self {
        if value.is_empty() {
            return Self::invalid();
        }
        Self {
            data: Some(Interned::in_local_table(value)),
        }
    }

    /// The interned text, `""` for the invalid atom.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.data.as_ref().map_or("", |data| data.entry.as_str())
    }

    /// The interned bytes including the trailing nul.
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.data
            .as_ref()
            .map_or(b"\0", |data| data.entry.as_bytes_with_nul())
    }

    /// Byte length.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.entry.len())
    }

    /// Returns true if the atom holds a string.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }

    /// Returns true if the atom holds no string. Interned strings are never
    /// empty, so this is `!is_valid()`.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Makes the atom invalid.
    pub fn clear(&mut self) {
        self.data = None;
    }

    /// Copies the text into a new `String`.
    #[must_use]
    pub fn to_owned_string(&self) -> String {
        self.as_str().to_owned()
    }

    /// The string's one-at-a-time hash, 0 for the invalid atom.
    #[inline]
    #[must_use]
    pub fn hash_value(&self) -> u32 {
        self.data.as_ref().map_or(0, |data| data.entry.hash())
    }

    /// Returns true if both atoms refer to the same table entry (or are both
    /// invalid).
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    /// Returns true if the atom is invalid or belongs to this thread's table.
    #[must_use]
    pub fn is_local(&self) -> bool {
        match &self.data {
            Some(data) => table::local_table_id() == Some(data.entry.table_id()),
            None => true,
        }
    }

    /// An equal atom owned by this thread's table.
    ///
    /// Local atoms are copied as is. During thread teardown, when the local
    /// table is gone, the atom is copied without re-interning.
    #[must_use]
    pub fn localize(&self) -> Self {
        match &self.data {
            Some(data) if !self.is_local() => {
                let text = data.entry.as_str();
                let data = Interned::try_in_local_table(text).unwrap_or_else(|| data.clone());
                Self { data: Some(data) }
            }
            _ => Self {
                data: self.data.clone(),
            },
        }
    }

    /// Distinct strings interned by this thread so far.
    #[must_use]
    pub fn local_count() -> usize {
        table::try_with_local(|table| table.len()).unwrap_or(0)
    }

    #[inline]
    fn addr(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.entry.addr())
    }
}

impl Clone for StringAtom {
    /// Copies a local atom; re-interns an atom from another thread.
    fn clone(&self) -> Self {
        self.localize()
    }
}

impl PartialEq for StringAtom {
    fn eq(&self, other: &Self) -> bool {
        match (&self.data, &other.data) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                if a.entry.addr() == b.entry.addr() {
                    true
                } else if a.entry.table_id() == b.entry.table_id() {
                    // One table never holds the same text twice.
                    false
                } else {
                    a.entry.hash() == b.entry.hash() && a.entry.as_str() == b.entry.as_str()
                }
            }
            _ => false,
        }
    }
}

impl Eq for StringAtom {}

impl PartialEq<str> for StringAtom {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for StringAtom {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<StringAtom> for &str {
    fn eq(&self, other: &StringAtom) -> bool {
        *self == other.as_str()
    }
}

impl PartialOrd for StringAtom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StringAtom {
    /// Orders by content, so atoms from different tables sort consistently
    /// with `==`. The same entry short-circuits to `Equal`.
    fn cmp(&self, other: &Self) -> Ordering {
        if self.ptr_eq(other) {
            return Ordering::Equal;
        }
        self.as_str().cmp(other.as_str())
    }
}

impl Hash for StringAtom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash_value());
    }
}

impl From<&str> for StringAtom {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&String> for StringAtom {
    fn from(value: &String) -> Self {
        Self::new(value)
    }
}

impl From<String> for StringAtom {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl AsRef<str> for StringAtom {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StringAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StringAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "StringAtom({:?})", self.as_str())
        } else {
            f.write_str("StringAtom(invalid)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_same_text_same_entry() {
        let a = StringAtom::new("albedo");
        let b = StringAtom::from("albedo");
        let c = StringAtom::from(&String::from("albedo"));
        assert!(a.ptr_eq(&b));
        assert!(a.ptr_eq(&c));
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn test_different_text_not_equal() {
        let a = StringAtom::new("normal");
        let b = StringAtom::new("normals");
        assert_ne!(a, b);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_empty_is_invalid() {
        let atom = StringAtom::new("");
        assert!(!atom.is_valid());
        assert!(atom.is_empty());
        assert_eq!(atom.as_str(), "");
        assert_eq!(atom.len(), 0);
        assert_eq!(atom, StringAtom::default());
        assert_eq!(atom, "");
        assert_eq!(atom.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn test_valid_vs_invalid() {
        let atom = StringAtom::new("x");
        assert_ne!(atom, StringAtom::invalid());
        assert_ne!(StringAtom::invalid(), atom);
    }

    #[test]
    fn test_compare_with_str() {
        let atom = StringAtom::new("roughness");
        assert_eq!(atom, "roughness");
        assert!("roughness" == atom);
        assert!(atom != "rough");
        assert_eq!(atom.to_owned_string(), "roughness");
        assert_eq!(atom.to_string(), "roughness");
        assert_eq!(atom.as_bytes_with_nul(), b"roughness\0");
    }

    #[test]
    fn test_clear() {
        let mut atom = StringAtom::new("metallic");
        atom.clear();
        assert!(!atom.is_valid());
        assert_eq!(atom.as_str(), "");
    }

    #[test]
    fn test_local_clone_is_identity() {
        let atom = StringAtom::new("emissive");
        let copy = atom.clone();
        assert!(atom.ptr_eq(&copy));
        assert!(copy.is_local());
    }

    #[test]
    fn test_ordering_is_content_order() {
        let mut atoms: Vec<StringAtom> = ["c", "a", "b", "a"].into_iter().map(StringAtom::new).collect();
        atoms.push(StringAtom::invalid());
        atoms.sort();
        atoms.dedup();
        let texts: Vec<&str> = atoms.iter().map(StringAtom::as_str).collect();
        assert_eq!(texts, ["", "a", "b", "c"]);
    }

    #[test]
    fn test_ordering_agrees_with_equality_across_threads() {
        let here = StringAtom::new("lightmap");
        let there = std::thread::spawn(|| StringAtom::new("lightmap"))
            .join()
            .unwrap();
        assert_eq!(here, there);
        assert!(!here.ptr_eq(&there));
        assert_eq!(here.cmp(&there), Ordering::Equal);

        let mut set = std::collections::BTreeSet::new();
        set.insert(here);
        assert!(!set.insert(there));
        assert!(set.contains(&StringAtom::new("lightmap")));
    }

    #[test]
    fn test_local_count_grows_once_per_text() {
        let before = StringAtom::local_count();
        let _a = StringAtom::new("test_local_count_grows_once_per_text");
        let _b = StringAtom::new("test_local_count_grows_once_per_text");
        assert_eq!(StringAtom::local_count(), before + 1);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", StringAtom::new("uv")), "StringAtom(\"uv\")");
        assert_eq!(format!("{:?}", StringAtom::invalid()), "StringAtom(invalid)");
    }

    proptest! {
        #[test]
        fn prop_interning_round_trips(text in "\\PC{1,64}") {
            let atom = StringAtom::new(&text);
            prop_assert_eq!(atom.as_str(), text.as_str());
            prop_assert!(atom.ptr_eq(&StringAtom::new(&text)));
            prop_assert_eq!(atom.hash_value(), crate::hash::hash_str(&text));
        }
    }
}
