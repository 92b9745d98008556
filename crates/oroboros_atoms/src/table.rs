//! # Atom Tables
//!
//! One table per OS thread, created on first use. A table maps string
//! content to the single entry holding it in the table's buffer.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use oroboros_core::config::ATOM_TABLE_BUCKETS;
use oroboros_core::{HashSet, SetHasher};

use crate::buffer::{AtomBuffer, AtomEntry};
use crate::hash::hash_str;

/// Table ids start at 1 and are never reused.
static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Buckets entries by the hash stored in their header.
pub(crate) struct AtomHasher;

impl SetHasher<AtomEntry> for AtomHasher {
    fn hash(value: &AtomEntry) -> u32 {
        value.hash()
    }
}

pub(crate) struct AtomTable {
    id: u64,
    // Dropped before `buffer`: entries point into its chunks.
    entries: HashSet<AtomEntry, AtomHasher, ATOM_TABLE_BUCKETS>,
    buffer: Arc<AtomBuffer>,
}

impl AtomTable {
    fn new() -> Self {
        let id = NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "atom table {} created on thread {:?}",
            id,
            std::thread::current().id()
        );
        Self {
            id,
            entries: HashSet::new(),
            buffer: Arc::new(AtomBuffer::new()),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Number of distinct strings interned.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn buffer(&self) -> &Arc<AtomBuffer> {
        &self.buffer
    }

    /// Entry holding `value`, if interned.
    pub(crate) fn find(&self, hash: u32, value: &str) -> Option<AtomEntry> {
        self.entries
            .find_by_hash(hash, |entry| entry.as_str().cmp(value))
            .copied()
    }

    /// Interns a string known to be absent.
    pub(crate) fn add(&mut self, hash: u32, value: &str) -> AtomEntry {
        debug_assert!(
            self.find(hash, value).is_none(),
            "AtomTable::add: {value:?} already interned"
        );
        let entry = self.buffer.add_string(self.id, hash, value);
        self.entries.insert(entry);
        entry
    }

    /// Finds or adds `value`.
    pub(crate) fn intern(&mut self, value: &str) -> AtomEntry {
        let hash = hash_str(value);
        match self.find(hash, value) {
            Some(entry) => entry,
            None => self.add(hash, value),
        }
    }
}

thread_local! {
    static LOCAL_TABLE: RefCell<AtomTable> = RefCell::new(AtomTable::new());
}

/// Runs `f` on this thread's table.
///
/// # Panics
///
/// Panics when called from a thread-local destructor after the table is gone.
pub(crate) fn with_local<R>(f: impl FnOnce(&mut AtomTable) -> R) -> R {
    LOCAL_TABLE.with(|table| f(&mut table.borrow_mut()))
}

/// Like [`with_local`], but returns `None` once the table has been torn down.
pub(crate) fn try_with_local<R>(f: impl FnOnce(&mut AtomTable) -> R) -> Option<R> {
    LOCAL_TABLE
        .try_with(|table| f(&mut table.borrow_mut()))
        .ok()
}

/// Id of this thread's table, `None` during thread teardown.
pub(crate) fn local_table_id() -> Option<u64> {
    try_with_local(|table| table.id())
}
