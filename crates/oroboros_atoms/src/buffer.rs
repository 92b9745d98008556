//! # Atom Buffer
//!
//! Append-only storage for interned strings. Each entry is a 16-byte header
//! followed by the nul-terminated UTF-8 bytes:
//!
//! ```text
//! [ table_id : u64 ][ hash : u32 ][ len : u32 ][ bytes ... ][ 0 ][ pad to 16 ]
//! ```
//!
//! Entries never move and are only freed when the buffer itself is dropped.

// SAFETY: Entries are raw pointers into arena chunks owned by the buffer.
#![allow(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::ptr::{self, NonNull};

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;

use oroboros_core::config::ATOM_CHUNK_SIZE;
use oroboros_core::Arena;

/// Header written in front of every interned string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub(crate) struct AtomHeader {
    /// Id of the table that interned the string.
    pub table_id: u64,
    /// One-at-a-time hash of the bytes.
    pub hash: u32,
    /// Byte length, excluding the terminator.
    pub len: u32,
}

pub(crate) const HEADER_SIZE: usize = std::mem::size_of::<AtomHeader>();

const _: () = assert!(HEADER_SIZE == 16);

/// Arena-backed string storage owned by one atom table.
///
/// Only the owning table appends; the lock is never contended. Atoms keep
/// the buffer alive through an `Arc`, so entries outlive the table.
pub(crate) struct AtomBuffer {
    arena: Mutex<Arena>,
}

impl AtomBuffer {
    pub(crate) fn new() -> Self {
        Self {
            arena: Mutex::new(Arena::new(ATOM_CHUNK_SIZE, HEADER_SIZE)),
        }
    }

    /// Copies `value` into the buffer and returns its entry.
    ///
    /// # Panics
    ///
    /// Panics if `value` is longer than `u32::MAX` bytes.
    pub(crate) fn add_string(&self, table_id: u64, hash: u32, value: &str) -> AtomEntry {
        let len = match u32::try_from(value.len()) {
            Ok(len) => len,
            Err(_) => panic!("atom string of {} bytes is too long", value.len()),
        };
        let header = AtomHeader {
            table_id,
            hash,
            len,
        };
        let base = self.arena.lock().alloc(HEADER_SIZE + value.len() + 1);
        // SAFETY: the arena handed out HEADER_SIZE + len + 1 writable bytes,
        // aligned to HEADER_SIZE.
        unsafe {
            let header_bytes = bytemuck::bytes_of(&header);
            ptr::copy_nonoverlapping(header_bytes.as_ptr(), base.as_ptr(), HEADER_SIZE);
            let text = base.as_ptr().add(HEADER_SIZE);
            ptr::copy_nonoverlapping(value.as_ptr(), text, value.len());
            text.add(value.len()).write(0);
        }
        AtomEntry {
            header: base.cast(),
        }
    }

    #[cfg(test)]
    pub(crate) fn chunk_count(&self) -> usize {
        self.arena.lock().chunk_count()
    }
}

/// Pointer to one entry in an [`AtomBuffer`].
///
/// Carries no lifetime: holders must keep the buffer alive.
#[derive(Clone, Copy)]
pub(crate) struct AtomEntry {
    header: NonNull<AtomHeader>,
}

// SAFETY: entries are immutable once written.
unsafe impl Send for AtomEntry {}
// SAFETY: as above.
unsafe impl Sync for AtomEntry {}

impl AtomEntry {
    #[inline]
    pub(crate) fn header(&self) -> &AtomHeader {
        // SAFETY: written by add_string, alive while the buffer is.
        unsafe { self.header.as_ref() }
    }

    #[inline]
    pub(crate) fn table_id(&self) -> u64 {
        self.header().table_id
    }

    #[inline]
    pub(crate) fn hash(&self) -> u32 {
        self.header().hash
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.header().len as usize
    }

    #[inline]
    pub(crate) fn addr(&self) -> usize {
        self.header.as_ptr() as usize
    }

    pub(crate) fn as_str(&self) -> &str {
        // SAFETY: `len` bytes copied from a &str follow the header.
        unsafe {
            let text = self.header.as_ptr().cast::<u8>().add(HEADER_SIZE);
            std::str::from_utf8_unchecked(std::slice::from_raw_parts(text, self.len()))
        }
    }

    /// Terminated bytes, for handing to C-string consumers.
    pub(crate) fn as_bytes_with_nul(&self) -> &[u8] {
        // SAFETY: add_string wrote the terminator after the text.
        unsafe {
            let text = self.header.as_ptr().cast::<u8>().add(HEADER_SIZE);
            std::slice::from_raw_parts(text, self.len() + 1)
        }
    }
}

impl fmt::Debug for AtomEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomEntry")
            .field("table_id", &self.table_id())
            .field("text", &self.as_str())
            .finish()
    }
}

// Content order; the table's buckets sort by it.
impl PartialEq for AtomEntry {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for AtomEntry {}

impl PartialOrd for AtomEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AtomEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}
