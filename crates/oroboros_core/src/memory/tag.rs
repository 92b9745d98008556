//! # Free-List Tags
//!
//! A [`Tag`] names a pool slot inside a single `u32` so the free-list head
//! fits one atomic word:
//!
//! ```text
//! [ generation : 16 ][ address : 16 ]
//!
//! growable pool, 256-slot puddles:  address = [ puddle : 8 ][ slot : 8 ]
//! fixed pool:                       address = [ slot : 16 ]
//! ```
//!
//! Every time a slot goes back on the free list its generation changes, so a
//! thread holding a stale head value fails its compare-and-swap even when the
//! same slot is on top of the list again (the ABA case).

use std::fmt;

/// Packed `[generation:16][address:16]` slot name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Tag(u32);

impl Tag {
    /// Sentinel marking an empty free list or an unlinked slot.
    pub const INVALID: Self = Self(u32::MAX);

    /// Packs a generation and a slot address.
    #[inline]
    #[must_use]
    pub const fn new(generation: u16, address: u16) -> Self {
        Self(((generation as u32) << 16) | address as u32)
    }

    /// Wraps raw bits loaded from an atomic.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits for storing in an atomic.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reuse counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Slot address inside the pool.
    #[inline]
    #[must_use]
    pub const fn address(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Returns false for [`Tag::INVALID`].
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Same address, new generation.
    ///
    /// The one combination that would spell [`Tag::INVALID`] (generation and
    /// address both `0xFFFF`) is skipped by wrapping the generation to zero.
    #[inline]
    #[must_use]
    pub const fn with_generation(self, generation: u16) -> Self {
        let tag = Self::new(generation, self.address());
        if tag.is_valid() {
            tag
        } else {
            Self::new(0, self.address())
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Tag(gen={}, addr={})", self.generation(), self.address())
        } else {
            f.write_str("Tag(INVALID)")
        }
    }
}
