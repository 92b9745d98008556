//! # Chunk Arena
//!
//! Append-only bump allocator over a growing list of fixed-size chunks.
//!
//! Addresses handed out stay valid until the arena is dropped: chunks are
//! never moved, reused or freed individually. Requests larger than the chunk
//! size get a dedicated chunk of their own.

// SAFETY: Chunks are raw allocations owned by the arena and freed in Drop.
#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::NonNull;

use super::raw;
use crate::containers::Array;

struct Chunk {
    base: NonNull<u8>,
    layout: Layout,
}

/// A bump-pointer arena with stable addresses.
///
/// # Thread Safety
///
/// Allocation needs `&mut self`. Share the arena between threads only behind
/// your own synchronization.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = Arena::new(16 * 1024, 16);
/// let bytes = arena.alloc(100); // 16-aligned, uninitialized
/// ```
pub struct Arena {
    chunks: Array<Chunk>,
    /// Chunk receiving regular allocations.
    current: Option<usize>,
    /// Write offset inside the current chunk.
    cursor: usize,
    chunk_size: usize,
    align: usize,
    used: usize,
}

// SAFETY: the arena exclusively owns its chunks.
unsafe impl Send for Arena {}
// SAFETY: `&Arena` exposes only counters.
unsafe impl Sync for Arena {}

impl Arena {
    /// Creates an empty arena. No memory is reserved until the first
    /// allocation.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - Bytes per regular chunk
    /// * `align` - Alignment of every allocation (a power of two)
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two or `chunk_size` is zero.
    #[must_use]
    pub fn new(chunk_size: usize, align: usize) -> Self {
        assert!(align.is_power_of_two(), "Arena align must be a power of two");
        assert!(chunk_size > 0, "Arena chunk size must be non-zero");
        Self {
            chunks: Array::new(),
            current: None,
            cursor: 0,
            chunk_size: raw::round_up(chunk_size, align),
            align,
            used: 0,
        }
    }

    /// Bytes per regular chunk.
    #[inline]
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks allocated, including dedicated ones.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Bytes handed out so far, before alignment padding.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Bytes left in the current chunk.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        match self.current {
            Some(_) => self.chunk_size - self.cursor,
            None => 0,
        }
    }

    /// Allocates `size` uninitialized bytes aligned to the arena alignment.
    ///
    /// The returned memory lives as long as the arena.
    pub fn alloc(&mut self, size: usize) -> NonNull<u8> {
        self.used += size;
        if size > self.chunk_size {
            let index = self.push_chunk(raw::round_up(size, self.align));
            return self.chunks[index].base;
        }
        let index = match self.current {
            Some(index) if self.chunk_size - self.cursor >= size => index,
            _ => {
                let index = self.push_chunk(self.chunk_size);
                self.current = Some(index);
                self.cursor = 0;
                index
            }
        };
        let base = self.chunks[index].base;
        // SAFETY: cursor + size <= chunk_size.
        let ptr = unsafe { NonNull::new_unchecked(base.as_ptr().add(self.cursor)) };
        self.cursor = raw::round_up(self.cursor + size, self.align).min(self.chunk_size);
        ptr
    }

    fn push_chunk(&mut self, size: usize) -> usize {
        let layout = match Layout::from_size_align(size, self.align) {
            Ok(layout) => layout,
            Err(_) => panic!("Arena chunk of {size} bytes is too large"),
        };
        let base = raw::alloc(layout);
        tracing::trace!("arena chunk {} allocated: {} bytes", self.chunks.len(), size);
        self.chunks.add(Chunk { base, layout });
        self.chunks.len() - 1
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        for chunk in self.chunks.iter() {
            // SAFETY: allocated in push_chunk with this layout.
            unsafe { raw::free(chunk.base, chunk.layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_allocation_is_aligned() {
        let mut arena = Arena::new(1024, 16);
        let a = arena.alloc(3);
        let b = arena.alloc(20);
        assert!(raw::is_aligned(a.as_ptr() as usize, 16));
        assert!(raw::is_aligned(b.as_ptr() as usize, 16));
        assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 16);
        assert_eq!(arena.used(), 23);
        assert_eq!(arena.chunk_count(), 1);
    }

    #[test]
    fn test_arena_starts_new_chunk_when_full() {
        let mut arena = Arena::new(64, 16);
        let first = arena.alloc(48);
        assert_eq!(arena.remaining(), 16);
        let second = arena.alloc(32);
        assert_eq!(arena.chunk_count(), 2);
        // SAFETY: both regions are writable and live as long as the arena.
        unsafe {
            first.as_ptr().write_bytes(1, 48);
            second.as_ptr().write_bytes(2, 32);
            assert_eq!(*first.as_ptr(), 1);
        }
    }

    #[test]
    fn test_arena_oversized_gets_dedicated_chunk() {
        let mut arena = Arena::new(64, 16);
        let small = arena.alloc(8);
        let big = arena.alloc(1000);
        let next = arena.alloc(8);
        assert_eq!(arena.chunk_count(), 2);
        // The regular chunk keeps filling after the dedicated one.
        assert_eq!(next.as_ptr() as usize - small.as_ptr() as usize, 16);
        assert_ne!(big, small);
    }

    #[test]
    fn test_arena_lazy() {
        let arena = Arena::new(128, 8);
        assert_eq!(arena.chunk_count(), 0);
        assert_eq!(arena.remaining(), 0);
        assert_eq!(arena.chunk_size(), 128);
    }
}
