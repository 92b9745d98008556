//! # Raw Memory Facade
//!
//! Thin layer over the system allocator. Every container and allocator in
//! the engine gets its backing storage from here.
//!
//! Allocation failure is never reported to the caller: it aborts through
//! [`std::alloc::handle_alloc_error`]. Zero-sized requests never reach the
//! system allocator and return a dangling, well-aligned pointer.

// SAFETY: This module is the single place where engine storage is obtained
// from and returned to the system allocator.
#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Rounds `value` up to the next multiple of `align` (a power of two).
#[inline]
#[must_use]
pub const fn round_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Returns true if `addr` is a multiple of `align` (a power of two).
#[inline]
#[must_use]
pub const fn is_aligned(addr: usize, align: usize) -> bool {
    addr & (align - 1) == 0
}

/// Allocates uninitialized memory for `layout`.
#[must_use]
pub fn alloc(layout: Layout) -> NonNull<u8> {
    if layout.size() == 0 {
        // SAFETY: align is non-zero, so the pointer is non-null.
        return unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
    }
    // SAFETY: layout has a non-zero size.
    let ptr = unsafe { alloc::alloc(layout) };
    match NonNull::new(ptr) {
        Some(ptr) => ptr,
        None => alloc::handle_alloc_error(layout),
    }
}

/// Allocates zeroed memory for `layout`.
#[must_use]
pub fn alloc_zeroed(layout: Layout) -> NonNull<u8> {
    if layout.size() == 0 {
        return alloc(layout);
    }
    // SAFETY: layout has a non-zero size.
    let ptr = unsafe { alloc::alloc_zeroed(layout) };
    match NonNull::new(ptr) {
        Some(ptr) => ptr,
        None => alloc::handle_alloc_error(layout),
    }
}

/// Returns memory obtained from [`alloc`] or [`alloc_zeroed`].
///
/// # Safety
///
/// `ptr` must come from one of this module's allocation functions called
/// with the same `layout`, and must not be used afterwards.
pub unsafe fn free(ptr: NonNull<u8>, layout: Layout) {
    if layout.size() != 0 {
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}

/// Layout of `count` consecutive `T`.
///
/// # Panics
///
/// Panics if the total size overflows `isize`.
#[inline]
#[must_use]
pub fn array_layout<T>(count: usize) -> Layout {
    match Layout::array::<T>(count) {
        Ok(layout) => layout,
        Err(_) => panic!("capacity overflow: {count} elements"),
    }
}

/// Allocates uninitialized storage for `count` elements of `T`.
#[must_use]
pub fn alloc_array<T>(count: usize) -> NonNull<T> {
    let layout = array_layout::<T>(count);
    if layout.size() == 0 {
        return NonNull::dangling();
    }
    alloc(layout).cast()
}

/// Returns storage obtained from [`alloc_array`].
///
/// Element destructors are not run.
///
/// # Safety
///
/// `ptr` must come from `alloc_array::<T>(count)` with the same `count`.
pub unsafe fn free_array<T>(ptr: NonNull<T>, count: usize) {
    free(ptr.cast(), array_layout::<T>(count));
}

/// Copies `src` into the front of `dst` (regions must not overlap).
///
/// # Panics
///
/// Panics if `dst` is shorter than `src`.
#[inline]
pub fn copy(src: &[u8], dst: &mut [u8]) {
    dst[..src.len()].copy_from_slice(src);
}

/// Moves `len` bytes inside `buf` from `src` to `dst` (regions may overlap).
#[inline]
pub fn move_within(buf: &mut [u8], src: usize, dst: usize, len: usize) {
    buf.copy_within(src..src + len, dst);
}

/// Sets every byte of `buf` to zero.
#[inline]
pub fn clear(buf: &mut [u8]) {
    buf.fill(0);
}

/// Sets every byte of `buf` to `value`.
#[inline]
pub fn fill(buf: &mut [u8], value: u8) {
    buf.fill(value);
}

/// Sets `len` raw bytes starting at `dst` to `value`.
///
/// # Safety
///
/// `dst..dst+len` must be valid for writes. The bytes may belong to
/// uninitialized memory.
#[inline]
pub unsafe fn fill_raw(dst: *mut u8, len: usize, value: u8) {
    std::ptr::write_bytes(dst, value, len);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0, 16), 0);
        assert_eq!(round_up(1, 16), 16);
        assert_eq!(round_up(16, 16), 16);
        assert_eq!(round_up(17, 8), 24);
        assert!(is_aligned(32, 16));
        assert!(!is_aligned(36, 16));
    }

    #[test]
    fn test_alloc_free_roundtrip() {
        let layout = Layout::from_size_align(256, 16).unwrap();
        let ptr = alloc_zeroed(layout);
        assert!(is_aligned(ptr.as_ptr() as usize, 16));
        // SAFETY: freshly allocated 256 bytes.
        let bytes = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), 256) };
        assert!(bytes.iter().all(|b| *b == 0));
        fill(bytes, 0xAA);
        assert!(bytes.iter().all(|b| *b == 0xAA));
        // SAFETY: same layout as the allocation.
        unsafe { free(ptr, layout) };
    }

    #[test]
    fn test_zero_sized_is_dangling() {
        let ptr = alloc_array::<u64>(0);
        assert_eq!(ptr, NonNull::dangling());
        // SAFETY: zero-sized free is a no-op.
        unsafe { free_array(ptr, 0) };

        let zst = alloc_array::<()>(1000);
        // SAFETY: zero-sized free is a no-op.
        unsafe { free_array(zst, 1000) };
    }

    #[test]
    fn test_copy_move_clear() {
        let mut buf = [1u8, 2, 3, 4, 5, 6];
        move_within(&mut buf, 0, 2, 4);
        assert_eq!(buf, [1, 2, 1, 2, 3, 4]);

        let mut dst = [0u8; 4];
        copy(&buf[..3], &mut dst);
        assert_eq!(dst, [1, 2, 1, 0]);

        clear(&mut dst);
        assert_eq!(dst, [0; 4]);
    }
}
