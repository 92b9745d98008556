//! # String Hash
//!
//! Bob Jenkins' one-at-a-time hash. Tables bucket by it and atoms from
//! different threads compare it before touching the bytes, so the exact bit
//! pattern matters.

/// One-at-a-time hash of `bytes`, wrapping `u32` arithmetic.
#[must_use]
pub fn one_at_a_time(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &byte in bytes {
        hash = hash.wrapping_add(u32::from(byte));
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

/// Hash of a string's UTF-8 bytes.
#[inline]
#[must_use]
pub fn hash_str(value: &str) -> u32 {
    one_at_a_time(value.as_bytes())
}
