//! # String Builder
//!
//! Mutable UTF-8 text on top of an [`Array<u8>`]. Built strings are handed
//! out as [`StringAtom`]s; the builder keeps its buffer for the next string.
//!
//! Indices are byte offsets. An index that splits a character is a broken
//! contract and panics, like an out-of-range index.

use std::fmt;
use std::ops::{Bound, Range, RangeBounds};

use oroboros_core::{AllocStrategy, Array};

use crate::atom::StringAtom;

/// Smallest growth step of the byte buffer.
const MIN_GROW: usize = 128;

/// Growable text buffer that produces [`StringAtom`]s.
#[derive(Clone, PartialEq, Eq)]
pub struct StringBuilder {
    bytes: Array<u8>,
}

impl StringBuilder {
    /// An empty builder. Nothing is allocated until the first append.
    #[must_use]
    pub fn new() -> Self {
        let max_grow = AllocStrategy::default().max_grow.max(MIN_GROW);
        Self {
            bytes: Array::with_strategy(AllocStrategy::new(MIN_GROW, max_grow)),
        }
    }

    /// An empty builder with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut builder = Self::new();
        builder.reserve(capacity);
        builder
    }

    /// Makes room for `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) {
        self.bytes.reserve(additional);
    }

    /// Bytes the buffer holds without growing.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the builder holds no text.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Empties the builder. The buffer is kept.
    #[inline]
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Current content.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Every write goes through &str or char and cuts on char boundaries.
        match std::str::from_utf8(self.bytes.as_slice()) {
            Ok(text) => text,
            Err(err) => unreachable!("StringBuilder: content is not UTF-8: {err}"),
        }
    }

    /// Interns the content in this thread's atom table.
    #[must_use]
    pub fn to_atom(&self) -> StringAtom {
        StringAtom::new(self.as_str())
    }

    /// Interns the bytes in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds or splits a character.
    #[must_use]
    pub fn sub_atom(&self, range: impl RangeBounds<usize>) -> StringAtom {
        let range = self.byte_range(range);
        StringAtom::new(&self.as_str()[range])
    }

    // ===== SET / APPEND =====

    /// Replaces the content with `text`.
    pub fn set(&mut self, text: &str) {
        self.clear();
        self.append(text);
    }

    /// Appends `text`.
    pub fn append(&mut self, text: &str) {
        self.bytes.extend(text.bytes());
    }

    /// Appends one character.
    pub fn append_char(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.append(c.encode_utf8(&mut utf8));
    }

    /// Appends each part in order.
    pub fn append_all(&mut self, parts: &[&str]) {
        for part in parts {
            self.append(part);
        }
    }

    /// Appends the parts separated by `delim`.
    pub fn append_joined(&mut self, delim: char, parts: &[&str]) {
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.append_char(delim);
            }
            self.append(part);
        }
    }

    /// Replaces the content with the parts separated by `delim`.
    pub fn set_joined(&mut self, delim: char, parts: &[&str]) {
        self.clear();
        self.append_joined(delim, parts);
    }

    /// Replaces the content with formatted text. Returns false, leaving the
    /// builder empty, if the result is longer than `max_len` bytes.
    pub fn format(&mut self, max_len: usize, args: fmt::Arguments<'_>) -> bool {
        self.clear();
        self.append_format(max_len, args)
    }

    /// Appends formatted text. Returns false, leaving the content unchanged,
    /// if the appended text is longer than `max_len` bytes.
    pub fn append_format(&mut self, max_len: usize, args: fmt::Arguments<'_>) -> bool {
        let start = self.len();
        let written = fmt::Write::write_fmt(self, args).is_ok();
        if !written || self.len() - start > max_len {
            self.truncate(start);
            return false;
        }
        true
    }

    // ===== SUBSTITUTE =====

    /// Replaces every occurrence of `pattern` and returns how many were
    /// replaced. Replacement text is not searched again.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is empty.
    pub fn substitute_all(&mut self, pattern: &str, with: &str) -> usize {
        assert!(!pattern.is_empty(), "StringBuilder: empty substitution pattern");
        let count = self.as_str().matches(pattern).count();
        if count > 0 {
            let replaced = self.as_str().replace(pattern, with);
            self.set(&replaced);
        }
        count
    }

    /// Replaces the first occurrence of `pattern`. Returns false if there
    /// was none.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is empty.
    pub fn substitute_first(&mut self, pattern: &str, with: &str) -> bool {
        assert!(!pattern.is_empty(), "StringBuilder: empty substitution pattern");
        match self.as_str().find(pattern) {
            Some(start) => {
                self.substitute_range(start..start + pattern.len(), with);
                true
            }
            None => false,
        }
    }

    /// Replaces the bytes in `range` with `with`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds or splits a character.
    pub fn substitute_range(&mut self, range: impl RangeBounds<usize>, with: &str) {
        let Range { start, end } = self.byte_range(range);
        let text = self.as_str();
        let mut spliced = String::with_capacity(text.len() - (end - start) + with.len());
        spliced.push_str(&text[..start]);
        spliced.push_str(with);
        spliced.push_str(&text[end..]);
        self.set(&spliced);
    }

    // ===== SEARCH =====

    /// Byte index of the first character in `range` that is one of `delims`.
    #[must_use]
    pub fn find_first_of(&self, range: impl RangeBounds<usize>, delims: &str) -> Option<usize> {
        self.find_char(range, |c: char| delims.contains(c))
    }

    /// Byte index of the first character in `range` that is not one of
    /// `delims`.
    #[must_use]
    pub fn find_first_not_of(&self, range: impl RangeBounds<usize>, delims: &str) -> Option<usize> {
        self.find_char(range, |c: char| !delims.contains(c))
    }

    /// Byte index of the first `needle` that lies entirely inside `range`.
    #[must_use]
    pub fn find(&self, range: impl RangeBounds<usize>, needle: &str) -> Option<usize> {
        let range = self.byte_range(range);
        let start = range.start;
        self.as_str()[range].find(needle).map(|i| start + i)
    }

    /// Returns true if the content contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.as_str().contains(needle)
    }

    fn find_char(&self, range: impl RangeBounds<usize>, hit: impl Fn(char) -> bool) -> Option<usize> {
        let range = self.byte_range(range);
        let start = range.start;
        self.as_str()[range]
            .char_indices()
            .find(|&(_, c)| hit(c))
            .map(|(i, _)| start + i)
    }

    // ===== TOKENIZE =====

    /// Splits the content at any of `delims`, skipping empty tokens, and
    /// clears the builder.
    pub fn tokenize(&mut self, delims: &str) -> Array<StringAtom> {
        let tokens = self
            .as_str()
            .split(|c: char| delims.contains(c))
            .filter(|token| !token.is_empty())
            .map(StringAtom::new)
            .collect();
        self.clear();
        tokens
    }

    /// Like [`tokenize`](Self::tokenize), but text between a pair of `fence`
    /// characters is one token, delimiters included. An unmatched fence is
    /// an ordinary character.
    pub fn tokenize_fenced(&mut self, delims: &str, fence: char) -> Array<StringAtom> {
        let mut tokens = Array::new();
        let mut rest = self.as_str();
        loop {
            rest = rest.trim_start_matches(|c: char| delims.contains(c));
            if rest.is_empty() {
                break;
            }
            if let Some(inner) = rest.strip_prefix(fence) {
                if let Some(close) = inner.find(fence) {
                    tokens.add(StringAtom::new(&inner[..close]));
                    rest = &inner[close + fence.len_utf8()..];
                    continue;
                }
            }
            match rest.find(|c: char| delims.contains(c)) {
                Some(end) => {
                    tokens.add(StringAtom::new(&rest[..end]));
                    rest = &rest[end..];
                }
                None => {
                    tokens.add(StringAtom::new(rest));
                    break;
                }
            }
        }
        self.clear();
        tokens
    }

    // ===== EDIT =====

    /// Cuts the content at byte `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()` or splits a character.
    pub fn truncate(&mut self, index: usize) {
        let len = self.len();
        assert!(index <= len, "StringBuilder: truncate at {index} past length {len}");
        assert!(
            self.as_str().is_char_boundary(index),
            "StringBuilder: truncate at {index} splits a character"
        );
        self.bytes.erase_range(index, len - index);
    }

    /// Byte at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn at(&self, index: usize) -> u8 {
        self.bytes[index]
    }

    /// Last character.
    ///
    /// # Panics
    ///
    /// Panics if the builder is empty.
    #[must_use]
    pub fn back(&self) -> char {
        match self.as_str().chars().next_back() {
            Some(c) => c,
            None => panic!("StringBuilder: back() on empty builder"),
        }
    }

    /// Removes and returns the last character.
    ///
    /// # Panics
    ///
    /// Panics if the builder is empty.
    pub fn pop_back(&mut self) -> char {
        let c = self.back();
        self.truncate(self.len() - c.len_utf8());
        c
    }

    fn byte_range(&self, range: impl RangeBounds<usize>) -> Range<usize> {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&i) => i,
            Bound::Excluded(&i) => i + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&i) => i + 1,
            Bound::Excluded(&i) => i,
            Bound::Unbounded => len,
        };
        assert!(
            start <= end && end <= len,
            "StringBuilder: range {start}..{end} out of bounds for length {len}"
        );
        start..end
    }
}

impl Default for StringBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for StringBuilder {
    fn from(text: &str) -> Self {
        let mut builder = Self::new();
        builder.append(text);
        builder
    }
}

impl From<&StringBuilder> for StringAtom {
    fn from(builder: &StringBuilder) -> Self {
        builder.to_atom()
    }
}

impl fmt::Write for StringBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.append_char(c);
        Ok(())
    }
}

impl fmt::Display for StringBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StringBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringBuilder").field(&self.as_str()).finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
