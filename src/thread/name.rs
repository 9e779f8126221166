/*!
 * Bounded Thread Names
 * Fixed-size, NUL-terminated name buffer stored inline in the control block
 */

use crate::core::limits::NAME_CAPACITY;
use serde::{Serialize, Serializer};
use std::fmt;

/// Thread name of at most `NAME_CAPACITY - 1` bytes plus a terminating NUL.
///
/// Longer names are truncated on a UTF-8 character boundary, so ASCII names
/// keep exactly `NAME_CAPACITY - 1` bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadName {
    buf: [u8; NAME_CAPACITY],
}

impl ThreadName {
    /// Longest storable name in bytes
    pub const MAX_LEN: usize = NAME_CAPACITY - 1;

    /// Copy `name`, truncating to `MAX_LEN` bytes. An embedded NUL ends the name.
    pub fn new(name: &str) -> Self {
        let name = name.split('\0').next().unwrap_or_default();
        let mut end = name.len().min(Self::MAX_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }

        let mut buf = [0u8; NAME_CAPACITY];
        buf[..end].copy_from_slice(&name.as_bytes()[..end]);
        Self { buf }
    }

    /// Empty name of an unused slot
    pub const fn empty() -> Self {
        Self {
            buf: [0u8; NAME_CAPACITY],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.iter().position(|&b| b == 0).unwrap_or(Self::MAX_LEN)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf[0] == 0
    }

    pub fn as_str(&self) -> &str {
        // Only ever filled from a &str cut on a char boundary.
        std::str::from_utf8(&self.buf[..self.len()]).unwrap_or_default()
    }

    /// Name bytes including the terminating NUL
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..=self.len()]
    }
}

impl Default for ThreadName {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for ThreadName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl PartialEq<str> for ThreadName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ThreadName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Serialize for ThreadName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_is_copied() {
        let name = ThreadName::new("First thread");
        assert_eq!(name, "First thread");
        assert_eq!(name.as_bytes_with_nul().last(), Some(&0));
    }

    #[test]
    fn test_long_name_is_truncated_to_capacity_minus_one() {
        let name = ThreadName::new("A thread name that is far too long");
        assert_eq!(name.len(), NAME_CAPACITY - 1);
        assert_eq!(name, "A thread name that ");
        assert_eq!(name.as_bytes_with_nul().len(), NAME_CAPACITY);
        assert_eq!(name.as_bytes_with_nul()[NAME_CAPACITY - 1], 0);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 9 two-byte characters = 18 bytes, the 10th would end at byte 20
        let name = ThreadName::new("ééééééééééé");
        assert_eq!(name.len(), 18);
        assert_eq!(name.as_str().chars().count(), 9);
    }

    #[test]
    fn test_embedded_nul_ends_name() {
        assert_eq!(ThreadName::new("abc\0def"), "abc");
        assert!(ThreadName::empty().is_empty());
    }
}
