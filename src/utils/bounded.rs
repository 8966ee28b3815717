//! Fixed-capacity string buffer
//!
//! Stores UTF-8 text inline in a `[u8; N]`. Appends that would exceed the
//! capacity are rejected whole; nothing is ever truncated silently.

use std::fmt;
use std::ops::Deref;

use crate::error::CapacityError;

/// Inline string of at most `N` bytes.
#[derive(Clone, Copy)]
pub struct BoundedString<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> Default for BoundedString<N> {
    fn default() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }
}

impl<const N: usize> BoundedString<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a buffer holding `s`, or fails if `s` does not fit.
    pub fn try_from_str(s: &str) -> Result<Self, CapacityError> {
        let mut out = Self::new();
        out.push_str(s)?;
        Ok(out)
    }

    pub fn as_str(&self) -> &str {
        // Only whole `&str` values are ever copied in and truncation happens
        // at ASCII separators, so the contents are always valid UTF-8.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn remaining(&self) -> usize {
        N - self.len
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends `s`, leaving the buffer untouched if it would overflow.
    pub fn push_str(&mut self, s: &str) -> Result<(), CapacityError> {
        let bytes = s.as_bytes();
        if bytes.len() > self.remaining() {
            return Err(CapacityError {
                capacity: N,
                requested: self.len + bytes.len(),
            });
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    pub fn push(&mut self, c: char) -> Result<(), CapacityError> {
        let mut tmp = [0u8; 4];
        self.push_str(c.encode_utf8(&mut tmp))
    }

    pub fn pop(&mut self) -> Option<char> {
        let c = self.as_str().chars().next_back()?;
        self.len -= c.len_utf8();
        Some(c)
    }
}

impl<const N: usize> Deref for BoundedString<N> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize> AsRef<str> for BoundedString<N> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize> PartialEq for BoundedString<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<const N: usize> Eq for BoundedString<N> {}

impl<const N: usize> PartialEq<str> for BoundedString<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<const N: usize> PartialEq<&str> for BoundedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl<const N: usize> fmt::Display for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> fmt::Debug for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Write for BoundedString<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s).map_err(|_| fmt::Error)
    }
}
