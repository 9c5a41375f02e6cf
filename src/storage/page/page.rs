//! Page - the in-memory image of one block.
//!
//! A [`Page`] is a raw 4KB byte array with typed accessors at byte offsets.
//! Each [`Buffer`](crate::Buffer) owns exactly one page for its lifetime.

use crate::common::config::{INT_SIZE, PAGE_SIZE};
use crate::common::{Error, Result};

/// A page of data (4KB, 4KB-aligned).
///
/// # Encoding
/// - Integers: 4 bytes, big-endian `i32`.
/// - Strings: a 4-byte big-endian length followed by that many UTF-8 bytes.
///
/// Reading a value with a different type than was written at that offset
/// yields garbage (or `InvalidString`); the page keeps no type tags.
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code; copying 4KB should
/// be explicit. A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use bufferdb::Page;
///
/// let mut page = Page::new();
/// page.set_int(0, 42).unwrap();
/// page.set_string(4, "hello").unwrap();
/// assert_eq!(page.get_int(0).unwrap(), 42);
/// assert_eq!(page.get_string(4).unwrap(), "hello");
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Get the size of a page.
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }

    /// Bytes needed to store a string of `len` bytes.
    #[inline]
    pub const fn max_string_len(len: usize) -> usize {
        INT_SIZE + len
    }

    /// Read the integer stored at `offset`.
    pub fn get_int(&self, offset: usize) -> Result<i32> {
        let bytes = self.range(offset, INT_SIZE)?;
        let mut buf = [0u8; INT_SIZE];
        buf.copy_from_slice(bytes);
        Ok(i32::from_be_bytes(buf))
    }

    /// Write `value` at `offset`.
    pub fn set_int(&mut self, offset: usize, value: i32) -> Result<()> {
        self.range_mut(offset, INT_SIZE)?
            .copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Read the length-prefixed string stored at `offset`.
    pub fn get_string(&self, offset: usize) -> Result<String> {
        let len = self.get_int(offset)? as u32 as usize;
        let bytes = self.range(offset + INT_SIZE, len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::InvalidString(offset))
    }

    /// Write `value` at `offset` as a length prefix plus UTF-8 bytes.
    pub fn set_string(&mut self, offset: usize, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        // Bounds-check the whole record before touching the length prefix.
        self.range(offset, Self::max_string_len(bytes.len()))?;
        self.set_int(offset, bytes.len() as i32)?;
        self.range_mut(offset + INT_SIZE, bytes.len())?
            .copy_from_slice(bytes);
        Ok(())
    }

    fn range(&self, offset: usize, len: usize) -> Result<&[u8]> {
        match offset.checked_add(len) {
            Some(end) if end <= PAGE_SIZE => Ok(&self.data[offset..end]),
            _ => Err(Error::OffsetOutOfBounds { offset, len }),
        }
    }

    fn range_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        match offset.checked_add(len) {
            Some(end) if end <= PAGE_SIZE => Ok(&mut self.data[offset..end]),
            _ => Err(Error::OffsetOutOfBounds { offset, len }),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}
