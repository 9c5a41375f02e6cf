//! Disk block identifier.

use std::fmt;
use std::sync::Arc;

/// A page-sized region of a named file: `(file name, block number)`.
///
/// Equality and hashing are by value, so two `Block`s naming the same file
/// and number are interchangeable. The file name is shared behind an `Arc`
/// so cloning a `Block` never copies the string.
///
/// # Example
/// ```
/// use bufferdb::Block;
///
/// let a = Block::new("students.tbl", 3);
/// let b = Block::new("students.tbl", 3);
/// assert_eq!(a, b);
/// assert_eq!(a.number(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block {
    file: Arc<str>,
    number: u32,
}

impl Block {
    /// Create a block identifier.
    pub fn new(file: impl Into<Arc<str>>, number: u32) -> Self {
        Self {
            file: file.into(),
            number,
        }
    }

    /// Name of the file holding this block.
    #[inline]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Position of the block within its file.
    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[file {}, block {}]", self.file, self.number)
    }
}
