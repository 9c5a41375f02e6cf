//! Buffer slot identifier type.

use std::fmt;

/// Identifies a buffer (frame) slot in the pool.
///
/// Assigned once when the pool is built and never changes. Using `usize`
/// so it indexes the frame vector directly: `frames[buffer_id.0]`.
///
/// # Example
/// ```
/// use bufferdb::BufferId;
///
/// let id = BufferId::new(5);
/// assert_eq!(id.index(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

impl BufferId {
    /// Create a new BufferId.
    #[inline]
    pub fn new(id: usize) -> Self {
        BufferId(id)
    }

    /// Position of this slot in the pool's frame array.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({})", self.0)
    }
}
