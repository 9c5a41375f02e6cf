//! Transaction and log sequence identifiers.

use std::fmt;

/// Identifies the transaction that modified a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(pub u32);

impl TxnId {
    #[inline]
    pub fn new(id: u32) -> Self {
        TxnId(id)
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

/// Log sequence number.
///
/// Names the log record that must be durable before the page it covers
/// may be written. Ordered so the log can compare against its last
/// durable position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lsn(pub u64);

impl Lsn {
    #[inline]
    pub fn new(lsn: u64) -> Self {
        Lsn(lsn)
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lsn({})", self.0)
    }
}
