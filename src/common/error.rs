//! Error types for bufferdb.

use thiserror::Error;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in bufferdb.
///
/// Running out of evictable buffers is deliberately *not* listed here:
/// `pin` and `pin_new` report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from file or log operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested block lies beyond the end of its file.
    #[error("Block {number} of file {file} not found")]
    BlockNotFound { file: String, number: u32 },

    /// A file holds more blocks than a block number can address.
    #[error("File {file} of {len} bytes has too many blocks")]
    FileTooLarge { file: String, len: u64 },

    /// A typed page access would run past the end of the page.
    #[error("Offset {offset} with length {len} is out of page bounds")]
    OffsetOutOfBounds { offset: usize, len: usize },

    /// Bytes stored at a string offset are not valid UTF-8.
    #[error("Invalid string at offset {0}")]
    InvalidString(usize),

    /// The log could not make a record durable.
    ///
    /// A buffer that sees this during `flush` does not write its page.
    #[error("Log flush failed: {0}")]
    LogFlush(String),

    /// Buffer pool configuration was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
