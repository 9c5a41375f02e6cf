//! bufferdb - the buffer pool of a teaching relational database.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Transactions / query execution (callers)           │
//! │        pin · pin_new · unpin · flush_all · available            │
//! └─────────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Buffer Pool (buffer/)                          │
//! │   BufferPoolManager + Buffer + PinGuard + Statistics            │
//! │   ┌─────────────────────────────────────────────────────┐      │
//! │   │   Replacement policies: LRU | CLOCK (second chance) │      │
//! │   └─────────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Storage (storage/)                             │
//! │   FileManager (blocks)  ·  WriteAheadLog / LogManager  ·  Page  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (Block, BufferId, TxnId, Lsn, Error, config)
//! - [`buffer`] - Buffer pool management and replacement policies
//! - [`storage`] - Block I/O, log durability and page formats
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use bufferdb::{BufferPoolConfig, BufferPoolManager, FileManager, LogManager};
//! use bufferdb::{ReplacementPolicyKind, TxnId, ZeroFormatter};
//!
//! let files = Arc::new(FileManager::open("studentdb")?);
//! let log = Arc::new(LogManager::open("studentdb.log")?);
//! let config = BufferPoolConfig::default().with_policy(ReplacementPolicyKind::Clock);
//! let bpm = BufferPoolManager::new(config, files, log.clone())?;
//!
//! let buffer = bpm.pin_new("students.tbl", &ZeroFormatter)?.expect("free buffer");
//! let lsn = log.append(b"student 1 inserted");
//! buffer.set_string(0, "Ada", TxnId::new(1), Some(lsn))?;
//! bpm.unpin(&buffer);
//!
//! // Commit: the log reaches disk before the page does.
//! bpm.flush_all(TxnId::new(1))?;
//! # Ok::<(), bufferdb::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{
    Block, BufferId, BufferPoolConfig, Error, Lsn, ReplacementPolicyKind, Result, TxnId,
};

pub use buffer::replacer::{ClockPolicy, LruPolicy, ReplacementPolicy};
pub use buffer::{Buffer, BufferPoolManager, BufferPoolStats, PinGuard, StatsSnapshot};
pub use storage::page::{Page, PageFormatter, ZeroFormatter};
pub use storage::{FileManager, LogManager, WriteAheadLog};
