//! Common types and utilities shared across bufferdb.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`BufferPoolConfig`]
//! - Error types
//! - Identifiers (Block, BufferId, TxnId, Lsn)

mod block;
mod buffer_id;
pub mod config;
pub mod error;
mod txn;

pub use block::Block;
pub use buffer_id::BufferId;
pub use config::{BufferPoolConfig, ReplacementPolicyKind};
pub use error::{Error, Result};
pub use txn::{Lsn, TxnId};
