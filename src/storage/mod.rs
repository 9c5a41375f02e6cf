//! Storage layer - the collaborators the buffer pool sits on.
//!
//! This module handles persistent storage:
//! - [`FileManager`] - Block-level file I/O
//! - [`LogManager`] / [`WriteAheadLog`] - Log durability for WAL ordering
//! - [`page`] - Page type and formatters

mod file_manager;
mod wal;
pub mod page;

pub use wal::{LogManager, WriteAheadLog};
pub use file_manager::FileManager;
