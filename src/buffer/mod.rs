//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between transactions and disk.
//! It manages a fixed pool of buffers, each holding one page.
//!
//! # Components
//! - [`BufferPoolManager`] - The block cache and pin/unpin arbiter
//! - [`Buffer`] - A slot holding a page + pin, dirty and LSN metadata
//! - [`PinGuard`] - RAII guard that unpins on drop
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Replacement policy implementations

#[allow(clippy::module_inception)]
mod buffer;
mod buffer_pool_manager;
mod pin_guard;
pub mod replacer;
mod stats;

pub use buffer::Buffer;
pub use buffer_pool_manager::BufferPoolManager;
pub use pin_guard::PinGuard;
pub use stats::{BufferPoolStats, StatsSnapshot};
