//! LRU (Least Recently Used) replacement policy.

use std::sync::Arc;

use crate::buffer::replacer::ReplacementPolicy;
use crate::buffer::Buffer;
use crate::common::BufferId;

/// Evicts the unpinned buffer with the smallest last-access time.
///
/// Access times come from the pool's logical clock and are unique, but
/// ties would still break toward the lowest slot index.
#[derive(Debug, Default)]
pub struct LruPolicy;

impl LruPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl ReplacementPolicy for LruPolicy {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn choose_victim(&mut self, buffers: &[Arc<Buffer>]) -> Option<BufferId> {
        buffers
            .iter()
            .filter(|buffer| !buffer.is_pinned())
            .min_by_key(|buffer| (buffer.last_access_time(), buffer.id()))
            .map(|buffer| buffer.id())
    }
}
