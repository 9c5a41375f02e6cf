//! Replacement policies (replacers).
//!
//! A policy picks which unpinned buffer to evict when a pin misses. The
//! pool holds exactly one policy, chosen from
//! [`ReplacementPolicyKind`] at construction.
//!
//! Implementations:
//! - [`LruPolicy`] - Least recently accessed unpinned buffer
//! - [`ClockPolicy`] - Second-chance scan with a persistent hand

mod clock;
mod lru;

use std::sync::Arc;

pub use clock::ClockPolicy;
pub use lru::LruPolicy;

use crate::buffer::Buffer;
use crate::common::{BufferId, BufferPoolConfig, ReplacementPolicyKind};

/// Chooses an eviction victim among the pool's buffers.
///
/// Every implementation must:
/// - never return a buffer whose pin count is above zero
/// - return some unpinned buffer whenever one exists (the clock policy
///   within its bounded scan)
///
/// Called only while the pool lock is held.
pub trait ReplacementPolicy: Send {
    /// Short name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Pick a victim, or `None` if no buffer is evictable.
    fn choose_victim(&mut self, buffers: &[Arc<Buffer>]) -> Option<BufferId>;

    /// Observe a pin that hit an already-resident buffer.
    fn record_hit(&mut self, _buffer: &Buffer) {}
}

/// Build the policy named by `config`.
pub fn build_policy(config: &BufferPoolConfig) -> Box<dyn ReplacementPolicy> {
    match config.policy {
        ReplacementPolicyKind::Lru => Box::new(LruPolicy::new()),
        ReplacementPolicyKind::Clock => Box::new(ClockPolicy::new(config.clock_max_cycles)),
    }
}
