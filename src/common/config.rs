//! Configuration for bufferdb.

use crate::common::{Error, Result};

/// Size of a page (and of an on-disk block) in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Bytes occupied by an integer stored in a page.
pub const INT_SIZE: usize = std::mem::size_of::<i32>();

/// Number of frames used when no pool size is given.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Full sweeps the clock hand may make before giving up.
///
/// Two sweeps always suffice when any buffer is unpinned: one to clear the
/// second-chance bits, one to land on a victim.
pub const DEFAULT_CLOCK_MAX_CYCLES: usize = 3;

/// Which replacement policy a pool uses to pick victims.
///
/// Chosen once when the pool is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementPolicyKind {
    /// Evict the unpinned buffer with the oldest access time.
    #[default]
    Lru,
    /// Second-chance scan over the frame array.
    Clock,
}

/// Construction parameters for a [`BufferPoolManager`](crate::BufferPoolManager).
///
/// # Example
/// ```
/// use bufferdb::{BufferPoolConfig, ReplacementPolicyKind};
///
/// let config = BufferPoolConfig::default()
///     .with_pool_size(3)
///     .with_policy(ReplacementPolicyKind::Clock);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames, fixed for the life of the pool.
    pub pool_size: usize,
    /// Replacement policy.
    pub policy: ReplacementPolicyKind,
    /// Bound on clock sweeps, in multiples of `pool_size`.
    pub clock_max_cycles: usize,
}

impl BufferPoolConfig {
    pub fn new(pool_size: usize, policy: ReplacementPolicyKind) -> Self {
        Self {
            pool_size,
            policy,
            clock_max_cycles: DEFAULT_CLOCK_MAX_CYCLES,
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_policy(mut self, policy: ReplacementPolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock_max_cycles(mut self, cycles: usize) -> Self {
        self.clock_max_cycles = cycles;
        self
    }

    /// Reject configurations the pool cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be > 0".into()));
        }
        if self.clock_max_cycles < 2 {
            return Err(Error::InvalidConfig(
                "clock_max_cycles must be at least 2".into(),
            ));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE, ReplacementPolicyKind::default())
    }
}
