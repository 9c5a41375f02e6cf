//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Block caching between disk and memory
//! - Pin-based reference counting
//! - Write-ahead-ordered write-back of dirty buffers
//! - Pluggable replacement policies (LRU or Clock)

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::buffer::replacer::{build_policy, ReplacementPolicy};
use crate::buffer::{Buffer, BufferPoolStats, PinGuard};
use crate::buffer::buffer::AccessClock;
use crate::common::{Block, BufferId, BufferPoolConfig, Result, TxnId};
use crate::storage::page::PageFormatter;
use crate::storage::{FileManager, WriteAheadLog};

/// Manages a fixed pool of buffers for caching disk blocks.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ block_index  │  │    buffers: Vec<Arc<Buffer>>      │   │
/// │  │Block → BufId │─▶│  [Buf0] [Buf1] [Buf2] ...         │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │     free     │  │    policy    │  │ file_manager │      │
/// │  │BTreeSet<Bid> │  │  LRU | Clock │  │  + log       │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// One pool-wide `Mutex` guards the free set, the block index and the
/// policy (including the clock hand). Every entry point that changes pool
/// state takes it, so find-or-allocate-then-pin is atomic: two threads
/// pinning the same block always share one buffer, and a buffer is never
/// handed to two blocks at once.
///
/// Victim write-back happens inside that critical section, so eviction
/// I/O is serialized with every other pool operation.
///
/// # Residency
/// A block stays in the index after its buffer is unpinned. A later pin of
/// the same block is a hit as long as the buffer has not been chosen as a
/// victim in between.
///
/// # Usage
/// ```no_run
/// use std::sync::Arc;
/// use bufferdb::{Block, BufferPoolConfig, BufferPoolManager, FileManager, LogManager, TxnId};
///
/// let files = Arc::new(FileManager::open("studentdb")?);
/// let log = Arc::new(LogManager::open("studentdb.log")?);
/// let bpm = BufferPoolManager::new(BufferPoolConfig::default(), files, log)?;
///
/// if let Some(buffer) = bpm.pin(&Block::new("students.tbl", 0))? {
///     let lsn = None; // no log record needed for this write
///     buffer.set_int(0, 42, TxnId::new(1), lsn)?;
///     bpm.unpin(&buffer);
/// }
/// bpm.flush_all(TxnId::new(1))?;
/// # Ok::<(), bufferdb::Error>(())
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of buffers allocated at startup.
    buffers: Vec<Arc<Buffer>>,

    /// Everything that changes as blocks come and go.
    state: Mutex<PoolState>,

    /// Performance statistics.
    stats: BufferPoolStats,

    config: BufferPoolConfig,
}

struct PoolState {
    /// Buffers with pin count 0.
    free: BTreeSet<BufferId>,

    /// Which buffer holds each resident block.
    block_index: HashMap<Block, BufferId>,

    /// Victim selection.
    policy: Box<dyn ReplacementPolicy>,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if `config` fails validation.
    pub fn new(
        config: BufferPoolConfig,
        files: Arc<FileManager>,
        log: Arc<dyn WriteAheadLog>,
    ) -> Result<Self> {
        config.validate()?;

        let clock = Arc::new(AccessClock::new());
        let buffers: Vec<Arc<Buffer>> = (0..config.pool_size)
            .map(|i| {
                Arc::new(Buffer::new(
                    BufferId::new(i),
                    Arc::clone(&files),
                    Arc::clone(&log),
                    Arc::clone(&clock),
                ))
            })
            .collect();

        // Every buffer starts unpinned, hence free.
        let free = (0..config.pool_size).map(BufferId::new).collect();
        let policy = build_policy(&config);
        info!(
            "buffer pool ready: {} buffers, {} replacement",
            config.pool_size,
            policy.name()
        );

        Ok(Self {
            buffers,
            state: Mutex::new(PoolState {
                free,
                block_index: HashMap::new(),
                policy,
            }),
            stats: BufferPoolStats::new(),
            config,
        })
    }

    // ========================================================================
    // Public API: Pin and unpin
    // ========================================================================

    /// Pin a buffer to `block`, loading the block if it is not resident.
    ///
    /// Returns `Ok(None)` when every buffer is pinned; the caller decides
    /// whether to retry.
    ///
    /// # Errors
    /// - `Error::BlockNotFound` if the block does not exist on disk
    /// - I/O or log errors while writing back the victim's dirty content
    pub fn pin(&self, block: &Block) -> Result<Option<Arc<Buffer>>> {
        let mut state = self.state.lock();

        if let Some(&id) = state.block_index.get(block) {
            let buffer = &self.buffers[id.index()];
            let pins = buffer.pin();
            state.free.remove(&id);
            state.policy.record_hit(buffer);
            BufferPoolStats::bump(&self.stats.cache_hits);
            trace!("pin {} hit {} (pins: {})", block, id, pins);
            return Ok(Some(Arc::clone(buffer)));
        }

        BufferPoolStats::bump(&self.stats.cache_misses);
        let Some(id) = self.choose_victim(&mut state, format_args!("{}", block)) else {
            return Ok(None);
        };

        let buffer = &self.buffers[id.index()];
        let previous = buffer.current_block();
        let assigned = buffer.assign_to_block(block.clone());
        Self::reindex(&mut state, id, previous.as_ref(), buffer.current_block());
        let flushed = assigned?;

        self.record_replacement(id, previous.as_ref(), flushed);
        BufferPoolStats::bump(&self.stats.pages_read);

        buffer.pin();
        state.free.remove(&id);
        trace!("pin {} loaded into {}", block, id);
        Ok(Some(Arc::clone(buffer)))
    }

    /// Append a new block to `filename`, formatted by `formatter`, and pin
    /// a buffer to it.
    ///
    /// Returns `Ok(None)` without appending anything when every buffer is
    /// pinned.
    pub fn pin_new(
        &self,
        filename: &str,
        formatter: &dyn PageFormatter,
    ) -> Result<Option<Arc<Buffer>>> {
        let mut state = self.state.lock();

        BufferPoolStats::bump(&self.stats.cache_misses);
        let Some(id) = self.choose_victim(&mut state, format_args!("new block of {}", filename))
        else {
            return Ok(None);
        };

        let buffer = &self.buffers[id.index()];
        let previous = buffer.current_block();
        let assigned = buffer.assign_to_new(filename, formatter);
        // The block's identity is only known once the append has happened.
        Self::reindex(&mut state, id, previous.as_ref(), buffer.current_block());
        let flushed = assigned?;

        self.record_replacement(id, previous.as_ref(), flushed);

        buffer.pin();
        state.free.remove(&id);
        trace!("pin_new appended to {} in {}", filename, id);
        Ok(Some(Arc::clone(buffer)))
    }

    /// Like [`pin`](Self::pin), returning a guard that unpins on drop.
    pub fn pin_guarded(&self, block: &Block) -> Result<Option<PinGuard<'_>>> {
        Ok(self.pin(block)?.map(|buffer| PinGuard::new(self, buffer)))
    }

    /// Like [`pin_new`](Self::pin_new), returning a guard that unpins on drop.
    pub fn pin_new_guarded(
        &self,
        filename: &str,
        formatter: &dyn PageFormatter,
    ) -> Result<Option<PinGuard<'_>>> {
        Ok(self
            .pin_new(filename, formatter)?
            .map(|buffer| PinGuard::new(self, buffer)))
    }

    /// Release one pin on `buffer`.
    ///
    /// When the count reaches 0 the buffer joins the free set and becomes a
    /// replacement candidate. Its block stays resident until it is evicted.
    ///
    /// # Panics
    /// Panics if the buffer is not pinned.
    pub fn unpin(&self, buffer: &Buffer) {
        let mut state = self.state.lock();
        let pins = buffer.unpin();
        if pins == 0 {
            state.free.insert(buffer.id());
        }
        trace!("unpin {} (pins: {})", buffer.id(), pins);
    }

    // ========================================================================
    // Public API: Flush
    // ========================================================================

    /// Write back every buffer modified by `txn`, log first.
    ///
    /// Used at commit.
    pub fn flush_all(&self, txn: TxnId) -> Result<()> {
        let _state = self.state.lock();
        for buffer in &self.buffers {
            if buffer.is_modified_by(txn) && buffer.flush()? {
                BufferPoolStats::bump(&self.stats.pages_written);
            }
        }
        debug!("flushed buffers of {}", txn);
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Number of unpinned buffers.
    pub fn available(&self) -> usize {
        self.state.lock().free.len()
    }

    /// Buffers holding unflushed changes right now.
    pub fn dirty_buffers(&self) -> Vec<Arc<Buffer>> {
        let _state = self.state.lock();
        self.buffers
            .iter()
            .filter(|buffer| buffer.is_dirty())
            .cloned()
            .collect()
    }

    /// Buffers with a pin count above zero right now.
    pub fn pinned_buffers(&self) -> Vec<Arc<Buffer>> {
        let _state = self.state.lock();
        self.buffers
            .iter()
            .filter(|buffer| buffer.is_pinned())
            .cloned()
            .collect()
    }

    /// Buffer holding `block`, if resident. Does not pin.
    pub fn buffer_for(&self, block: &Block) -> Option<Arc<Buffer>> {
        let state = self.state.lock();
        state
            .block_index
            .get(block)
            .map(|id| Arc::clone(&self.buffers[id.index()]))
    }

    /// Pin count of the buffer holding `block`, or `None` if not resident.
    pub fn pin_count(&self, block: &Block) -> Option<u32> {
        let state = self.state.lock();
        state
            .block_index
            .get(block)
            .map(|id| self.buffers[id.index()].pin_count())
    }

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.buffers.len()
    }

    /// Name of the replacement policy in use.
    pub fn policy_name(&self) -> &'static str {
        self.state.lock().policy.name()
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    // ========================================================================
    // Internal: Victim selection and bookkeeping
    // ========================================================================

    fn choose_victim(&self, state: &mut PoolState, wanted: fmt::Arguments<'_>) -> Option<BufferId> {
        match state.policy.choose_victim(&self.buffers) {
            Some(id) => {
                debug_assert!(state.free.contains(&id), "victim {} is not free", id);
                debug!("{} chose {} for {}", state.policy.name(), id, wanted);
                Some(id)
            }
            None => {
                BufferPoolStats::bump(&self.stats.unavailable);
                warn!("no buffer available for {}", wanted);
                None
            }
        }
    }

    /// Make the block index agree with what buffer `id` now holds.
    fn reindex(state: &mut PoolState, id: BufferId, previous: Option<&Block>, current: Option<Block>) {
        if previous == current.as_ref() {
            return;
        }
        if let Some(old) = previous {
            if state.block_index.get(old) == Some(&id) {
                state.block_index.remove(old);
            }
        }
        if let Some(new) = current {
            state.block_index.insert(new, id);
        }
    }

    fn record_replacement(&self, id: BufferId, previous: Option<&Block>, flushed: bool) {
        if let Some(old) = previous {
            BufferPoolStats::bump(&self.stats.evictions);
            debug!("evicted {} from {} (written back: {})", old, id, flushed);
        }
        if flushed {
            BufferPoolStats::bump(&self.stats.pages_written);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Error, Lsn, ReplacementPolicyKind};
    use crate::storage::page::{Page, ZeroFormatter};
    use crate::storage::LogManager;
    use tempfile::tempdir;

    /// Helper to create a BPM over a temporary database directory.
    fn create_test_bpm(
        pool_size: usize,
        policy: ReplacementPolicyKind,
    ) -> (BufferPoolManager, Arc<FileManager>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let files = Arc::new(FileManager::open(dir.path().join("db")).unwrap());
        let log = Arc::new(LogManager::open(dir.path().join("db.log")).unwrap());
        let config = BufferPoolConfig::new(pool_size, policy);
        let bpm = BufferPoolManager::new(config, Arc::clone(&files), log).unwrap();
        (bpm, files, dir)
    }

    fn append_blocks(files: &FileManager, n: u32) -> Vec<Block> {
        (0..n)
            .map(|i| {
                let mut page = Page::new();
                page.set_int(0, i as i32).unwrap();
                files.append("t.tbl", &page).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_new_rejects_empty_pool() {
        let dir = tempdir().unwrap();
        let files = Arc::new(FileManager::open(dir.path()).unwrap());
        let log = Arc::new(LogManager::open(dir.path().join("db.log")).unwrap());
        let config = BufferPoolConfig::default().with_pool_size(0);

        let result = BufferPoolManager::new(config, files, log);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_fresh_pool_is_all_available() {
        let (bpm, _files, _dir) = create_test_bpm(4, ReplacementPolicyKind::Lru);
        assert_eq!(bpm.available(), 4);
        assert_eq!(bpm.pool_size(), 4);
        assert_eq!(bpm.policy_name(), "lru");
        assert!(bpm.pinned_buffers().is_empty());
    }

    #[test]
    fn test_pin_same_block_returns_same_buffer() {
        let (bpm, files, _dir) = create_test_bpm(4, ReplacementPolicyKind::Lru);
        let blocks = append_blocks(&files, 1);

        let a = bpm.pin(&blocks[0]).unwrap().unwrap();
        let b = bpm.pin(&blocks[0]).unwrap().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.pin_count(), 2);
        assert_eq!(bpm.available(), 3);
        assert_eq!(bpm.stats().snapshot().cache_hits, 1);
    }

    #[test]
    fn test_pin_loads_block_contents() {
        let (bpm, files, _dir) = create_test_bpm(2, ReplacementPolicyKind::Lru);
        let blocks = append_blocks(&files, 2);

        let buffer = bpm.pin(&blocks[1]).unwrap().unwrap();
        assert_eq!(buffer.get_int(0).unwrap(), 1);
        assert_eq!(buffer.block(), Some(blocks[1].clone()));
    }

    #[test]
    fn test_pin_missing_block_fails_and_keeps_pool_consistent() {
        let (bpm, _files, _dir) = create_test_bpm(2, ReplacementPolicyKind::Lru);

        let result = bpm.pin(&Block::new("t.tbl", 9));
        assert!(matches!(result, Err(Error::BlockNotFound { .. })));
        assert_eq!(bpm.available(), 2);
        assert!(bpm.buffer_for(&Block::new("t.tbl", 9)).is_none());
    }

    #[test]
    fn test_unpin_to_zero_frees_buffer() {
        let (bpm, files, _dir) = create_test_bpm(3, ReplacementPolicyKind::Lru);
        let blocks = append_blocks(&files, 1);

        let buffer = bpm.pin(&blocks[0]).unwrap().unwrap();
        bpm.pin(&blocks[0]).unwrap().unwrap();
        assert_eq!(bpm.available(), 2);

        bpm.unpin(&buffer);
        assert_eq!(bpm.available(), 2);
        bpm.unpin(&buffer);
        assert_eq!(bpm.available(), 3);

        // Still resident after unpinning.
        assert_eq!(bpm.pin_count(&blocks[0]), Some(0));
    }

    #[test]
    fn test_all_pinned_is_unavailable() {
        let (bpm, files, _dir) = create_test_bpm(2, ReplacementPolicyKind::Clock);
        let blocks = append_blocks(&files, 3);

        let _a = bpm.pin(&blocks[0]).unwrap().unwrap();
        let _b = bpm.pin(&blocks[1]).unwrap().unwrap();

        assert!(bpm.pin(&blocks[2]).unwrap().is_none());
        assert!(bpm.pin_new("t.tbl", &ZeroFormatter).unwrap().is_none());
        assert_eq!(files.block_count("t.tbl").unwrap(), 3);
        assert_eq!(bpm.stats().snapshot().unavailable, 2);
    }

    #[test]
    fn test_eviction_replaces_index_entry() {
        let (bpm, files, _dir) = create_test_bpm(1, ReplacementPolicyKind::Lru);
        let blocks = append_blocks(&files, 2);

        let first = bpm.pin(&blocks[0]).unwrap().unwrap();
        bpm.unpin(&first);
        let second = bpm.pin(&blocks[1]).unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(bpm.pin_count(&blocks[0]), None);
        assert_eq!(bpm.pin_count(&blocks[1]), Some(1));
        assert_eq!(bpm.stats().snapshot().evictions, 1);
    }

    #[test]
    fn test_dirty_victim_written_back() {
        let (bpm, files, _dir) = create_test_bpm(1, ReplacementPolicyKind::Lru);
        let blocks = append_blocks(&files, 2);

        let buffer = bpm.pin(&blocks[0]).unwrap().unwrap();
        buffer.set_int(0, 500, TxnId::new(1), None).unwrap();
        bpm.unpin(&buffer);

        bpm.pin(&blocks[1]).unwrap().unwrap();

        let mut page = Page::new();
        files.read(&blocks[0], &mut page).unwrap();
        assert_eq!(page.get_int(0).unwrap(), 500);
        assert_eq!(bpm.stats().snapshot().pages_written, 1);
    }

    #[test]
    fn test_pin_new_registers_appended_block() {
        let (bpm, files, _dir) = create_test_bpm(2, ReplacementPolicyKind::Lru);
        append_blocks(&files, 2);

        let buffer = bpm.pin_new("t.tbl", &ZeroFormatter).unwrap().unwrap();
        let block = buffer.block().unwrap();
        assert_eq!(block, Block::new("t.tbl", 2));
        assert_eq!(bpm.pin_count(&block), Some(1));

        let again = bpm.pin(&block).unwrap().unwrap();
        assert!(Arc::ptr_eq(&buffer, &again));
    }

    #[test]
    fn test_flush_all_only_touches_txn() {
        let (bpm, files, _dir) = create_test_bpm(3, ReplacementPolicyKind::Lru);
        let blocks = append_blocks(&files, 2);

        let a = bpm.pin(&blocks[0]).unwrap().unwrap();
        let b = bpm.pin(&blocks[1]).unwrap().unwrap();
        a.set_int(0, 10, TxnId::new(1), None).unwrap();
        b.set_int(0, 20, TxnId::new(2), None).unwrap();
        assert_eq!(bpm.dirty_buffers().len(), 2);

        bpm.flush_all(TxnId::new(1)).unwrap();

        assert!(!a.is_dirty());
        assert!(b.is_dirty());
        assert_eq!(bpm.dirty_buffers().len(), 1);

        let mut page = Page::new();
        files.read(&blocks[1], &mut page).unwrap();
        assert_eq!(page.get_int(0).unwrap(), 1);
    }

    #[test]
    fn test_flush_all_forces_log() {
        let dir = tempdir().unwrap();
        let files = Arc::new(FileManager::open(dir.path().join("db")).unwrap());
        let log = Arc::new(LogManager::open(dir.path().join("db.log")).unwrap());
        let bpm = BufferPoolManager::new(
            BufferPoolConfig::default(),
            Arc::clone(&files),
            log.clone(),
        )
        .unwrap();

        let buffer = bpm.pin_new("t.tbl", &ZeroFormatter).unwrap().unwrap();
        let lsn = log.append(b"set t.tbl:0 = 7");
        buffer.set_int(0, 7, TxnId::new(3), Some(lsn)).unwrap();
        assert_eq!(log.last_flushed(), None);

        bpm.flush_all(TxnId::new(3)).unwrap();
        assert_eq!(log.last_flushed(), Some(lsn));
        assert_eq!(buffer.lsn(), Some(Lsn::new(0)));
    }

    #[test]
    fn test_pinned_buffers_snapshot() {
        let (bpm, files, _dir) = create_test_bpm(3, ReplacementPolicyKind::Lru);
        let blocks = append_blocks(&files, 2);

        let a = bpm.pin(&blocks[0]).unwrap().unwrap();
        bpm.pin(&blocks[1]).unwrap().unwrap();
        assert_eq!(bpm.pinned_buffers().len(), 2);

        bpm.unpin(&a);
        let pinned = bpm.pinned_buffers();
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[0].current_block(), Some(blocks[1].clone()));
    }

    #[test]
    fn test_guard_unpins_on_drop() {
        let (bpm, files, _dir) = create_test_bpm(2, ReplacementPolicyKind::Lru);
        let blocks = append_blocks(&files, 1);

        {
            let guard = bpm.pin_guarded(&blocks[0]).unwrap().unwrap();
            assert_eq!(guard.get_int(0).unwrap(), 0);
            assert_eq!(bpm.available(), 1);
        }
        assert_eq!(bpm.available(), 2);
        assert_eq!(bpm.pin_count(&blocks[0]), Some(0));
    }

    #[test]
    fn test_concurrent_pins_share_buffer() {
        use std::thread;

        let (bpm, files, _dir) = create_test_bpm(4, ReplacementPolicyKind::Clock);
        let blocks = append_blocks(&files, 1);
        let bpm = Arc::new(bpm);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bpm = Arc::clone(&bpm);
                let block = blocks[0].clone();
                thread::spawn(move || bpm.pin(&block).unwrap().unwrap().id())
            })
            .collect();

        let ids: Vec<BufferId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(bpm.pin_count(&blocks[0]), Some(8));
        assert_eq!(bpm.available(), 3);
    }
}
