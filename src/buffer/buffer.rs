//! Buffer - a slot in the buffer pool.
//!
//! A [`Buffer`] owns one [`Page`] for its whole life plus the metadata the
//! pool needs to manage it:
//! - Which block is loaded (if any)
//! - Pin count for reference counting
//! - Modifying transaction and LSN for write-ahead ordering
//! - Last access time and second-chance bit for the replacement policies

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

use crate::common::{Block, BufferId, Lsn, Result, TxnId};
use crate::storage::page::{Page, PageFormatter};
use crate::storage::{FileManager, WriteAheadLog};

/// Logical clock shared by every buffer of one pool.
///
/// Each tick is strictly greater than the last, so access times are unique
/// and LRU ordering never depends on timer resolution.
#[derive(Debug, Default)]
pub(crate) struct AccessClock(AtomicU64);

impl AccessClock {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub(crate) fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// State that must change together: the page image and what it belongs to.
struct Contents {
    page: Page,
    block: Option<Block>,
    /// `Some` iff the page differs from its block on disk.
    modified_by: Option<TxnId>,
    /// Log record that must be durable before the page is written.
    lsn: Option<Lsn>,
}

/// A frame in the buffer pool.
///
/// Buffers are created once, when the pool is built, and are never freed
/// individually; only their contents change as blocks are assigned.
///
/// # Thread Safety
/// - `contents`: `Mutex` so a flush sees the page, block and dirty marker
///   as one consistent unit
/// - `pin_count`: `AtomicU32`, mutated only under the pool lock, readable
///   lock-free by the replacement policies
/// - `last_access`, `second_chance`: atomics for the same reason
///
/// # Write-ahead ordering
/// [`flush`](Buffer::flush) forces the log through the buffer's LSN before
/// writing the page. If the log flush fails the page is not written and the
/// buffer stays dirty.
pub struct Buffer {
    id: BufferId,
    contents: Mutex<Contents>,
    pin_count: AtomicU32,
    last_access: AtomicU64,
    second_chance: AtomicBool,
    clock: Arc<AccessClock>,
    files: Arc<FileManager>,
    log: Arc<dyn WriteAheadLog>,
}

impl Buffer {
    pub(crate) fn new(
        id: BufferId,
        files: Arc<FileManager>,
        log: Arc<dyn WriteAheadLog>,
        clock: Arc<AccessClock>,
    ) -> Self {
        let last_access = AtomicU64::new(clock.tick());
        Self {
            id,
            contents: Mutex::new(Contents {
                page: Page::new(),
                block: None,
                modified_by: None,
                lsn: None,
            }),
            pin_count: AtomicU32::new(0),
            last_access,
            second_chance: AtomicBool::new(true),
            clock,
            files,
            log,
        }
    }

    /// Slot index of this buffer in its pool.
    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    // ========================================================================
    // Page access
    // ========================================================================

    /// Read the integer at `offset`.
    pub fn get_int(&self, offset: usize) -> Result<i32> {
        self.touch();
        self.contents.lock().page.get_int(offset)
    }

    /// Read the string at `offset`.
    pub fn get_string(&self, offset: usize) -> Result<String> {
        self.touch();
        self.contents.lock().page.get_string(offset)
    }

    /// Write an integer on behalf of `txn`.
    ///
    /// The caller must already have logged the change. `lsn` names that log
    /// record; `None` means no record was needed and keeps the previously
    /// recorded LSN.
    pub fn set_int(&self, offset: usize, value: i32, txn: TxnId, lsn: Option<Lsn>) -> Result<()> {
        self.touch();
        let mut contents = self.contents.lock();
        contents.page.set_int(offset, value)?;
        Self::mark_modified(&mut contents, txn, lsn);
        Ok(())
    }

    /// Write a string on behalf of `txn`. See [`set_int`](Buffer::set_int).
    pub fn set_string(&self, offset: usize, value: &str, txn: TxnId, lsn: Option<Lsn>) -> Result<()> {
        self.touch();
        let mut contents = self.contents.lock();
        contents.page.set_string(offset, value)?;
        Self::mark_modified(&mut contents, txn, lsn);
        Ok(())
    }

    /// Block currently held, or `None` before the first assignment.
    ///
    /// Counts as an access.
    pub fn block(&self) -> Option<Block> {
        self.touch();
        self.contents.lock().block.clone()
    }

    /// Block currently held, without counting as an access.
    pub(crate) fn current_block(&self) -> Option<Block> {
        self.contents.lock().block.clone()
    }

    // ========================================================================
    // Pin count operations
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.touch();
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0. The count stays at 0.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        self.touch();
        match self
            .pin_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |pins| pins.checked_sub(1))
        {
            Ok(old) => old - 1,
            Err(_) => panic!("pin count underflow"),
        }
    }

    /// Get the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    /// Check if the buffer is currently pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty state
    // ========================================================================

    /// Whether the page holds changes not yet written to its block.
    pub fn is_dirty(&self) -> bool {
        self.contents.lock().modified_by.is_some()
    }

    /// Whether `txn` made the unflushed changes.
    pub fn is_modified_by(&self, txn: TxnId) -> bool {
        self.contents.lock().modified_by == Some(txn)
    }

    /// LSN recorded by the latest logged write.
    pub fn lsn(&self) -> Option<Lsn> {
        self.contents.lock().lsn
    }

    // ========================================================================
    // Replacement policy bookkeeping
    // ========================================================================

    /// Logical time of the most recent access.
    #[inline]
    pub fn last_access_time(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn has_second_chance(&self) -> bool {
        self.second_chance.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_second_chance(&self, second_chance: bool) {
        self.second_chance.store(second_chance, Ordering::Relaxed);
    }

    // ========================================================================
    // Disk transfer
    // ========================================================================

    /// Write the page to its block if dirty, log first.
    ///
    /// Returns whether a page write happened. Flushing a clean buffer is a
    /// no-op.
    pub(crate) fn flush(&self) -> Result<bool> {
        self.touch();
        let mut contents = self.contents.lock();
        self.flush_contents(&mut contents)
    }

    /// Flush any dirty content, then load `block` and reset the pin count.
    ///
    /// Returns whether the previous content had to be written out.
    pub(crate) fn assign_to_block(&self, block: Block) -> Result<bool> {
        let mut contents = self.contents.lock();
        let flushed = self.flush_contents(&mut contents)?;

        contents.block = None;
        contents.lsn = None;
        self.files.read(&block, &mut contents.page)?;
        trace!("{} loaded {}", self.id, block);
        contents.block = Some(block);
        self.pin_count.store(0, Ordering::Relaxed);
        Ok(flushed)
    }

    /// Flush any dirty content, format a fresh page and append it to
    /// `filename` as a new block.
    ///
    /// Returns whether the previous content had to be written out.
    pub(crate) fn assign_to_new(&self, filename: &str, formatter: &dyn PageFormatter) -> Result<bool> {
        let mut contents = self.contents.lock();
        let flushed = self.flush_contents(&mut contents)?;

        contents.block = None;
        contents.lsn = None;
        formatter.format(&mut contents.page);
        let block = self.files.append(filename, &contents.page)?;
        trace!("{} appended {}", self.id, block);
        contents.block = Some(block);
        self.pin_count.store(0, Ordering::Relaxed);
        Ok(flushed)
    }

    fn flush_contents(&self, contents: &mut Contents) -> Result<bool> {
        if contents.modified_by.is_none() {
            return Ok(false);
        }
        let Some(block) = contents.block.as_ref() else {
            return Ok(false);
        };

        if let Some(lsn) = contents.lsn {
            self.log.flush(lsn)?;
        }
        self.files.write(block, &contents.page)?;
        trace!("{} flushed {}", self.id, block);
        contents.modified_by = None;
        Ok(true)
    }

    fn mark_modified(contents: &mut Contents, txn: TxnId, lsn: Option<Lsn>) {
        contents.modified_by = Some(txn);
        if lsn.is_some() {
            contents.lsn = lsn;
        }
    }

    #[inline]
    fn touch(&self) {
        self.last_access.store(self.clock.tick(), Ordering::Relaxed);
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contents = self.contents.lock();
        write!(f, "{} {{ block: ", self.id)?;
        match &contents.block {
            Some(block) => write!(f, "{}", block)?,
            None => write!(f, "none")?,
        }
        write!(f, ", pins: {}, modified_by: ", self.pin_count())?;
        match contents.modified_by {
            Some(txn) => write!(f, "{}", txn)?,
            None => write!(f, "none")?,
        }
        write!(f, ", lsn: ")?;
        match contents.lsn {
            Some(lsn) => write!(f, "{}", lsn)?,
            None => write!(f, "none")?,
        }
        write!(
            f,
            ", last_access: {}, second_chance: {} }}",
            self.last_access_time(),
            self.has_second_chance()
        )
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
