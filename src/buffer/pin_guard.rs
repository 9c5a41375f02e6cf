//! RAII guard for pinned buffers.
//!
//! [`PinGuard`] derefs to the [`Buffer`] it holds and unpins it when
//! dropped, so early returns and `?` never leak a pin.

use std::ops::Deref;
use std::sync::Arc;

use super::buffer_pool_manager::BufferPoolManager;
use super::Buffer;

/// A pin on one buffer, released on drop.
///
/// # Example
/// ```ignore
/// let guard = bpm.pin_guarded(&block)?.expect("a free buffer");
/// let n = guard.get_int(0)?;
/// // guard drops here, buffer unpinned
/// ```
pub struct PinGuard<'a> {
    bpm: &'a BufferPoolManager,
    buffer: Arc<Buffer>,
    released: bool,
}

impl<'a> PinGuard<'a> {
    /// Called by `BufferPoolManager::pin_guarded()` and `pin_new_guarded()`.
    pub(crate) fn new(bpm: &'a BufferPoolManager, buffer: Arc<Buffer>) -> Self {
        Self {
            bpm,
            buffer,
            released: false,
        }
    }

    /// The pinned buffer, for callers that need to keep a handle.
    #[inline]
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Unpin now instead of at drop. Further calls have no effect.
    pub fn drop_guard(&mut self) {
        if !self.released {
            self.released = true;
            self.bpm.unpin(&self.buffer);
        }
    }
}

impl Deref for PinGuard<'_> {
    type Target = Buffer;

    #[inline]
    fn deref(&self) -> &Buffer {
        &self.buffer
    }
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}
