//! CLOCK (second-chance) replacement policy.

use std::sync::Arc;

use log::{debug, warn};

use crate::buffer::replacer::ReplacementPolicy;
use crate::buffer::Buffer;
use crate::common::BufferId;

/// Sweeps a hand around the frame array, sparing buffers whose
/// second-chance bit is set.
///
/// For each frame under the hand:
/// - pinned: skip
/// - unpinned, bit set: clear the bit and move on
/// - unpinned, bit clear: victim; its bit is set again for the next tenancy
///
/// The hand persists across calls. A scan gives up after
/// `buffers.len() * max_cycles` steps.
#[derive(Debug)]
pub struct ClockPolicy {
    hand: usize,
    max_cycles: usize,
}

impl ClockPolicy {
    pub fn new(max_cycles: usize) -> Self {
        Self {
            hand: 0,
            max_cycles,
        }
    }

    /// Slot the next scan starts from.
    pub fn hand(&self) -> usize {
        self.hand
    }
}

impl ReplacementPolicy for ClockPolicy {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn choose_victim(&mut self, buffers: &[Arc<Buffer>]) -> Option<BufferId> {
        let len = buffers.len();
        if len == 0 {
            return None;
        }

        for _ in 0..len * self.max_cycles {
            let buffer = &buffers[self.hand % len];
            self.hand = (self.hand + 1) % len;

            if buffer.is_pinned() {
                continue;
            }
            if buffer.has_second_chance() {
                buffer.set_second_chance(false);
                continue;
            }

            buffer.set_second_chance(true);
            debug!("clock hand chose {}", buffer.id());
            return Some(buffer.id());
        }

        warn!(
            "clock scan gave up after {} steps over {} buffers",
            len * self.max_cycles,
            len
        );
        None
    }

    fn record_hit(&mut self, buffer: &Buffer) {
        buffer.set_second_chance(true);
    }
}
