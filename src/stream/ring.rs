//! Fixed pool of pre-allocated frames cycled between a reader and a writer
//!
//! Cursors are monotonic frame counters; a counter maps onto slot
//! `counter % capacity`. The read cursor names the frame currently exposed to
//! the consumer (`-1` when nothing has been exposed since the last reset) and
//! the write cursor names the next slot to fill. The writer never fills the
//! slot under the read cursor.

use crate::frame::Frame;
use std::sync::Arc;

/// Ring of reference-counted frames.
///
/// Slots are handed out as `Arc<Frame>` so a consumer can keep a frame after
/// the ring has moved on; a slot still referenced elsewhere is swapped for a
/// fresh allocation before it is written again.
pub struct FrameRing {
    slots: Vec<Arc<Frame>>,
    read: i64,
    write: i64,
}

impl FrameRing {
    /// Allocate `capacity` frames shaped like `template` (at least one)
    pub fn new(template: &Frame, capacity: usize) -> Self {
        let slots = (0..capacity.max(1))
            .map(|_| Arc::new(Frame::new_like(template)))
            .collect();
        Self {
            slots,
            read: -1,
            write: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Grow the pool to `capacity` frames; cursors are reset
    pub fn increase(&mut self, capacity: usize) {
        let template = Frame::new_like(&self.slots[0]);
        while self.slots.len() < capacity {
            self.slots.push(Arc::new(Frame::new_like(&template)));
        }
        self.reset();
    }

    /// Forget every buffered frame
    pub fn reset(&mut self) {
        self.read = -1;
        self.write = 0;
    }

    /// Expose frame `index` with every slot before it considered consumed.
    ///
    /// Used when all frames of a sequence are resident and a seek only has to
    /// move the cursors.
    pub fn set_index(&mut self, index: usize) {
        self.read = index as i64;
        self.write = index as i64 + 1;
    }

    /// Expose the first buffered frame
    pub fn start_read(&mut self) -> Option<&Arc<Frame>> {
        if self.read < 0 {
            self.read = 0;
        }
        self.current()
    }

    /// Frame under the read cursor, if it has been written
    pub fn current(&self) -> Option<&Arc<Frame>> {
        (self.read >= 0 && self.read < self.write).then(|| &self.slots[self.slot(self.read)])
    }

    /// Frame filled by the latest write
    pub fn last_written(&self) -> Option<&Arc<Frame>> {
        (self.write > 0 && self.write > self.read).then(|| &self.slots[self.slot(self.write - 1)])
    }

    /// Frames written but not yet exposed
    pub fn available(&self) -> usize {
        (self.write - self.read - 1).max(0) as usize
    }

    /// Advance the read cursor to the next written frame
    pub fn read_one(&mut self) -> Option<&Arc<Frame>> {
        if self.read + 1 >= self.write {
            return None;
        }
        self.read += 1;
        self.current()
    }

    /// Whether a frame can be written without touching the exposed slot
    pub fn has_writing_slot(&self) -> bool {
        self.write - self.read.max(0) < self.slots.len() as i64
    }

    /// Claim the next slot for writing and advance the write cursor.
    ///
    /// Returns `None` when the ring is full.
    pub fn write_one(&mut self) -> Option<&mut Frame> {
        if !self.has_writing_slot() {
            return None;
        }
        let idx = self.slot(self.write);
        self.write += 1;

        let slot = &mut self.slots[idx];
        if Arc::strong_count(slot) > 1 {
            *slot = Arc::new(Frame::new_like(slot));
        }
        Some(Arc::make_mut(slot))
    }

    /// Roll back the last [`FrameRing::write_one`] after a failed fill
    pub fn discard_write(&mut self) {
        if self.write > self.read + 1 && self.write > 0 {
            self.write -= 1;
        }
    }

    /// Detach the frame under the read cursor and advance past it.
    ///
    /// The slot is refilled with a fresh allocation, so the returned frame is
    /// never shared with the ring.
    pub fn retrieve_frame(&mut self) -> Option<Arc<Frame>> {
        let idx = self.current().map(|_| self.slot(self.read))?;
        let fresh = Arc::new(Frame::new_like(&self.slots[idx]));
        let frame = std::mem::replace(&mut self.slots[idx], fresh);
        self.read += 1;
        Some(frame)
    }

    /// Frame at an absolute slot, regardless of cursors
    pub fn slot_frame(&self, index: usize) -> Option<&Arc<Frame>> {
        self.slots.get(index)
    }

    fn slot(&self, counter: i64) -> usize {
        counter.rem_euclid(self.slots.len() as i64) as usize
    }
}

impl std::fmt::Debug for FrameRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRing")
            .field("capacity", &self.slots.len())
            .field("read", &self.read)
            .field("write", &self.write)
            .finish()
    }
}
