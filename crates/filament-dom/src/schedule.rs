//! Frame and timeout queues over a virtual clock.
//!
//! Nothing here runs by itself: the embedder (usually a test) pumps the
//! clock through [`Document::next_frame`](crate::Document::next_frame),
//! [`Document::advance`](crate::Document::advance) or
//! [`Document::run_until_stalled`](crate::Document::run_until_stalled).
//! Frame callbacks scheduled while a frame batch is running land in the
//! next batch, matching animation-frame semantics.

use crate::document::Document;

pub(crate) type Callback = Box<dyn FnOnce(&Document)>;

struct Timer {
    deadline: u64,
    seq: u64,
    cb: Callback,
}

#[derive(Default)]
pub(crate) struct Scheduler {
    now: u64,
    seq: u64,
    frames: Vec<Callback>,
    timers: Vec<Timer>,
}

impl Scheduler {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn push_frame(&mut self, cb: Callback) {
        self.frames.push(cb);
    }

    pub fn push_timer(&mut self, delay_ms: u64, cb: Callback) {
        let deadline = self.now.saturating_add(delay_ms);
        let seq = self.seq;
        self.seq += 1;
        self.timers.push(Timer { deadline, seq, cb });
    }

    /// Takes the current frame batch, leaving an empty queue for
    /// callbacks scheduled during the batch.
    pub fn take_frames(&mut self) -> Vec<Callback> {
        std::mem::take(&mut self.frames)
    }

    pub fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    /// Pops the earliest timer due at or before `limit`, advancing the
    /// clock to its deadline. Ties fire in scheduling order.
    pub fn pop_due(&mut self, limit: u64) -> Option<Callback> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= limit)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(i, _)| i)?;
        let timer = self.timers.swap_remove(idx);
        self.now = self.now.max(timer.deadline);
        Some(timer.cb)
    }

    pub fn settle(&mut self, at: u64) {
        self.now = self.now.max(at);
    }
}
