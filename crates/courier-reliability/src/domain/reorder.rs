//! # Reorder Buffer
//!
//! Bounded reordering for one ordered source. Entries ahead of `expected_next`
//! are held sorted by sequence until the gap fills, the window overflows, or
//! they have waited longer than `max_wait_ms`.
//!
//! ## Release Paths
//!
//! | Trigger | Outcome |
//! |---------|---------|
//! | `sequence == expected_next`, nothing to drain | `Deliver` |
//! | `sequence == expected_next`, consecutive entries held | `WindowFull([new, ..drained])` |
//! | `sequence > expected_next`, window has room | `GapDetected(missing)` |
//! | `sequence > expected_next`, window full | `WindowFull(flushed)` |
//! | held longer than `max_wait_ms` | returned by `check_timeout` |
//!
//! Forced releases skip the gap. Everything released is in ascending sequence
//! order across all paths, so delivery order never goes backwards. Once
//! `u64::MAX` has been released the source is exhausted and every further
//! arrival is `TooOld`.

use courier_envelope::UnixMillis;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Upper bound on how many missing sequences a single outcome lists.
pub const MAX_REPORTED_GAP: usize = 4_096;

/// Outcome of [`ReorderBuffer::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    /// In order; release this payload.
    Deliver(T),
    /// Already delivered, or already held. Discard.
    TooOld,
    /// Several payloads released at once, in sequence order.
    WindowFull(Vec<T>),
    /// Held; these sequences are still outstanding, lowest first.
    GapDetected(Vec<u64>),
}

#[derive(Debug, Clone)]
struct ReorderEntry<T> {
    sequence: u64,
    payload: T,
    arrived_at: UnixMillis,
}

/// Per-source reorder buffer.
#[derive(Debug, Clone)]
pub struct ReorderBuffer<T> {
    source_id: String,
    expected_next: u64,
    /// Set once `u64::MAX` has been released.
    exhausted: bool,
    held: VecDeque<ReorderEntry<T>>,
    max_window_size: usize,
    max_wait_ms: u64,
}

impl<T> ReorderBuffer<T> {
    pub fn new(source_id: impl Into<String>, max_window_size: usize, max_wait_ms: u64) -> Self {
        Self::starting_at(source_id, 0, max_window_size, max_wait_ms)
    }

    /// Buffer whose first expected sequence is `expected_next`.
    pub fn starting_at(
        source_id: impl Into<String>,
        expected_next: u64,
        max_window_size: usize,
        max_wait_ms: u64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            expected_next,
            exhausted: false,
            held: VecDeque::with_capacity(max_window_size.min(1024)),
            max_window_size,
            max_wait_ms,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn expected_next(&self) -> u64 {
        self.expected_next
    }

    /// Number of held entries.
    pub fn pending_count(&self) -> usize {
        self.held.len()
    }

    /// Sequences between `expected_next` and the highest held entry that have
    /// not arrived.
    pub fn missing(&self) -> Vec<u64> {
        let Some(highest) = self.held.back().map(|e| e.sequence) else {
            return Vec::new();
        };
        let mut held = self.held.iter().map(|e| e.sequence).peekable();
        let mut missing = Vec::new();
        for sequence in self.expected_next..highest {
            while held.next_if(|&s| s < sequence).is_some() {}
            if held.next_if_eq(&sequence).is_none() {
                missing.push(sequence);
                if missing.len() == MAX_REPORTED_GAP {
                    break;
                }
            }
        }
        missing
    }

    /// Feeds one sequenced payload arriving at `now`.
    pub fn insert(&mut self, sequence: u64, payload: T, now: UnixMillis) -> InsertOutcome<T> {
        if sequence < self.expected_next || self.exhausted {
            return InsertOutcome::TooOld;
        }

        if sequence == self.expected_next {
            self.release(sequence);
            let drained = self.drain_consecutive();
            if drained.is_empty() {
                return InsertOutcome::Deliver(payload);
            }
            let mut released = Vec::with_capacity(drained.len() + 1);
            released.push(payload);
            released.extend(drained);
            return InsertOutcome::WindowFull(released);
        }

        let position = match self.held.binary_search_by_key(&sequence, |e| e.sequence) {
            Ok(_) => {
                debug!(
                    source = %self.source_id,
                    sequence,
                    "Sequence already held, discarding duplicate"
                );
                return InsertOutcome::TooOld;
            }
            Err(position) => position,
        };

        let entry = ReorderEntry {
            sequence,
            payload,
            arrived_at: now,
        };

        if self.held.len() < self.max_window_size {
            self.held.insert(position, entry);
            return InsertOutcome::GapDetected(self.missing());
        }

        InsertOutcome::WindowFull(self.force_flush(position, entry))
    }

    /// Releases entries held longer than `max_wait_ms`, skipping any gap
    /// below them.
    pub fn check_timeout(&mut self, now: UnixMillis) -> Vec<T> {
        let max_wait_ms = self.max_wait_ms;
        let cutoff = self
            .held
            .iter()
            .filter(|e| now.saturating_sub(e.arrived_at) > max_wait_ms)
            .map(|e| e.sequence)
            .max();

        let Some(cutoff) = cutoff else {
            return Vec::new();
        };

        // Everything at or below the oldest-waiting sequence goes out with it.
        let split = self.held.partition_point(|e| e.sequence <= cutoff);
        let mut released: Vec<T> = self.held.drain(..split).map(|e| e.payload).collect();
        let skipped_from = self.expected_next;
        self.release(cutoff);
        released.extend(self.drain_consecutive());

        warn!(
            source = %self.source_id,
            skipped_from,
            expected_next = self.expected_next,
            released = released.len(),
            "Reorder wait exceeded, releasing past gap"
        );
        crate::metrics::record_forced_flush("timeout");

        released
    }

    fn force_flush(&mut self, position: usize, entry: ReorderEntry<T>) -> Vec<T> {
        let skipped_from = self.expected_next;
        let incoming_sequence = entry.sequence;
        let mut pending = Some(entry);

        // An arrival inside the held range is flushed with it.
        if position < self.held.len() {
            if let Some(entry) = pending.take() {
                self.held.insert(position, entry);
            }
        }

        let mut released = Vec::with_capacity(self.held.len() + 1);
        while let Some(held) = self.held.pop_front() {
            self.release(held.sequence);
            released.push(held.payload);
        }

        if let Some(entry) = pending {
            if entry.sequence == self.expected_next && !self.exhausted {
                self.release(entry.sequence);
                released.push(entry.payload);
            } else {
                self.held.push_back(entry);
            }
        }

        warn!(
            source = %self.source_id,
            sequence = incoming_sequence,
            skipped_from,
            expected_next = self.expected_next,
            released = released.len(),
            "Reorder window full, force-flushing held entries"
        );
        crate::metrics::record_forced_flush("window_full");

        released
    }

    fn drain_consecutive(&mut self) -> Vec<T> {
        let mut drained = Vec::new();
        while !self.exhausted
            && self
                .held
                .front()
                .is_some_and(|e| e.sequence == self.expected_next)
        {
            if let Some(entry) = self.held.pop_front() {
                self.release(entry.sequence);
                drained.push(entry.payload);
            }
        }
        drained
    }

    /// Moves `expected_next` past `sequence`.
    fn release(&mut self, sequence: u64) {
        match sequence.checked_add(1) {
            Some(next) => self.expected_next = next,
            None => {
                self.expected_next = u64::MAX;
                self.exhausted = true;
            }
        }
    }
}
