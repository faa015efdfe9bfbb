//! # Acknowledgment Tracker
//!
//! Tracks sends awaiting acknowledgment and reports which are due for
//! retransmission.
//!
//! ## Ack Semantics
//!
//! | Ack | Clears |
//! |-----|--------|
//! | `Positive(seq)` | exactly `seq` |
//! | `Cumulative(up_to)` | every `seq <= up_to` |
//! | `Selective(seqs)` | every listed `seq` |
//! | `Negative(seq, reason)` | nothing; stays eligible for retransmission |
//!
//! Entries that exhaust `max_retries` are never offered for retransmission
//! again; [`AckTracker::take_exhausted`] hands them to the caller's failure
//! path.

use courier_envelope::UnixMillis;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Acknowledgment signal from the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ack {
    Positive(u64),
    Negative { sequence: u64, reason: String },
    Cumulative(u64),
    Selective(Vec<u64>),
}

/// A send awaiting acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAck {
    pub sequence: u64,
    pub sent_at: UnixMillis,
    pub retries: u32,
}

/// What an ack did to the pending set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AckOutcome {
    /// Entries removed.
    pub cleared: usize,
    /// Sequence named by a negative ack, if it is still pending.
    pub nacked: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AckTracker {
    pending: Vec<PendingAck>,
    timeout_ms: u64,
    max_retries: u32,
}

impl AckTracker {
    pub fn new(timeout_ms: u64, max_retries: u32) -> Self {
        Self {
            pending: Vec::new(),
            timeout_ms,
            max_retries,
        }
    }

    /// Starts tracking `sequence`. Re-recording a pending sequence restarts it.
    pub fn record_sent(&mut self, sequence: u64, now: UnixMillis) {
        let entry = PendingAck {
            sequence,
            sent_at: now,
            retries: 0,
        };
        match self.pending.iter_mut().find(|p| p.sequence == sequence) {
            Some(existing) => *existing = entry,
            None => self.pending.push(entry),
        }
    }

    pub fn process_ack(&mut self, ack: &Ack) -> AckOutcome {
        let before = self.pending.len();
        let nacked = match ack {
            Ack::Positive(sequence) => {
                self.pending.retain(|p| p.sequence != *sequence);
                None
            }
            Ack::Cumulative(up_to) => {
                self.pending.retain(|p| p.sequence > *up_to);
                None
            }
            Ack::Selective(sequences) => {
                self.pending.retain(|p| !sequences.contains(&p.sequence));
                None
            }
            Ack::Negative { sequence, reason } => {
                debug!(sequence, reason = %reason, "Negative ack, leaving pending");
                self.is_pending(*sequence).then_some(*sequence)
            }
        };

        AckOutcome {
            cleared: before - self.pending.len(),
            nacked,
        }
    }

    /// Sequences overdue and still within their retry budget.
    pub fn get_retransmit_needed(&self, now: UnixMillis) -> Vec<u64> {
        self.pending
            .iter()
            .filter(|p| self.is_overdue(p, now) && p.retries < self.max_retries)
            .map(|p| p.sequence)
            .collect()
    }

    /// Counts a retransmission of `sequence` and restarts its timer.
    pub fn mark_retransmitted(&mut self, sequence: u64, now: UnixMillis) -> bool {
        match self.pending.iter_mut().find(|p| p.sequence == sequence) {
            Some(entry) => {
                entry.retries += 1;
                entry.sent_at = now;
                true
            }
            None => false,
        }
    }

    /// Removes and returns overdue entries with no retries left.
    pub fn take_exhausted(&mut self, now: UnixMillis) -> Vec<PendingAck> {
        let (max_retries, timeout_ms) = (self.max_retries, self.timeout_ms);
        let (exhausted, pending): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|p| p.retries >= max_retries && now.saturating_sub(p.sent_at) > timeout_ms);
        self.pending = pending;

        if !exhausted.is_empty() {
            warn!(
                count = exhausted.len(),
                max_retries = self.max_retries,
                "Sends exhausted their retries"
            );
        }
        exhausted
    }

    pub fn is_pending(&self, sequence: u64) -> bool {
        self.pending.iter().any(|p| p.sequence == sequence)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn is_overdue(&self, pending: &PendingAck, now: UnixMillis) -> bool {
        now.saturating_sub(pending.sent_at) > self.timeout_ms
    }
}
