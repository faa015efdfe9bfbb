//! # Token Bucket
//!
//! Rate limiter allowing bursts up to `capacity` with a steady refill of
//! `refill_rate` tokens every `refill_interval_ms`.
//!
//! ## Algorithm
//!
//! Refill is lazy, on every call:
//! - `whole_intervals = (now - last_refill) / interval`
//! - add `whole_intervals * refill_rate`, capped at `capacity`
//! - advance `last_refill` by `whole_intervals * interval` (not to `now`), so
//!   partial-interval progress carries over to the next call

use courier_envelope::UnixMillis;
use serde::{Deserialize, Serialize};

/// Outcome of [`TokenBucket::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenOutcome {
    /// One token taken; this many remain.
    TokenGranted(u64),
    /// Empty; retry after `wait_ms`.
    TokenDenied { wait_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBucket {
    tokens: u64,
    capacity: u64,
    refill_rate: u64,
    refill_interval_ms: u64,
    last_refill: UnixMillis,
}

impl TokenBucket {
    /// Full bucket whose refill clock starts at `now`.
    pub fn new(capacity: u64, refill_rate: u64, refill_interval_ms: u64, now: UnixMillis) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            refill_interval_ms: refill_interval_ms.max(1),
            last_refill: now,
        }
    }

    pub fn try_acquire(&mut self, now: UnixMillis) -> TokenOutcome {
        self.refill(now);

        if self.tokens > 0 {
            self.tokens -= 1;
            return TokenOutcome::TokenGranted(self.tokens);
        }

        let since_refill = now.saturating_sub(self.last_refill);
        TokenOutcome::TokenDenied {
            wait_ms: self.refill_interval_ms.saturating_sub(since_refill),
        }
    }

    /// Tokens available at `now`, after refill.
    pub fn available(&mut self, now: UnixMillis) -> u64 {
        self.refill(now);
        self.tokens
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    fn refill(&mut self, now: UnixMillis) {
        let elapsed = now.saturating_sub(self.last_refill);
        let whole_intervals = elapsed / self.refill_interval_ms;
        if whole_intervals == 0 {
            return;
        }

        let added = whole_intervals.saturating_mul(self.refill_rate);
        self.tokens = self.tokens.saturating_add(added).min(self.capacity);
        self.last_refill += whole_intervals * self.refill_interval_ms;
    }
}
