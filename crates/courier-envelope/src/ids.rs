//! # Message Identity
//!
//! 128-bit, time-ordered message identifiers. The all-zero value is reserved
//! as "absent" and fails validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A 128-bit message identifier split into two 64-bit halves.
///
/// Ordering compares `high` first, so ids produced by a
/// [`MessageIdGenerator`] sort by creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId {
    /// Upper 64 bits (generator: milliseconds << 16 | node id).
    pub high: u64,
    /// Lower 64 bits (generator: per-millisecond counter).
    pub low: u64,
}

impl MessageId {
    /// The reserved "absent/invalid" identifier.
    pub const NIL: Self = Self { high: 0, low: 0 };

    /// Creates an identifier from its halves.
    #[must_use]
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Creates a random (v4 UUID backed) identifier. Never nil.
    #[must_use]
    pub fn random() -> Self {
        let (high, low) = Uuid::new_v4().as_u64_pair();
        Self { high, low }
    }

    /// Returns true for the reserved all-zero identifier.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.high == 0 && self.low == 0
    }

    /// Returns the identifier as a single 128-bit value.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        ((self.high as u128) << 64) | self.low as u128
    }

    /// Builds an identifier from a 128-bit value.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self {
            high: (value >> 64) as u64,
            low: value as u64,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.high, self.low)
    }
}

/// Produces time-ordered, node-unique [`MessageId`]s.
///
/// One generator per sender instance. Layout:
/// - `high` = `millis << 16 | node_id`
/// - `low`  = counter within that millisecond, starting at 1
///
/// If the supplied time goes backwards the generator keeps the last observed
/// millisecond and continues counting, so ids stay strictly increasing.
#[derive(Debug, Clone)]
pub struct MessageIdGenerator {
    node_id: u16,
    last_millis: u64,
    counter: u64,
}

impl MessageIdGenerator {
    /// Creates a generator for the given node.
    #[must_use]
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id,
            last_millis: 0,
            counter: 0,
        }
    }

    /// Returns the node id embedded in generated identifiers.
    #[must_use]
    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Generates the next identifier for the caller-supplied time.
    pub fn next_id(&mut self, now_millis: u64) -> MessageId {
        if now_millis > self.last_millis {
            self.last_millis = now_millis;
            self.counter = 1;
        } else {
            self.counter = self.counter.saturating_add(1);
        }

        // 48 bits of milliseconds is ~8900 years past the epoch.
        let high = (self.last_millis << 16) | u64::from(self.node_id);
        MessageId::new(high, self.counter)
    }
}
