//! # Hybrid Logical Clock
//!
//! Timestamps combining wall-clock nanoseconds with a logical counter and a
//! node id. Ordering: `wall_nanos`, then `logical`, then `node_id`. The node id
//! only breaks exact ties for determinism; it is never a primary key.
//!
//! The clock never reads system time. Callers pass the physical time in.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Milliseconds since the Unix epoch, as supplied by the caller.
pub type UnixMillis = u64;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// A hybrid logical clock reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Physical component in nanoseconds since the Unix epoch.
    pub wall_nanos: u64,
    /// Logical counter for events sharing the same physical component.
    pub logical: u32,
    /// Originating node, used only as the final tie-break.
    pub node_id: u16,
}

impl Timestamp {
    /// Creates a timestamp.
    #[must_use]
    pub const fn new(wall_nanos: u64, logical: u32, node_id: u16) -> Self {
        Self {
            wall_nanos,
            logical,
            node_id,
        }
    }

    /// Creates a timestamp from milliseconds with a zero logical component.
    #[must_use]
    pub const fn from_millis(millis: UnixMillis, node_id: u16) -> Self {
        Self::new(millis.saturating_mul(NANOS_PER_MILLI), 0, node_id)
    }

    /// A message timestamp is valid only if its physical component is positive.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.wall_nanos > 0
    }

    /// Physical component truncated to milliseconds.
    #[must_use]
    pub const fn as_millis(&self) -> UnixMillis {
        self.wall_nanos / NANOS_PER_MILLI
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.wall_nanos
            .cmp(&other.wall_nanos)
            .then(self.logical.cmp(&other.logical))
            .then(self.node_id.cmp(&other.node_id))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-node hybrid logical clock.
///
/// ```text
/// local/send:  wall' = max(wall, pt)
///              logical' = wall' == wall ? logical + 1 : 0
///
/// receive:     wall' = max(wall, remote.wall, pt)
///              logical' depends on which inputs share wall'
/// ```
#[derive(Debug, Clone)]
pub struct HybridClock {
    node_id: u16,
    last: Timestamp,
}

impl HybridClock {
    /// Creates a clock for the given node.
    #[must_use]
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id,
            last: Timestamp::new(0, 0, node_id),
        }
    }

    /// The most recently issued reading.
    #[must_use]
    pub fn last(&self) -> Timestamp {
        self.last
    }

    /// Issues a timestamp for a local or send event.
    pub fn now(&mut self, physical_nanos: u64) -> Timestamp {
        if physical_nanos > self.last.wall_nanos {
            self.last = Timestamp::new(physical_nanos, 0, self.node_id);
        } else {
            self.last.logical = self.last.logical.saturating_add(1);
        }
        self.last
    }

    /// Merges a remote timestamp on receive and issues the resulting reading.
    pub fn update(&mut self, remote: &Timestamp, physical_nanos: u64) -> Timestamp {
        let wall = self
            .last
            .wall_nanos
            .max(remote.wall_nanos)
            .max(physical_nanos);

        let local_tied = wall == self.last.wall_nanos;
        let remote_tied = wall == remote.wall_nanos;

        let logical = match (local_tied, remote_tied) {
            (true, true) => self.last.logical.max(remote.logical).saturating_add(1),
            (true, false) => self.last.logical.saturating_add(1),
            (false, true) => remote.logical.saturating_add(1),
            (false, false) => 0,
        };

        self.last = Timestamp::new(wall, logical, self.node_id);
        self.last
    }
}
