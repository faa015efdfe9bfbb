//! # Priority Queue
//!
//! Bounded queue over the five message priorities.
//!
//! Ordering: priority descending, then timestamp ascending (FIFO within a
//! level). At capacity, an arrival of strictly higher priority than the
//! current lowest entry displaces the oldest entry of that lowest level;
//! anything else is rejected.

use courier_envelope::{Priority, UnixMillis};
use tracing::warn;

/// Outcome of [`PriorityQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    /// Enqueued after dropping one entry of this priority.
    EnqueuedWithDrop(Priority),
    Rejected,
}

#[derive(Debug, Clone)]
struct QueuedItem<T> {
    priority: Priority,
    timestamp: UnixMillis,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    entries: Vec<QueuedItem<T>>,
    max_size: usize,
}

impl<T> PriorityQueue<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    pub fn enqueue(
        &mut self,
        priority: Priority,
        payload: T,
        timestamp: UnixMillis,
    ) -> EnqueueOutcome {
        self.enqueue_evicting(priority, payload, timestamp).0
    }

    /// [`enqueue`](Self::enqueue), also handing back the evicted payload.
    pub fn enqueue_evicting(
        &mut self,
        priority: Priority,
        payload: T,
        timestamp: UnixMillis,
    ) -> (EnqueueOutcome, Option<T>) {
        let item = QueuedItem {
            priority,
            timestamp,
            payload,
        };

        if self.entries.len() < self.max_size {
            self.insert_ordered(item);
            return (EnqueueOutcome::Enqueued, None);
        }

        let Some(lowest) = self.entries.last().map(|e| e.priority) else {
            return (EnqueueOutcome::Rejected, None);
        };
        if priority <= lowest {
            return (EnqueueOutcome::Rejected, None);
        }

        // Oldest entry of the lowest level is first within its group.
        let victim = self.entries.partition_point(|e| e.priority > lowest);
        let dropped = self.entries.remove(victim);
        warn!(
            dropped = dropped.priority.as_str(),
            dropped_at = dropped.timestamp,
            incoming = priority.as_str(),
            "Priority queue full, evicting lowest-priority entry"
        );
        self.insert_ordered(item);
        (EnqueueOutcome::EnqueuedWithDrop(lowest), Some(dropped.payload))
    }

    /// Pops the highest-priority, oldest entry.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.remove(0).payload)
    }

    pub fn peek(&self) -> Option<(Priority, &T)> {
        self.entries.first().map(|e| (e.priority, &e.payload))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_size
    }

    fn insert_ordered(&mut self, item: QueuedItem<T>) {
        let position = self.entries.partition_point(|e| {
            e.priority > item.priority
                || (e.priority == item.priority && e.timestamp <= item.timestamp)
        });
        self.entries.insert(position, item);
    }
}
