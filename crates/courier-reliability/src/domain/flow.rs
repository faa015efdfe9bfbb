//! Flow-control dispatch over the configured strategy.

use super::credit::{CreditFlow, CreditOutcome};
use super::priority_queue::{EnqueueOutcome, PriorityQueue};
use super::token_bucket::{TokenBucket, TokenOutcome};
use crate::config::FlowConfig;
use courier_envelope::{Priority, UnixMillis};
use serde::{Deserialize, Serialize};

/// Why admission was refused, naming the strategy that refused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowDecision {
    NoCredit,
    FlowPaused,
    TokenDenied { wait_ms: u64 },
    QueueFull { priority: Priority },
}

impl FlowDecision {
    pub fn strategy(&self) -> &'static str {
        match self {
            FlowDecision::NoCredit | FlowDecision::FlowPaused => "credit",
            FlowDecision::TokenDenied { .. } => "token_bucket",
            FlowDecision::QueueFull { .. } => "priority",
        }
    }

    /// Suggested back-off, when the strategy gives one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            FlowDecision::TokenDenied { wait_ms } => Some(*wait_ms),
            _ => None,
        }
    }
}

/// Result of [`FlowControl::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<T> {
    /// Proceed with this item now.
    Admitted(T),
    /// Held in the priority queue until drained. `evicted` is the entry
    /// displaced to make room, if any.
    Queued {
        dropped: Option<Priority>,
        evicted: Option<T>,
    },
    Rejected(FlowDecision),
}

/// The one strategy a channel runs, or none.
#[derive(Debug, Clone)]
pub enum FlowControl<T> {
    Unlimited,
    Credit(CreditFlow),
    TokenBucket(TokenBucket),
    Priority(PriorityQueue<T>),
}

impl<T> FlowControl<T> {
    pub fn from_config(config: &FlowConfig, now: UnixMillis) -> Self {
        match *config {
            FlowConfig::None => FlowControl::Unlimited,
            FlowConfig::Credit {
                max_credits,
                replenish_amount,
            } => FlowControl::Credit(CreditFlow::new(max_credits, replenish_amount)),
            FlowConfig::TokenBucket {
                capacity,
                refill_rate,
                refill_interval_ms,
            } => FlowControl::TokenBucket(TokenBucket::new(
                capacity,
                refill_rate,
                refill_interval_ms,
                now,
            )),
            FlowConfig::Priority { max_size } => FlowControl::Priority(PriorityQueue::new(max_size)),
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            FlowControl::Unlimited => "none",
            FlowControl::Credit(_) => "credit",
            FlowControl::TokenBucket(_) => "token_bucket",
            FlowControl::Priority(_) => "priority",
        }
    }

    pub fn admit(&mut self, item: T, priority: Priority, now: UnixMillis) -> Admission<T> {
        match self {
            FlowControl::Unlimited => Admission::Admitted(item),
            FlowControl::Credit(credit) => match credit.consume() {
                CreditOutcome::CreditAvailable(_) => Admission::Admitted(item),
                CreditOutcome::NoCredit => Admission::Rejected(FlowDecision::NoCredit),
                CreditOutcome::FlowPaused => Admission::Rejected(FlowDecision::FlowPaused),
            },
            FlowControl::TokenBucket(bucket) => match bucket.try_acquire(now) {
                TokenOutcome::TokenGranted(_) => Admission::Admitted(item),
                TokenOutcome::TokenDenied { wait_ms } => {
                    Admission::Rejected(FlowDecision::TokenDenied { wait_ms })
                }
            },
            FlowControl::Priority(queue) => match queue.enqueue_evicting(priority, item, now) {
                (EnqueueOutcome::Enqueued, _) => Admission::Queued {
                    dropped: None,
                    evicted: None,
                },
                (EnqueueOutcome::EnqueuedWithDrop(dropped), evicted) => Admission::Queued {
                    dropped: Some(dropped),
                    evicted,
                },
                (EnqueueOutcome::Rejected, _) => {
                    Admission::Rejected(FlowDecision::QueueFull { priority })
                }
            },
        }
    }

    /// Next item waiting in the priority queue.
    pub fn next_queued(&mut self) -> Option<T> {
        match self {
            FlowControl::Priority(queue) => queue.dequeue(),
            _ => None,
        }
    }

    pub fn queued_len(&self) -> usize {
        match self {
            FlowControl::Priority(queue) => queue.len(),
            _ => 0,
        }
    }

    pub fn credit_mut(&mut self) -> Option<&mut CreditFlow> {
        match self {
            FlowControl::Credit(credit) => Some(credit),
            _ => None,
        }
    }
}
