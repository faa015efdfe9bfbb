//! Pure, synchronous state machines. Every operation takes `now` from the
//! caller; nothing here reads a clock or blocks.

pub mod ack;
pub mod correlation;
pub mod credit;
pub mod dedup;
pub mod flow;
pub mod priority_queue;
pub mod reorder;
pub mod token_bucket;

pub use ack::{Ack, AckOutcome, AckTracker, PendingAck};
pub use correlation::{ResponseTracker, SequencingError};
pub use credit::{CreditFlow, CreditOutcome};
pub use dedup::{DedupCheck, DeduplicationStore};
pub use flow::{Admission, FlowControl, FlowDecision};
pub use priority_queue::{EnqueueOutcome, PriorityQueue};
pub use reorder::{InsertOutcome, ReorderBuffer, MAX_REPORTED_GAP};
pub use token_bucket::{TokenBucket, TokenOutcome};
