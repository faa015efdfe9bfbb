//! # Courier Reliability
//!
//! Per-channel delivery guarantees on top of the canonical envelope:
//! deduplication, bounded reordering, flow control and ack tracking.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ adapters::ChannelDriver   one tokio task per channel             │
//! │        │ validate + process + deliver                            │
//! │        ▼                                                         │
//! │ service::ReliabilityController                                   │
//! │        │                                                         │
//! │        ├── domain::DeduplicationStore   idempotency tokens       │
//! │        ├── domain::FlowControl          credit | bucket | queue  │
//! │        ├── domain::ReorderBuffer        bounded reordering       │
//! │        ├── domain::ResponseTracker      request/response checks  │
//! │        └── domain::AckTracker           send-side acks           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - Domain operations are synchronous and take `now` from the caller.
//! - Ordinary outcomes (duplicate, too old, no credit, window full) are enum
//!   values, never errors.
//! - A channel has exactly one owner at a time; different channels share
//!   nothing.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{ChannelDriver, ChannelHandle, DriverError, MemorySink, Receipt};
pub use config::{
    AckConfig, ConfigError, CorrelationConfig, DedupConfig, DeliveryMode, FlowConfig,
    ReliabilityConfig, ReorderConfig,
};
pub use domain::{
    Ack, AckOutcome, AckTracker, Admission, CreditFlow, CreditOutcome, DedupCheck,
    DeduplicationStore, EnqueueOutcome, FlowControl, FlowDecision, InsertOutcome, PendingAck,
    PriorityQueue, ReorderBuffer, ResponseTracker, SequencingError, TokenBucket, TokenOutcome,
};
pub use ports::{DeliverySink, ManualTimeSource, SinkError, SystemTimeSource, TimeSource};
pub use service::{ChannelStats, ProcessResult, ReliabilityController, SEQUENCE_HEADER};
