//! # Courier Envelope
//!
//! The canonical message envelope carried by every inter-component message:
//! identity, hybrid-logical timestamp, trace context, auth context, payload and
//! the wire wrapper used for deterministic serialization.
//!
//! ## Design Principles
//!
//! - **Immutable messages**: a [`Message`] is constructed once by the sender.
//!   Every `with_*` method consumes the value and returns a new one.
//! - **Accumulating validation**: [`validate`] never stops at the first defect,
//!   callers always see the full list.
//! - **Explicit time**: nothing in this crate reads a clock. Every time-dependent
//!   operation takes `now` from the caller.
//! - **Canonical field order**: the declaration order of [`Message`] is the wire
//!   order (see [`CANONICAL_FIELD_ORDER`]) so checksums stay stable across
//!   implementations sharing a wire format.

pub mod auth;
pub mod errors;
pub mod hlc;
pub mod ids;
pub mod message;
pub mod payload;
pub mod trace;
pub mod validation;
pub mod wire;

pub use auth::{Action, AuthContext, AuthMethod, Capability, Claim, Principal, ResourceType};
pub use errors::EnvelopeError;
pub use hlc::{HybridClock, Timestamp, UnixMillis};
pub use ids::{MessageId, MessageIdGenerator};
pub use message::{
    Header, Message, MessageBuilder, MessageType, Priority, ResponseStatus, SystemKind,
    CANONICAL_FIELD_ORDER,
};
pub use payload::Payload;
pub use trace::{TraceContext, TraceFlags, TraceId};
pub use validation::{validate, Validation, ValidationError, Validator, DEFAULT_MAX_PAYLOAD_BYTES};
pub use wire::{checksum, Encoding, Envelope, SCHEMA_VERSION};
