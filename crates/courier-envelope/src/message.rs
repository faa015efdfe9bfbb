//! # Message Envelope
//!
//! The immutable message record. Fields are private; the only way to change a
//! message is a consuming `with_*` call that returns a new value.
//!
//! ## Canonical Field Order
//!
//! Field declaration order below IS the wire order. Do not reorder.
//!
//! | # | Field |
//! |---|-------|
//! | 1 | `id` |
//! | 2 | `timestamp` |
//! | 3 | `message_type` |
//! | 4 | `payload` |
//! | 5 | `trace_context` |
//! | 6 | `auth_context` |
//! | 7 | `correlation_id` |
//! | 8 | `reply_to` |
//! | 9 | `idempotency_token` |
//! | 10 | `ttl` |
//! | 11 | `priority` |
//! | 12 | `headers` |

use crate::auth::AuthContext;
use crate::hlc::Timestamp;
use crate::ids::MessageId;
use crate::payload::Payload;
use crate::trace::TraceContext;
use serde::{Deserialize, Serialize};

/// Serialized field order of [`Message`].
pub const CANONICAL_FIELD_ORDER: [&str; 12] = [
    "id",
    "timestamp",
    "message_type",
    "payload",
    "trace_context",
    "auth_context",
    "correlation_id",
    "reply_to",
    "idempotency_token",
    "ttl",
    "priority",
    "headers",
];

/// Delivery priority, lowest first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    Background,
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    /// All levels in ascending order.
    pub const ALL: [Priority; 5] = [
        Priority::Background,
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Critical,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Background => "background",
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

/// Outcome carried by a response message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseStatus {
    Ok,
    Accepted,
    Rejected,
    NotFound,
    Failed,
    TimedOut,
}

/// Control-plane message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemKind {
    Heartbeat,
    Ack,
    Nack,
    CreditGrant,
    Shutdown,
}

/// What the message is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Command(String),
    Query(String),
    Event(String),
    Response(ResponseStatus),
    System(SystemKind),
}

/// A name/value header. Duplicated names are allowed; order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    timestamp: Timestamp,
    message_type: MessageType,
    payload: Payload,
    trace_context: TraceContext,
    auth_context: AuthContext,
    correlation_id: Option<MessageId>,
    reply_to: Option<String>,
    idempotency_token: Option<String>,
    /// Time to live in milliseconds, measured from `timestamp`.
    ttl: Option<u64>,
    priority: Priority,
    headers: Vec<Header>,
}

impl Message {
    /// Starts a builder with the mandatory fields.
    #[must_use]
    pub fn builder(
        id: MessageId,
        timestamp: Timestamp,
        message_type: MessageType,
        auth_context: AuthContext,
    ) -> MessageBuilder {
        MessageBuilder {
            message: Message {
                id,
                timestamp,
                message_type,
                payload: Payload::Empty,
                trace_context: TraceContext::untraced(),
                auth_context,
                correlation_id: None,
                reply_to: None,
                idempotency_token: None,
                ttl: None,
                priority: Priority::Normal,
                headers: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn trace_context(&self) -> &TraceContext {
        &self.trace_context
    }

    pub fn auth_context(&self) -> &AuthContext {
        &self.auth_context
    }

    pub fn correlation_id(&self) -> Option<MessageId> {
        self.correlation_id
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn idempotency_token(&self) -> Option<&str> {
        self.idempotency_token.as_deref()
    }

    pub fn ttl(&self) -> Option<u64> {
        self.ttl
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// First header value with the given name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }

    /// Consumes the message, returning its payload.
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    #[must_use]
    pub fn with_payload(self, payload: Payload) -> Self {
        Self { payload, ..self }
    }

    #[must_use]
    pub fn with_trace_context(self, trace_context: TraceContext) -> Self {
        Self {
            trace_context,
            ..self
        }
    }

    #[must_use]
    pub fn with_correlation_id(self, correlation_id: MessageId) -> Self {
        Self {
            correlation_id: Some(correlation_id),
            ..self
        }
    }

    #[must_use]
    pub fn with_reply_to(self, reply_to: impl Into<String>) -> Self {
        Self {
            reply_to: Some(reply_to.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_idempotency_token(self, token: impl Into<String>) -> Self {
        Self {
            idempotency_token: Some(token.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_ttl(self, ttl_ms: u64) -> Self {
        Self {
            ttl: Some(ttl_ms),
            ..self
        }
    }

    #[must_use]
    pub fn with_priority(self, priority: Priority) -> Self {
        Self { priority, ..self }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Replaces every header with this name by a single one.
    #[must_use]
    pub fn with_header_replaced(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let header = Header::new(name, value);
        self.headers.retain(|h| h.name != header.name);
        self.headers.push(header);
        self
    }
}

/// Builder for [`Message`]. Consumed by [`MessageBuilder::build`].
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    #[must_use]
    pub fn payload(mut self, payload: Payload) -> Self {
        self.message.payload = payload;
        self
    }

    #[must_use]
    pub fn trace_context(mut self, trace_context: TraceContext) -> Self {
        self.message.trace_context = trace_context;
        self
    }

    #[must_use]
    pub fn correlation_id(mut self, correlation_id: MessageId) -> Self {
        self.message.correlation_id = Some(correlation_id);
        self
    }

    #[must_use]
    pub fn reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.message.reply_to = Some(reply_to.into());
        self
    }

    #[must_use]
    pub fn idempotency_token(mut self, token: impl Into<String>) -> Self {
        self.message.idempotency_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn ttl(mut self, ttl_ms: u64) -> Self {
        self.message.ttl = Some(ttl_ms);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.message.priority = priority;
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.message.headers.push(Header::new(name, value));
        self
    }

    #[must_use]
    pub fn build(self) -> Message {
        self.message
    }
}
