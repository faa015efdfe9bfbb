//! Message builders for cross-crate tests.

use courier_envelope::{
    AuthContext, Message, MessageId, MessageType, Payload, Priority, ResponseStatus, Timestamp,
};
use courier_reliability::SEQUENCE_HEADER;

/// Auth context that never expires.
pub fn system_auth() -> AuthContext {
    AuthContext::system(0, u64::MAX)
}

/// A valid event message numbered `n`. The id's low half is `n + 1`.
pub fn event(n: u64) -> Message {
    Message::builder(
        MessageId::new(7, n + 1),
        Timestamp::from_millis(1_000 + n, 7),
        MessageType::Event("inventory.adjusted".into()),
        system_auth(),
    )
    .payload(Payload::Json(format!(r#"{{"n":{n}}}"#)))
    .build()
}

/// [`event`] carrying sequence `n`.
pub fn sequenced(n: u64) -> Message {
    event(n).with_header(SEQUENCE_HEADER, n.to_string())
}

/// [`event`] with a priority and no sequence.
pub fn prioritized(n: u64, priority: Priority) -> Message {
    event(n).with_priority(priority)
}

/// A command carrying an idempotency token.
pub fn command(n: u64, token: &str) -> Message {
    Message::builder(
        MessageId::new(9, n + 1),
        Timestamp::from_millis(2_000 + n, 9),
        MessageType::Command("inventory.reserve".into()),
        system_auth(),
    )
    .payload(Payload::Json(format!(r#"{{"sku":"A-{n}"}}"#)))
    .idempotency_token(token)
    .build()
}

/// Ok response correlated with `request`.
pub fn response_to(request: &Message) -> Message {
    Message::builder(
        MessageId::new(11, request.id().low),
        Timestamp::from_millis(3_000, 11),
        MessageType::Response(ResponseStatus::Ok),
        system_auth(),
    )
    .correlation_id(request.id())
    .build()
}

/// Recovers `n` from a message built by this module.
pub fn number(message: &Message) -> u64 {
    message.id().low - 1
}

pub fn numbers(messages: &[Message]) -> Vec<u64> {
    messages.iter().map(number).collect()
}
