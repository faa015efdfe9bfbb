//! # Response Correlation
//!
//! Numbers outgoing requests and matches incoming responses to them by
//! `correlation_id`. Anomalies are reported as [`SequencingError`]
//! diagnostics; the tracker never blocks or drops traffic.
//!
//! ## Rules
//!
//! - Request ids are issued from a per-tracker counter starting at 1.
//! - Responses are expected in request order. A response that overtakes an
//!   earlier outstanding request is reported as `OutOfOrderResponse` and still
//!   consumes its request.
//! - A request with no response after `timeout_ms` is reported once as
//!   `MissingResponse` and forgotten.

use courier_envelope::{MessageId, UnixMillis};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::debug;

/// Request/response sequencing anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencingError {
    #[error("Response to request {request_id} arrived while request {expected} is still outstanding")]
    OutOfOrderResponse { request_id: u64, expected: u64 },

    #[error("Message {0} is already awaiting a response")]
    DuplicateRequestId(MessageId),

    #[error("No response to request {request_id} ({message_id}) after {waited_ms}ms")]
    MissingResponse {
        request_id: u64,
        message_id: MessageId,
        waited_ms: u64,
    },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}

impl SequencingError {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SequencingError::OutOfOrderResponse { .. } => "out_of_order_response",
            SequencingError::DuplicateRequestId(_) => "duplicate_request_id",
            SequencingError::MissingResponse { .. } => "missing_response",
            SequencingError::ProtocolViolation(_) => "protocol_violation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutstandingRequest {
    request_id: u64,
    message_id: MessageId,
    sent_at: UnixMillis,
}

/// Outstanding requests in issue order.
#[derive(Debug, Clone)]
pub struct ResponseTracker {
    outstanding: VecDeque<OutstandingRequest>,
    next_request_id: u64,
    timeout_ms: u64,
}

impl ResponseTracker {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            outstanding: VecDeque::new(),
            next_request_id: 1,
            timeout_ms,
        }
    }

    /// Issues the next request id for `message_id`.
    ///
    /// The counter does not advance when the message is already outstanding.
    pub fn register(
        &mut self,
        message_id: MessageId,
        now: UnixMillis,
    ) -> Result<u64, SequencingError> {
        if self.is_outstanding(message_id) {
            return Err(SequencingError::DuplicateRequestId(message_id));
        }

        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);
        self.outstanding.push_back(OutstandingRequest {
            request_id,
            message_id,
            sent_at: now,
        });
        debug!(request_id, %message_id, "Registered request");
        Ok(request_id)
    }

    /// Matches a response by its `correlation_id`, returning the request id.
    pub fn on_response(
        &mut self,
        correlation_id: Option<MessageId>,
    ) -> Result<u64, SequencingError> {
        let correlation_id = correlation_id.ok_or_else(|| {
            SequencingError::ProtocolViolation("response without correlation id".to_string())
        })?;

        let position = self
            .outstanding
            .iter()
            .position(|request| request.message_id == correlation_id)
            .ok_or_else(|| {
                SequencingError::ProtocolViolation(format!(
                    "response to unknown request {correlation_id}"
                ))
            })?;

        let expected = self.outstanding.front().map(|request| request.request_id);
        let Some(matched) = self.outstanding.remove(position) else {
            return Err(SequencingError::ProtocolViolation(format!(
                "response to unknown request {correlation_id}"
            )));
        };

        match expected {
            Some(expected) if expected != matched.request_id => {
                Err(SequencingError::OutOfOrderResponse {
                    request_id: matched.request_id,
                    expected,
                })
            }
            _ => Ok(matched.request_id),
        }
    }

    /// Removes every request older than the timeout and reports each as missing.
    pub fn take_missing(&mut self, now: UnixMillis) -> Vec<SequencingError> {
        let timeout_ms = self.timeout_ms;
        let mut missing = Vec::new();
        self.outstanding.retain(|request| {
            let waited_ms = now.saturating_sub(request.sent_at);
            if waited_ms >= timeout_ms {
                missing.push(SequencingError::MissingResponse {
                    request_id: request.request_id,
                    message_id: request.message_id,
                    waited_ms,
                });
                false
            } else {
                true
            }
        });
        missing
    }

    pub fn is_outstanding(&self, message_id: MessageId) -> bool {
        self.outstanding
            .iter()
            .any(|request| request.message_id == message_id)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Whether any request has ever been registered.
    pub fn has_issued(&self) -> bool {
        self.next_request_id != 1
    }
}
