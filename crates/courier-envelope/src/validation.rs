//! # Boundary Validation
//!
//! `validate(message, now)` is a pure function. It accumulates every failure
//! instead of short-circuiting, so the caller sees the full defect list.
//!
//! | Check | Failure |
//! |-------|---------|
//! | `id` not all-zero | `MissingField("id")` |
//! | `timestamp.wall_nanos > 0` | `InvalidField` |
//! | `auth_context.expires_at > now` | `AuthExpired` |
//! | `timestamp + ttl > now` (if ttl) | `MessageExpired` |
//! | payload bytes <= max | `PayloadTooLarge` |

use crate::hlc::UnixMillis;
use crate::message::Message;
use thiserror::Error;

/// Default payload ceiling: 1 MiB.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// A single validation defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Message expired at {expired_at} (now: {now})")]
    MessageExpired { expired_at: UnixMillis, now: UnixMillis },

    #[error("Auth context expired at {expires_at} (now: {now})")]
    AuthExpired { expires_at: UnixMillis, now: UnixMillis },

    #[error("Payload too large: {actual} bytes exceeds maximum {max}")]
    PayloadTooLarge { actual: usize, max: usize },
}

/// Result of validating a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(Vec<ValidationError>),
}

impl Validation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    /// The defects, empty when valid.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            Validation::Valid => &[],
            Validation::Invalid(errors) => errors,
        }
    }
}

/// Validator with a configurable payload ceiling.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    max_payload_bytes: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_BYTES)
    }
}

impl Validator {
    #[must_use]
    pub fn new(max_payload_bytes: usize) -> Self {
        Self { max_payload_bytes }
    }

    #[must_use]
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Runs every boundary check against `message` at time `now`.
    #[must_use]
    pub fn validate(&self, message: &Message, now: UnixMillis) -> Validation {
        let mut errors = Vec::new();

        if message.id().is_nil() {
            errors.push(ValidationError::MissingField("id"));
        }

        let timestamp = message.timestamp();
        if !timestamp.is_valid() {
            errors.push(ValidationError::InvalidField {
                field: "timestamp",
                reason: "wall_nanos must be positive".to_string(),
            });
        }

        let auth = message.auth_context();
        if auth.is_expired(now) {
            errors.push(ValidationError::AuthExpired {
                expires_at: auth.expires_at,
                now,
            });
        }

        if let Some(ttl) = message.ttl() {
            let expired_at = timestamp.as_millis().saturating_add(ttl);
            if expired_at <= now {
                errors.push(ValidationError::MessageExpired { expired_at, now });
            }
        }

        let actual = message.payload().byte_len();
        if actual > self.max_payload_bytes {
            errors.push(ValidationError::PayloadTooLarge {
                actual,
                max: self.max_payload_bytes,
            });
        }

        if errors.is_empty() {
            Validation::Valid
        } else {
            Validation::Invalid(errors)
        }
    }
}

/// Validates with the default 1 MiB payload ceiling.
#[must_use]
pub fn validate(message: &Message, now: UnixMillis) -> Validation {
    Validator::default().validate(message, now)
}
