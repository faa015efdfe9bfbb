//! Message payloads.

use crate::errors::EnvelopeError;
use crate::wire::Encoding;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// The body of a message.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Binary(#[serde_as(as = "Bytes")] Vec<u8>),
    Json(String),
    Protobuf {
        schema_id: String,
        #[serde_as(as = "Bytes")]
        bytes: Vec<u8>,
    },
    #[default]
    Empty,
}

impl Payload {
    /// Serializes `value` into a JSON payload.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, EnvelopeError> {
        serde_json::to_string(value)
            .map(Payload::Json)
            .map_err(|e| EnvelopeError::Encode {
                encoding: Encoding::JsonCanonical,
                reason: e.to_string(),
            })
    }

    /// Size of the payload body in bytes. This is the figure checked against
    /// the configured maximum.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Payload::Binary(bytes) => bytes.len(),
            Payload::Json(text) => text.len(),
            Payload::Protobuf { bytes, .. } => bytes.len(),
            Payload::Empty => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }

    /// Raw body bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Binary(bytes) => bytes,
            Payload::Json(text) => text.as_bytes(),
            Payload::Protobuf { bytes, .. } => bytes,
            Payload::Empty => &[],
        }
    }
}
