//! # Wire Envelope
//!
//! `{schema_version, encoding, checksum, message}`. The checksum detects
//! corruption only; it is not a security mechanism.
//!
//! ## Frame Layout
//!
//! ```text
//! ┌────────────────┬──────────────┬──────────────────┬─────────────────────┐
//! │ schema_version │ encoding tag │ checksum         │ canonical message   │
//! │ u16 BE         │ u8           │ u64 BE           │ bytes (encoding)    │
//! └────────────────┴──────────────┴──────────────────┴─────────────────────┘
//! ```
//!
//! Checksum = first 8 bytes (big-endian) of SHA-256 over the canonical message
//! bytes.

use crate::errors::EnvelopeError;
use crate::message::Message;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Current envelope schema version.
pub const SCHEMA_VERSION: u16 = 1;

const HEADER_LEN: usize = 2 + 1 + 8;

/// Body encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// bincode, fields in declaration order.
    #[default]
    Raw,
    /// JSON with struct fields in declaration order.
    JsonCanonical,
    /// Recognised but not encodable here (needs a schema registry).
    Protobuf,
    /// MessagePack with named fields in declaration order.
    MsgpackCanonical,
}

impl Encoding {
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Encoding::Raw => 0,
            Encoding::JsonCanonical => 1,
            Encoding::Protobuf => 2,
            Encoding::MsgpackCanonical => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, EnvelopeError> {
        match tag {
            0 => Ok(Encoding::Raw),
            1 => Ok(Encoding::JsonCanonical),
            2 => Ok(Encoding::Protobuf),
            3 => Ok(Encoding::MsgpackCanonical),
            other => Err(EnvelopeError::UnknownEncodingTag(other)),
        }
    }

    /// Serializes `message` canonically.
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, EnvelopeError> {
        let encoding = *self;
        let encode_err = |reason: String| EnvelopeError::Encode { encoding, reason };
        match self {
            Encoding::Raw => bincode::serialize(message).map_err(|e| encode_err(e.to_string())),
            Encoding::JsonCanonical => {
                serde_json::to_vec(message).map_err(|e| encode_err(e.to_string()))
            }
            Encoding::MsgpackCanonical => {
                rmp_serde::to_vec_named(message).map_err(|e| encode_err(e.to_string()))
            }
            Encoding::Protobuf => Err(EnvelopeError::UnsupportedEncoding(encoding)),
        }
    }

    /// Deserializes canonical bytes back into a message.
    pub fn decode(&self, bytes: &[u8]) -> Result<Message, EnvelopeError> {
        let encoding = *self;
        let decode_err = |reason: String| EnvelopeError::Decode { encoding, reason };
        match self {
            Encoding::Raw => bincode::deserialize(bytes).map_err(|e| decode_err(e.to_string())),
            Encoding::JsonCanonical => {
                serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string()))
            }
            Encoding::MsgpackCanonical => {
                rmp_serde::from_slice(bytes).map_err(|e| decode_err(e.to_string()))
            }
            Encoding::Protobuf => Err(EnvelopeError::UnsupportedEncoding(encoding)),
        }
    }
}

/// Corruption-detection checksum over canonical bytes.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// The wire wrapper around a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub schema_version: u16,
    pub encoding: Encoding,
    pub checksum: u64,
    pub message: Message,
}

impl Envelope {
    /// Wraps `message`, computing the checksum over its canonical bytes.
    pub fn seal(message: Message, encoding: Encoding) -> Result<Self, EnvelopeError> {
        let body = encoding.encode(&message)?;
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            encoding,
            checksum: checksum(&body),
            message,
        })
    }

    /// Recomputes the checksum and compares it with the stored one.
    pub fn verify(&self) -> Result<(), EnvelopeError> {
        let body = self.encoding.encode(&self.message)?;
        let actual = checksum(&body);
        if actual != self.checksum {
            return Err(EnvelopeError::ChecksumMismatch {
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }

    /// Frames the envelope for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        let body = self.encoding.encode(&self.message)?;
        let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
        frame.extend_from_slice(&self.schema_version.to_be_bytes());
        frame.push(self.encoding.tag());
        frame.extend_from_slice(&self.checksum.to_be_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Parses a frame, rejecting newer schemas and corrupted bodies.
    pub fn from_bytes(frame: &[u8]) -> Result<Self, EnvelopeError> {
        if frame.len() < HEADER_LEN {
            return Err(EnvelopeError::Truncated {
                len: frame.len(),
                needed: HEADER_LEN,
            });
        }

        let schema_version = u16::from_be_bytes([frame[0], frame[1]]);
        if schema_version > SCHEMA_VERSION {
            return Err(EnvelopeError::UnsupportedSchemaVersion {
                received: schema_version,
                supported: SCHEMA_VERSION,
            });
        }

        let encoding = Encoding::from_tag(frame[2])?;
        let mut sum = [0u8; 8];
        sum.copy_from_slice(&frame[3..HEADER_LEN]);
        let expected = u64::from_be_bytes(sum);

        let body = &frame[HEADER_LEN..];
        let actual = checksum(body);
        if actual != expected {
            warn!(expected, actual, len = frame.len(), "Rejected frame with bad checksum");
            return Err(EnvelopeError::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            schema_version,
            encoding,
            checksum: expected,
            message: encoding.decode(body)?,
        })
    }

    pub fn into_message(self) -> Message {
        self.message
    }
}
