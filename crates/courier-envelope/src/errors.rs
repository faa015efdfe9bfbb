//! # Error Types
//!
//! Failures of the wire layer. Validation defects and reliability outcomes are
//! ordinary return values and live elsewhere.

use crate::wire::Encoding;
use thiserror::Error;

/// Errors raised while sealing, framing or opening an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Serializing the message failed.
    #[error("Encoding as {encoding:?} failed: {reason}")]
    Encode { encoding: Encoding, reason: String },

    /// Deserializing the message failed.
    #[error("Decoding as {encoding:?} failed: {reason}")]
    Decode { encoding: Encoding, reason: String },

    /// Stored checksum does not match the canonical bytes (corruption).
    #[error("Checksum mismatch: expected {expected:#018x}, computed {actual:#018x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    /// The encoding tag is known but has no codec in this build.
    #[error("Unsupported encoding: {0:?}")]
    UnsupportedEncoding(Encoding),

    /// The encoding tag byte is not one we know.
    #[error("Unknown encoding tag: {0}")]
    UnknownEncodingTag(u8),

    /// Frame written by a newer schema.
    #[error("Unsupported schema version: received {received}, supported {supported}")]
    UnsupportedSchemaVersion { received: u16, supported: u16 },

    /// Frame shorter than its fixed header.
    #[error("Truncated frame: {len} bytes, need at least {needed}")]
    Truncated { len: usize, needed: usize },
}
