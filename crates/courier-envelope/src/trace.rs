//! Trace context carried by every message.
//!
//! A zeroed context is the legal "untraced" sentinel. Rendering follows the
//! W3C `traceparent` layout so contexts survive a hop through HTTP gateways.

use serde::{Deserialize, Serialize};

/// 128-bit trace identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId {
    pub high: u64,
    pub low: u64,
}

impl TraceId {
    #[must_use]
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.high == 0 && self.low == 0
    }
}

/// Trace flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceFlags {
    pub sampled: bool,
    pub random: bool,
}

impl TraceFlags {
    const SAMPLED_BIT: u8 = 0x01;
    const RANDOM_BIT: u8 = 0x02;

    /// Packs the flags into the W3C flags byte.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        let mut byte = 0;
        if self.sampled {
            byte |= Self::SAMPLED_BIT;
        }
        if self.random {
            byte |= Self::RANDOM_BIT;
        }
        byte
    }

    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        Self {
            sampled: byte & Self::SAMPLED_BIT != 0,
            random: byte & Self::RANDOM_BIT != 0,
        }
    }
}

/// Distributed trace context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceContext {
    pub version: u8,
    pub trace_id: TraceId,
    pub parent_span_id: u64,
    pub flags: TraceFlags,
    /// Vendor-specific key/value pairs, order preserved.
    pub vendor_state: Vec<(String, String)>,
}

impl TraceContext {
    /// The "untraced" sentinel.
    #[must_use]
    pub fn untraced() -> Self {
        Self::default()
    }

    /// A sampled root context.
    #[must_use]
    pub fn new(trace_id: TraceId, parent_span_id: u64) -> Self {
        Self {
            version: 0,
            trace_id,
            parent_span_id,
            flags: TraceFlags {
                sampled: true,
                random: false,
            },
            vendor_state: Vec::new(),
        }
    }

    /// A context is valid iff it carries a non-zero trace id.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.trace_id.is_zero()
    }

    #[must_use]
    pub fn is_sampled(&self) -> bool {
        self.flags.sampled
    }

    /// Returns the context a downstream hop should carry once `span_id` is the
    /// active span.
    #[must_use]
    pub fn child(&self, span_id: u64) -> Self {
        Self {
            parent_span_id: span_id,
            ..self.clone()
        }
    }

    /// Renders `version-traceid-parentid-flags`.
    #[must_use]
    pub fn to_traceparent(&self) -> String {
        format!(
            "{:02x}-{:016x}{:016x}-{:016x}-{:02x}",
            self.version,
            self.trace_id.high,
            self.trace_id.low,
            self.parent_span_id,
            self.flags.to_byte()
        )
    }

    /// Parses a `traceparent` value. Returns `None` on any malformed field.
    #[must_use]
    pub fn from_traceparent(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let parent = parts.next()?;
        let flags = parts.next()?;
        if parts.next().is_some()
            || version.len() != 2
            || trace_id.len() != 32
            || parent.len() != 16
            || flags.len() != 2
        {
            return None;
        }

        Some(Self {
            version: u8::from_str_radix(version, 16).ok()?,
            trace_id: TraceId::new(
                u64::from_str_radix(&trace_id[..16], 16).ok()?,
                u64::from_str_radix(&trace_id[16..], 16).ok()?,
            ),
            parent_span_id: u64::from_str_radix(parent, 16).ok()?,
            flags: TraceFlags::from_byte(u8::from_str_radix(flags, 16).ok()?),
            vendor_state: Vec::new(),
        })
    }
}
