//! Configuration types for a reliability channel.
//!
//! Every section has a `Default` and the whole document can be read from JSON
//! or overlaid from `COURIER_*` environment variables.

use courier_envelope::DEFAULT_MAX_PAYLOAD_BYTES;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Malformed configuration document: {0}")]
    Parse(String),
}

/// Delivery guarantee declared by a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Fire and forget; sends are not tracked for retransmission.
    AtMostOnce,
    #[default]
    AtLeastOnce,
    /// Idempotency tokens are deduplicated on receive.
    ExactlyOnce,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::AtMostOnce => "at_most_once",
            DeliveryMode::AtLeastOnce => "at_least_once",
            DeliveryMode::ExactlyOnce => "exactly_once",
        }
    }
}

impl FromStr for DeliveryMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "at_most_once" => Ok(DeliveryMode::AtMostOnce),
            "at_least_once" => Ok(DeliveryMode::AtLeastOnce),
            "exactly_once" => Ok(DeliveryMode::ExactlyOnce),
            _ => Err(()),
        }
    }
}

/// Deduplication store bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Maximum remembered tokens (default: 10,000)
    pub max_entries: usize,

    /// How long a token is remembered, in milliseconds (default: 5 minutes)
    pub ttl_ms: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_ms: 300_000,
        }
    }
}

/// Reorder buffer bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    /// Maximum held out-of-order entries (default: 64)
    pub max_window_size: usize,

    /// Maximum time an entry may be held, in milliseconds (default: 1s)
    pub max_wait_ms: u64,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            max_window_size: 64,
            max_wait_ms: 1_000,
        }
    }
}

/// Flow control strategy. A channel picks exactly one, or none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FlowConfig {
    #[default]
    None,
    Credit {
        max_credits: u64,
        replenish_amount: u64,
    },
    TokenBucket {
        capacity: u64,
        refill_rate: u64,
        refill_interval_ms: u64,
    },
    Priority {
        max_size: usize,
    },
}

impl FlowConfig {
    pub fn strategy(&self) -> &'static str {
        match self {
            FlowConfig::None => "none",
            FlowConfig::Credit { .. } => "credit",
            FlowConfig::TokenBucket { .. } => "token_bucket",
            FlowConfig::Priority { .. } => "priority",
        }
    }
}

/// Acknowledgment tracking for the send path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AckConfig {
    /// Time before an unacknowledged send is due for retransmission (default: 5s)
    pub timeout_ms: u64,

    /// Retransmissions allowed before a send is exhausted (default: 3)
    pub max_retries: u32,
}

impl Default for AckConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_retries: 3,
        }
    }
}

/// Request/response correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Time a registered request may wait for its response (default: 30s)
    pub response_timeout_ms: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 30_000,
        }
    }
}

/// Complete configuration of one reliability channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    pub mode: DeliveryMode,
    pub dedup: DedupConfig,
    pub reorder: ReorderConfig,
    pub flow: FlowConfig,
    pub ack: AckConfig,
    pub correlation: CorrelationConfig,

    /// Payload ceiling applied at the boundary (default: 1 MiB)
    pub max_payload_bytes: usize,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            dedup: DedupConfig::default(),
            reorder: ReorderConfig::default(),
            flow: FlowConfig::default(),
            ack: AckConfig::default(),
            correlation: CorrelationConfig::default(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl ReliabilityConfig {
    /// Rejects zero-sized bounds and intervals.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = |value: u64, field: &'static str| {
            if value == 0 {
                Err(ConfigError::Zero { field })
            } else {
                Ok(())
            }
        };

        nonzero(self.dedup.max_entries as u64, "dedup.max_entries")?;
        nonzero(self.dedup.ttl_ms, "dedup.ttl_ms")?;
        nonzero(self.reorder.max_window_size as u64, "reorder.max_window_size")?;
        nonzero(self.reorder.max_wait_ms, "reorder.max_wait_ms")?;
        nonzero(self.ack.timeout_ms, "ack.timeout_ms")?;
        nonzero(
            self.correlation.response_timeout_ms,
            "correlation.response_timeout_ms",
        )?;
        nonzero(self.max_payload_bytes as u64, "max_payload_bytes")?;

        match self.flow {
            FlowConfig::None => {}
            FlowConfig::Credit {
                max_credits,
                replenish_amount,
            } => {
                nonzero(max_credits, "flow.max_credits")?;
                nonzero(replenish_amount, "flow.replenish_amount")?;
            }
            FlowConfig::TokenBucket {
                capacity,
                refill_rate,
                refill_interval_ms,
            } => {
                nonzero(capacity, "flow.capacity")?;
                nonzero(refill_rate, "flow.refill_rate")?;
                nonzero(refill_interval_ms, "flow.refill_interval_ms")?;
            }
            FlowConfig::Priority { max_size } => {
                nonzero(max_size as u64, "flow.max_size")?;
            }
        }
        Ok(())
    }

    /// Parses and validates a JSON document. Missing sections take defaults.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays environment variables on the defaults.
    ///
    /// # Environment Variables
    ///
    /// - `COURIER_DELIVERY_MODE`: `at_most_once` | `at_least_once` | `exactly_once`
    /// - `COURIER_DEDUP_MAX_ENTRIES`, `COURIER_DEDUP_TTL_MS`
    /// - `COURIER_REORDER_WINDOW`, `COURIER_REORDER_MAX_WAIT_MS`
    /// - `COURIER_ACK_TIMEOUT_MS`, `COURIER_ACK_MAX_RETRIES`
    /// - `COURIER_RESPONSE_TIMEOUT_MS`
    /// - `COURIER_MAX_PAYLOAD_BYTES`
    ///
    /// Flow control is only configurable through [`Self::from_json`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(mode) = env_parse("COURIER_DELIVERY_MODE")? {
            config.mode = mode;
        }
        if let Some(v) = env_parse("COURIER_DEDUP_MAX_ENTRIES")? {
            config.dedup.max_entries = v;
        }
        if let Some(v) = env_parse("COURIER_DEDUP_TTL_MS")? {
            config.dedup.ttl_ms = v;
        }
        if let Some(v) = env_parse("COURIER_REORDER_WINDOW")? {
            config.reorder.max_window_size = v;
        }
        if let Some(v) = env_parse("COURIER_REORDER_MAX_WAIT_MS")? {
            config.reorder.max_wait_ms = v;
        }
        if let Some(v) = env_parse("COURIER_ACK_TIMEOUT_MS")? {
            config.ack.timeout_ms = v;
        }
        if let Some(v) = env_parse("COURIER_ACK_MAX_RETRIES")? {
            config.ack.max_retries = v;
        }
        if let Some(v) = env_parse("COURIER_RESPONSE_TIMEOUT_MS")? {
            config.correlation.response_timeout_ms = v;
        }
        if let Some(v) = env_parse("COURIER_MAX_PAYLOAD_BYTES")? {
            config.max_payload_bytes = v;
        }

        config.validate()?;
        Ok(config)
    }
}

fn env_parse<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}
