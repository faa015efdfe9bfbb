//! Outbound (Driven) ports for reliability channels.

use async_trait::async_trait;
use courier_envelope::{Message, UnixMillis};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Time source for the async driver.
///
/// The domain takes `now` as an argument; only adapters read a clock, and
/// only through this trait so tests can control time.
pub trait TimeSource: Send + Sync {
    /// Returns the current time in Unix milliseconds.
    fn now_millis(&self) -> UnixMillis;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> UnixMillis {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as UnixMillis
    }
}

/// Manually advanced time source.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    time: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(initial: UnixMillis) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, time: UnixMillis) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> UnixMillis {
        self.time.load(Ordering::SeqCst)
    }
}

/// Downstream consumer refused or failed a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Delivery to {channel} failed: {reason}")]
pub struct SinkError {
    pub channel: String,
    pub reason: String,
}

/// Consumer of messages released by a channel, in release order.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Delivers one message.
    ///
    /// # Returns
    /// - `Ok(Some(response))`: stored against the message's idempotency token
    ///   so an exactly-once duplicate replays it
    /// - `Ok(None)`: delivered, no response
    /// - `Err`: delivery failed; the driver logs it and moves on
    async fn deliver(&self, channel: &str, message: Message) -> Result<Option<Message>, SinkError>;
}
