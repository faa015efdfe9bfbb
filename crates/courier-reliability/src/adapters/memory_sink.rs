//! In-memory [`DeliverySink`] that records everything it receives.
//!
//! Useful for embedding a channel in tests or single-process setups.

use crate::ports::{DeliverySink, SinkError};
use async_trait::async_trait;
use courier_envelope::Message;
use tokio::sync::Mutex;

type Responder = Box<dyn Fn(&Message) -> Option<Message> + Send + Sync>;

/// Records delivered messages in arrival order.
#[derive(Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<Message>>,
    responder: Option<Responder>,
    fail_channel: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that answers each delivery with `responder`'s result.
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&Message) -> Option<Message> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    /// Sink that refuses every delivery for `channel`.
    pub fn failing_for(channel: impl Into<String>) -> Self {
        Self {
            fail_channel: Some(channel.into()),
            ..Self::default()
        }
    }

    pub async fn delivered(&self) -> Vec<Message> {
        self.delivered.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.delivered.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.delivered.lock().await.is_empty()
    }
}

#[async_trait]
impl DeliverySink for MemorySink {
    async fn deliver(&self, channel: &str, message: Message) -> Result<Option<Message>, SinkError> {
        if self.fail_channel.as_deref() == Some(channel) {
            return Err(SinkError {
                channel: channel.to_string(),
                reason: "sink refused delivery".to_string(),
            });
        }

        let response = self.responder.as_ref().and_then(|respond| respond(&message));
        self.delivered.lock().await.push(message);
        Ok(response)
    }
}
