//! # Channel Driver
//!
//! Runs one [`ReliabilityController`] inside its own tokio task, so each
//! channel has exactly one owner and channels never share state.
//!
//! ## Flow
//!
//! ```text
//! ChannelHandle::submit ──mpsc──► driver task ──► validate ──► process ──► DeliverySink
//!                                     ▲
//!                 interval tick ──────┘ housekeeping (timeouts, expiry, credits)
//! ```
//!
//! Commands arriving together are handled as a burst before the priority
//! queue is drained, so a higher-priority message submitted in the same burst
//! is delivered first.
//!
//! A message the sink refuses is counted in `delivery_failures` and its
//! exactly-once token is forgotten, whichever path released it.

use crate::domain::{FlowDecision, SequencingError};
use crate::ports::{DeliverySink, SinkError, TimeSource};
use crate::service::{ChannelStats, ProcessResult, ReliabilityController};
use courier_envelope::{Message, Priority, UnixMillis, Validation, ValidationError};
use courier_telemetry::log_channel_event;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Default capacity of a channel's command queue.
pub const DEFAULT_COMMAND_BUFFER: usize = 1024;

/// Commands handled per burst before the priority queue is drained.
const MAX_BURST: usize = 64;

/// Driver errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The driver task has stopped.
    #[error("Channel {0} is closed")]
    ChannelClosed(String),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Sequencing(#[from] SequencingError),
}

/// What happened to a submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    /// Handed to the sink, with however many held messages it released.
    Delivered(usize),
    Duplicate {
        processed_at: UnixMillis,
        result: Option<Message>,
    },
    Buffered {
        missing: Vec<u64>,
    },
    Queued {
        dropped: Option<Priority>,
    },
    Discarded,
    FlowRejected(FlowDecision),
    /// Failed boundary validation; never reached the controller.
    Invalid(Vec<ValidationError>),
}

enum Command {
    Submit {
        message: Message,
        reply: oneshot::Sender<Result<Receipt, DriverError>>,
    },
    RegisterRequest {
        request: Message,
        reply: oneshot::Sender<Result<u64, SequencingError>>,
    },
    Diagnostics {
        reply: oneshot::Sender<Vec<SequencingError>>,
    },
    Stats {
        reply: oneshot::Sender<ChannelStats>,
    },
    Shutdown {
        reply: oneshot::Sender<ChannelStats>,
    },
}

/// Cloneable handle to a running channel.
#[derive(Clone)]
pub struct ChannelHandle {
    channel: Arc<str>,
    commands: mpsc::Sender<Command>,
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("channel", &self.channel)
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

impl ChannelHandle {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Submits one inbound message and waits for its receipt.
    pub async fn submit(&self, message: Message) -> Result<Receipt, DriverError> {
        let (reply, receipt) = oneshot::channel();
        self.send(Command::Submit { message, reply }).await?;
        receipt.await.map_err(|_| self.closed())?
    }

    /// Issues a request id for an outgoing request so its response can be
    /// checked against request order.
    pub async fn register_request(&self, request: Message) -> Result<u64, DriverError> {
        let (reply, request_id) = oneshot::channel();
        self.send(Command::RegisterRequest { request, reply }).await?;
        let request_id = request_id.await.map_err(|_| self.closed())??;
        Ok(request_id)
    }

    /// Sequencing diagnostics collected since the last call.
    pub async fn diagnostics(&self) -> Result<Vec<SequencingError>, DriverError> {
        let (reply, diagnostics) = oneshot::channel();
        self.send(Command::Diagnostics { reply }).await?;
        diagnostics.await.map_err(|_| self.closed())
    }

    pub async fn stats(&self) -> Result<ChannelStats, DriverError> {
        let (reply, stats) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        stats.await.map_err(|_| self.closed())
    }

    /// Stops the driver after pending commands. Returns the final counters.
    pub async fn shutdown(&self) -> Result<ChannelStats, DriverError> {
        let (reply, stats) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        stats.await.map_err(|_| self.closed())
    }

    async fn send(&self, command: Command) -> Result<(), DriverError> {
        self.commands.send(command).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> DriverError {
        DriverError::ChannelClosed(self.channel.to_string())
    }
}

/// Owns a controller and drives it from a single task.
pub struct ChannelDriver<S: DeliverySink, T: TimeSource> {
    controller: ReliabilityController,
    sink: Arc<S>,
    time: Arc<T>,
    housekeeping_interval: Duration,
}

impl<S, T> ChannelDriver<S, T>
where
    S: DeliverySink + 'static,
    T: TimeSource + 'static,
{
    /// Spawns the driver task for `controller`'s channel.
    pub fn spawn(
        controller: ReliabilityController,
        sink: Arc<S>,
        time: Arc<T>,
        housekeeping_interval: Duration,
    ) -> (ChannelHandle, JoinHandle<ChannelStats>) {
        let (commands, receiver) = mpsc::channel(DEFAULT_COMMAND_BUFFER);
        let handle = ChannelHandle {
            channel: Arc::from(controller.channel()),
            commands,
        };

        let driver = Self {
            controller,
            sink,
            time,
            housekeeping_interval,
        };
        let task = tokio::spawn(driver.run(receiver));
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> ChannelStats {
        let mut ticker = tokio::time::interval(self.housekeeping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        log_channel_event!(
            info,
            self.controller.channel(),
            "Channel driver started",
            mode = self.controller.mode().as_str(),
            strategy = self.controller.flow().strategy()
        );

        'outer: loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if !self.handle(command).await {
                        break;
                    }
                    for _ in 1..MAX_BURST {
                        match commands.try_recv() {
                            Ok(command) => {
                                if !self.handle(command).await {
                                    break 'outer;
                                }
                            }
                            Err(_) => break,
                        }
                    }
                    self.drain_queued().await;
                }
                _ = ticker.tick() => {
                    self.housekeeping().await;
                }
            }
        }

        self.drain_queued().await;
        let stats = self.controller.stats();
        log_channel_event!(
            info,
            self.controller.channel(),
            "Channel driver stopped",
            processed = stats.processed,
            delivered = stats.delivered
        );
        stats
    }

    /// Returns `false` when the driver should stop.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Submit { message, reply } => {
                let receipt = self.submit(message).await;
                let _ = reply.send(receipt);
                true
            }
            Command::RegisterRequest { request, reply } => {
                let now = self.time.now_millis();
                let _ = reply.send(self.controller.register_request(&request, now));
                true
            }
            Command::Diagnostics { reply } => {
                let _ = reply.send(self.controller.take_diagnostics());
                true
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.controller.stats());
                true
            }
            Command::Shutdown { reply } => {
                self.drain_queued().await;
                let _ = reply.send(self.controller.stats());
                false
            }
        }
    }

    async fn submit(&mut self, message: Message) -> Result<Receipt, DriverError> {
        let now = self.time.now_millis();

        if let Validation::Invalid(errors) = self.controller.validate(&message, now) {
            log_channel_event!(
                debug,
                self.controller.channel(),
                "Rejected invalid message",
                id = %message.id(),
                errors = errors.len()
            );
            return Ok(Receipt::Invalid(errors));
        }

        let receipt = match self.controller.process(message, now) {
            ProcessResult::Accept(message) => {
                Receipt::Delivered(self.deliver(vec![message], now).await?)
            }
            ProcessResult::BatchReady(messages) => {
                Receipt::Delivered(self.deliver(messages, now).await?)
            }
            ProcessResult::Duplicate {
                processed_at,
                result,
            } => Receipt::Duplicate {
                processed_at,
                result,
            },
            ProcessResult::Buffered { missing } => Receipt::Buffered { missing },
            ProcessResult::Queued { dropped } => Receipt::Queued { dropped },
            ProcessResult::Discarded => Receipt::Discarded,
            ProcessResult::FlowRejected(decision) => Receipt::FlowRejected(decision),
        };
        Ok(receipt)
    }

    async fn drain_queued(&mut self) {
        let now = self.time.now_millis();
        let released: Vec<Message> = self
            .controller
            .drain_queued(now)
            .into_iter()
            .flat_map(ProcessResult::into_deliverable)
            .collect();
        if !released.is_empty() {
            self.deliver_released(released, now, "queue drain").await;
        }
    }

    async fn housekeeping(&mut self) {
        let now = self.time.now_millis();
        let released = self.controller.housekeeping(now);
        if !released.is_empty() {
            self.deliver_released(released, now, "reorder timeout").await;
        }
    }

    /// Delivers messages no submitter is waiting on.
    async fn deliver_released(&mut self, messages: Vec<Message>, now: UnixMillis, path: &str) {
        let count = messages.len();
        if let Err(error) = self.deliver(messages, now).await {
            log_channel_event!(
                warn,
                self.controller.channel(),
                "Released messages not fully delivered",
                path,
                count,
                error = %error
            );
        }
    }

    /// Delivers in order. A failure does not stop the rest; the first one is
    /// returned.
    async fn deliver(
        &mut self,
        messages: Vec<Message>,
        now: UnixMillis,
    ) -> Result<usize, DriverError> {
        let mut delivered = 0;
        let mut first_error = None;

        for message in messages {
            let id = message.id();
            let token = message.idempotency_token().map(str::to_owned);

            match self.sink.deliver(self.controller.channel(), message).await {
                Ok(response) => {
                    delivered += 1;
                    if let (Some(token), Some(response)) = (token, response) {
                        self.controller.record_result(&token, response, now);
                    }
                }
                Err(error) => {
                    let forgot_token = self.controller.delivery_failed(token.as_deref());
                    warn!(
                        channel = %self.controller.channel(),
                        id = %id,
                        error = %error,
                        forgot_token,
                        "Delivery failed"
                    );
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error.into()),
            None => Ok(delivered),
        }
    }
}
