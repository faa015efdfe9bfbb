//! # Reliability Controller
//!
//! One controller per channel. It owns the deduplication store, one reorder
//! buffer, the flow-control strategy and the send-side ack tracker, and
//! composes them into a single `process` step.
//!
//! ## Receive Path
//!
//! ```text
//! message ──► dedup (ExactlyOnce + token) ──► flow control ──► reorder ──► ProcessResult
//!                   │ duplicate                    │ refused / queued
//!                   ▼                              ▼
//!               Duplicate                FlowRejected / Queued
//! ```
//!
//! The reorder sequence is read from the `x-sequence` header. Messages
//! without one are not ordered and are accepted as they come.
//!
//! An idempotency token is remembered only once its message is accepted,
//! buffered or queued. It is forgotten again when the message is evicted from
//! the priority queue, discarded on drain, or fails delivery, so a retry of a
//! message that never reached the sink is processed as new.
//!
//! Responses are matched against requests registered with
//! `register_request`. Mismatches become [`SequencingError`] diagnostics,
//! collected by `take_diagnostics`; they never hold back delivery.
//!
//! ## Send Path
//!
//! `prepare_send` stamps the next sequence and tracks the send unless the
//! channel is `AtMostOnce`. Acks, retransmission candidates and exhausted
//! sends are handled through the tracker.

use crate::config::{ConfigError, DeliveryMode, ReliabilityConfig};
use crate::domain::{
    Ack, AckOutcome, AckTracker, Admission, DedupCheck, DeduplicationStore, FlowControl,
    FlowDecision, InsertOutcome, PendingAck, ReorderBuffer, ResponseTracker, SequencingError,
};
use crate::metrics;
use courier_envelope::{Message, MessageType, Priority, UnixMillis, Validation, Validator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Header carrying the per-channel send sequence.
pub const SEQUENCE_HEADER: &str = "x-sequence";

/// Outcome of processing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// Deliver this message now.
    Accept(Message),
    /// Already processed under the same idempotency token.
    Duplicate {
        processed_at: UnixMillis,
        result: Option<Message>,
    },
    /// Held for reordering; these sequences are outstanding.
    Buffered { missing: Vec<u64> },
    /// Held by the priority queue until [`ReliabilityController::drain_queued`].
    Queued { dropped: Option<Priority> },
    /// Stale or unusable; nothing to deliver.
    Discarded,
    FlowRejected(FlowDecision),
    /// Deliver these messages now, in order.
    BatchReady(Vec<Message>),
}

impl ProcessResult {
    /// Label used in logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProcessResult::Accept(_) => "accept",
            ProcessResult::Duplicate { .. } => "duplicate",
            ProcessResult::Buffered { .. } => "buffered",
            ProcessResult::Queued { .. } => "queued",
            ProcessResult::Discarded => "discarded",
            ProcessResult::FlowRejected(_) => "flow_rejected",
            ProcessResult::BatchReady(_) => "batch_ready",
        }
    }

    /// Messages this outcome releases for delivery.
    pub fn into_deliverable(self) -> Vec<Message> {
        match self {
            ProcessResult::Accept(message) => vec![message],
            ProcessResult::BatchReady(messages) => messages,
            _ => Vec::new(),
        }
    }
}

/// Per-channel counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub processed: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub buffered: u64,
    pub queued: u64,
    pub discarded: u64,
    pub flow_rejected: u64,
    pub batches: u64,
    /// Messages released for delivery by any path.
    pub delivered: u64,
    /// Messages released by reorder timeouts.
    pub timeout_released: u64,
    pub sent: u64,
    pub acked: u64,
    pub retransmitted: u64,
    pub exhausted: u64,
    /// Released messages the sink refused.
    pub delivery_failures: u64,
    pub requests: u64,
    pub sequencing_errors: u64,
}

/// Reliability state for one channel. Drive it from a single owner.
#[derive(Debug)]
pub struct ReliabilityController {
    channel: String,
    mode: DeliveryMode,
    validator: Validator,
    dedup: DeduplicationStore<Message>,
    reorder: ReorderBuffer<Message>,
    flow: FlowControl<Message>,
    acks: AckTracker,
    responses: ResponseTracker,
    diagnostics: Vec<SequencingError>,
    next_sequence: u64,
    stats: ChannelStats,
}

impl ReliabilityController {
    /// Builds a controller from validated configuration.
    ///
    /// `now` starts the token bucket's refill clock, if one is configured.
    pub fn new(
        channel: impl Into<String>,
        config: &ReliabilityConfig,
        now: UnixMillis,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let channel = channel.into();

        Ok(Self {
            mode: config.mode,
            validator: Validator::new(config.max_payload_bytes),
            dedup: DeduplicationStore::new(config.dedup.max_entries, config.dedup.ttl_ms),
            reorder: ReorderBuffer::new(
                channel.clone(),
                config.reorder.max_window_size,
                config.reorder.max_wait_ms,
            ),
            flow: FlowControl::from_config(&config.flow, now),
            acks: AckTracker::new(config.ack.timeout_ms, config.ack.max_retries),
            responses: ResponseTracker::new(config.correlation.response_timeout_ms),
            diagnostics: Vec::new(),
            next_sequence: 0,
            stats: ChannelStats::default(),
            channel,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    pub fn reorder(&self) -> &ReorderBuffer<Message> {
        &self.reorder
    }

    pub fn dedup(&self) -> &DeduplicationStore<Message> {
        &self.dedup
    }

    pub fn flow(&self) -> &FlowControl<Message> {
        &self.flow
    }

    /// Boundary validation with this channel's payload ceiling.
    pub fn validate(&self, message: &Message, now: UnixMillis) -> Validation {
        self.validator.validate(message, now)
    }

    // =========================================================================
    // RECEIVE PATH
    // =========================================================================

    /// Runs one inbound message through dedup, flow control and reordering.
    pub fn process(&mut self, message: Message, now: UnixMillis) -> ProcessResult {
        self.stats.processed += 1;

        let token = self.token_of(&message);

        if let Some(token) = &token {
            if let DedupCheck::DuplicateMessage {
                processed_at,
                result,
            } = self.dedup.check(token, now)
            {
                debug!(
                    channel = %self.channel,
                    token = %token,
                    processed_at,
                    "Duplicate idempotency token, replaying stored result"
                );
                return self.finish(ProcessResult::Duplicate {
                    processed_at,
                    result,
                });
            }
        }

        if matches!(message.message_type(), MessageType::Response(_)) {
            self.correlate(&message);
        }

        let priority = message.priority();
        let result = match self.flow.admit(message, priority, now) {
            Admission::Rejected(decision) => {
                debug!(
                    channel = %self.channel,
                    strategy = decision.strategy(),
                    ?decision,
                    "Flow control refused message"
                );
                metrics::record_flow_rejection(decision.strategy());
                ProcessResult::FlowRejected(decision)
            }
            Admission::Queued { dropped, evicted } => {
                if let Some(evicted) = evicted {
                    self.forget_message(&evicted);
                }
                self.remember(token, now);
                ProcessResult::Queued { dropped }
            }
            Admission::Admitted(message) => {
                let result = self.sequence(message, now);
                if result != ProcessResult::Discarded {
                    self.remember(token, now);
                }
                result
            }
        };

        self.finish(result)
    }

    /// Moves everything waiting in the priority queue through reordering,
    /// highest priority first.
    pub fn drain_queued(&mut self, now: UnixMillis) -> Vec<ProcessResult> {
        let mut results = Vec::with_capacity(self.flow.queued_len());
        while let Some(message) = self.flow.next_queued() {
            let token = self.token_of(&message);
            let result = self.sequence(message, now);
            if result == ProcessResult::Discarded {
                if let Some(token) = token {
                    self.dedup.forget(&token);
                }
            }
            results.push(self.finish(result));
        }
        results
    }

    /// Attaches `response` to an exactly-once token so duplicates replay it.
    ///
    /// Returns `false` when the channel does not deduplicate.
    pub fn record_result(&mut self, token: &str, response: Message, now: UnixMillis) -> bool {
        if self.mode != DeliveryMode::ExactlyOnce {
            return false;
        }
        self.dedup.record(token, now, Some(response));
        true
    }

    /// Drops an exactly-once token so the next message carrying it is new.
    ///
    /// Returns `false` when the channel does not deduplicate or the token was
    /// not remembered.
    pub fn forget_token(&mut self, token: &str) -> bool {
        self.mode == DeliveryMode::ExactlyOnce && self.dedup.forget(token)
    }

    /// Records that the sink refused a released message carrying `token`.
    ///
    /// The token is forgotten so a resubmission is not collapsed onto a
    /// delivery that never happened. A sequenced resubmission stays stale:
    /// its reorder position was already released.
    pub fn delivery_failed(&mut self, token: Option<&str>) -> bool {
        self.stats.delivery_failures += 1;
        metrics::record_delivery_failure();
        token.is_some_and(|token| self.forget_token(token))
    }

    /// Periodic maintenance. Returns messages released by reorder timeouts.
    pub fn housekeeping(&mut self, now: UnixMillis) -> Vec<Message> {
        let evicted = self.dedup.evict_expired(now);
        if evicted > 0 {
            debug!(channel = %self.channel, evicted, "Evicted expired idempotency tokens");
        }

        if let Some(credit) = self.flow.credit_mut() {
            credit.replenish();
        }

        for missing in self.responses.take_missing(now) {
            self.diagnose(missing);
        }

        let released = self.reorder.check_timeout(now);
        if !released.is_empty() {
            self.stats.timeout_released += released.len() as u64;
            self.stats.delivered += released.len() as u64;
        }
        released
    }

    // =========================================================================
    // REQUEST / RESPONSE
    // =========================================================================

    /// Issues the next request id for an outgoing request.
    ///
    /// Responses whose `correlation_id` names `request` are checked against
    /// request order.
    pub fn register_request(
        &mut self,
        request: &Message,
        now: UnixMillis,
    ) -> Result<u64, SequencingError> {
        match self.responses.register(request.id(), now) {
            Ok(request_id) => {
                self.stats.requests += 1;
                Ok(request_id)
            }
            Err(error) => {
                self.diagnose(error.clone());
                Err(error)
            }
        }
    }

    pub fn outstanding_requests(&self) -> usize {
        self.responses.outstanding()
    }

    /// Takes the sequencing diagnostics collected since the last call.
    pub fn take_diagnostics(&mut self) -> Vec<SequencingError> {
        std::mem::take(&mut self.diagnostics)
    }

    // =========================================================================
    // FLOW CONTROL
    // =========================================================================

    /// Grants credits. Returns `false` unless the channel uses credit flow.
    pub fn grant_credits(&mut self, amount: u64) -> bool {
        match self.flow.credit_mut() {
            Some(credit) => {
                credit.grant(amount);
                true
            }
            None => false,
        }
    }

    /// Closes the credit gate. Returns `false` unless the channel uses credit flow.
    pub fn pause_flow(&mut self) -> bool {
        match self.flow.credit_mut() {
            Some(credit) => {
                credit.pause();
                true
            }
            None => false,
        }
    }

    pub fn resume_flow(&mut self) -> bool {
        match self.flow.credit_mut() {
            Some(credit) => {
                credit.resume();
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // SEND PATH
    // =========================================================================

    /// Allocates the next outbound sequence number.
    pub fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Stamps the next sequence on `message` and tracks the send.
    pub fn prepare_send(&mut self, message: Message, now: UnixMillis) -> (u64, Message) {
        let sequence = self.next_sequence();
        self.record_sent(sequence, now);
        (
            sequence,
            message.with_header_replaced(SEQUENCE_HEADER, sequence.to_string()),
        )
    }

    /// Tracks a send for acknowledgment. `AtMostOnce` channels do not track.
    pub fn record_sent(&mut self, sequence: u64, now: UnixMillis) {
        self.stats.sent += 1;
        if self.mode != DeliveryMode::AtMostOnce {
            self.acks.record_sent(sequence, now);
        }
    }

    pub fn on_ack(&mut self, ack: &Ack) -> AckOutcome {
        let outcome = self.acks.process_ack(ack);
        self.stats.acked += outcome.cleared as u64;
        outcome
    }

    /// Sends overdue for retransmission and still within budget.
    pub fn retransmit_candidates(&self, now: UnixMillis) -> Vec<u64> {
        self.acks.get_retransmit_needed(now)
    }

    pub fn mark_retransmitted(&mut self, sequence: u64, now: UnixMillis) -> bool {
        let marked = self.acks.mark_retransmitted(sequence, now);
        if marked {
            self.stats.retransmitted += 1;
        }
        marked
    }

    /// Removes sends that exhausted their retries; the caller owns failure
    /// handling from here.
    pub fn take_exhausted(&mut self, now: UnixMillis) -> Vec<PendingAck> {
        let exhausted = self.acks.take_exhausted(now);
        if !exhausted.is_empty() {
            let sequences: Vec<u64> = exhausted.iter().map(|p| p.sequence).collect();
            warn!(
                channel = %self.channel,
                ?sequences,
                "Sends permanently failed after exhausting retries"
            );
            self.stats.exhausted += exhausted.len() as u64;
            metrics::record_retransmit_exhausted(exhausted.len() as u64);
        }
        exhausted
    }

    pub fn pending_acks(&self) -> usize {
        self.acks.pending_count()
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn token_of(&self, message: &Message) -> Option<String> {
        match self.mode {
            DeliveryMode::ExactlyOnce => message.idempotency_token().map(str::to_owned),
            _ => None,
        }
    }

    fn remember(&mut self, token: Option<String>, now: UnixMillis) {
        if let Some(token) = token {
            self.dedup.record(token, now, None);
        }
    }

    fn forget_message(&mut self, message: &Message) -> bool {
        match self.token_of(message) {
            Some(token) => {
                let forgotten = self.dedup.forget(&token);
                if forgotten {
                    debug!(channel = %self.channel, token = %token, "Forgot undelivered token");
                }
                forgotten
            }
            None => false,
        }
    }

    /// Responses only carry meaning once this channel has issued requests.
    fn correlate(&mut self, response: &Message) {
        if !self.responses.has_issued() {
            return;
        }
        if let Err(error) = self.responses.on_response(response.correlation_id()) {
            self.diagnose(error);
        }
    }

    fn diagnose(&mut self, error: SequencingError) {
        warn!(channel = %self.channel, kind = error.kind(), %error, "Sequencing anomaly");
        self.stats.sequencing_errors += 1;
        metrics::record_sequencing_error(error.kind());
        self.diagnostics.push(error);
    }

    fn sequence(&mut self, message: Message, now: UnixMillis) -> ProcessResult {
        let sequence = match message.header(SEQUENCE_HEADER) {
            None => return ProcessResult::Accept(message),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(sequence) => sequence,
                Err(_) => {
                    warn!(
                        channel = %self.channel,
                        id = %message.id(),
                        value = raw,
                        "Unparseable sequence header, discarding"
                    );
                    return ProcessResult::Discarded;
                }
            },
        };

        match self.reorder.insert(sequence, message, now) {
            InsertOutcome::Deliver(message) => ProcessResult::Accept(message),
            InsertOutcome::WindowFull(messages) => ProcessResult::BatchReady(messages),
            InsertOutcome::GapDetected(missing) => ProcessResult::Buffered { missing },
            InsertOutcome::TooOld => {
                debug!(channel = %self.channel, sequence, "Stale sequence discarded");
                ProcessResult::Discarded
            }
        }
    }

    fn finish(&mut self, result: ProcessResult) -> ProcessResult {
        let stats = &mut self.stats;
        match &result {
            ProcessResult::Accept(_) => {
                stats.accepted += 1;
                stats.delivered += 1;
            }
            ProcessResult::BatchReady(messages) => {
                stats.batches += 1;
                stats.delivered += messages.len() as u64;
            }
            ProcessResult::Duplicate { .. } => stats.duplicates += 1,
            ProcessResult::Buffered { .. } => stats.buffered += 1,
            ProcessResult::Queued { .. } => stats.queued += 1,
            ProcessResult::Discarded => stats.discarded += 1,
            ProcessResult::FlowRejected(_) => stats.flow_rejected += 1,
        }
        metrics::record_processed(result.outcome());
        result
    }
}
