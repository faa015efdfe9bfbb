//! # Reliability Metrics
//!
//! Prometheus counters for channel outcomes and bounded data loss.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! courier-reliability = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `courier_messages_processed_total{outcome}` - Messages by `ProcessResult` variant
//! - `courier_flow_rejections_total{strategy}` - Admission refusals by strategy
//! - `courier_forced_flush_total{reason}` - Reorder releases past a gap (`window_full`, `timeout`)
//! - `courier_retransmit_exhausted_total` - Sends that ran out of retries
//! - `courier_delivery_failures_total` - Released messages the sink refused
//! - `courier_sequencing_errors_total{kind}` - Request/response anomalies

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Messages processed, labeled by outcome
    pub static ref MESSAGES_PROCESSED: IntCounterVec = register_int_counter_vec!(
        "courier_messages_processed_total",
        "Total number of messages processed by reliability controllers",
        &["outcome"]
    )
    .expect("Failed to create MESSAGES_PROCESSED metric");

    /// Flow control rejections, labeled by strategy
    pub static ref FLOW_REJECTIONS: IntCounterVec = register_int_counter_vec!(
        "courier_flow_rejections_total",
        "Total number of messages refused by flow control",
        &["strategy"]
    )
    .expect("Failed to create FLOW_REJECTIONS metric");

    /// Forced reorder flushes, labeled by reason
    pub static ref FORCED_FLUSHES: IntCounterVec = register_int_counter_vec!(
        "courier_forced_flush_total",
        "Total number of reorder buffer releases past a gap",
        &["reason"]
    )
    .expect("Failed to create FORCED_FLUSHES metric");

    /// Sends that exhausted their retries
    pub static ref RETRANSMIT_EXHAUSTED: IntCounter = register_int_counter!(
        "courier_retransmit_exhausted_total",
        "Total number of sends that exhausted their retransmission budget"
    )
    .expect("Failed to create RETRANSMIT_EXHAUSTED metric");

    /// Released messages the sink refused
    pub static ref DELIVERY_FAILURES: IntCounter = register_int_counter!(
        "courier_delivery_failures_total",
        "Total number of released messages the delivery sink refused"
    )
    .expect("Failed to create DELIVERY_FAILURES metric");

    /// Request/response anomalies, labeled by kind
    pub static ref SEQUENCING_ERRORS: IntCounterVec = register_int_counter_vec!(
        "courier_sequencing_errors_total",
        "Total number of request/response sequencing anomalies",
        &["kind"]
    )
    .expect("Failed to create SEQUENCING_ERRORS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_processed(outcome: &str) {
    MESSAGES_PROCESSED.with_label_values(&[outcome]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_flow_rejection(strategy: &str) {
    FLOW_REJECTIONS.with_label_values(&[strategy]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_forced_flush(reason: &str) {
    FORCED_FLUSHES.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_retransmit_exhausted(count: u64) {
    RETRANSMIT_EXHAUSTED.inc_by(count);
}

#[cfg(feature = "metrics")]
pub fn record_delivery_failure() {
    DELIVERY_FAILURES.inc();
}

#[cfg(feature = "metrics")]
pub fn record_sequencing_error(kind: &str) {
    SEQUENCING_ERRORS.with_label_values(&[kind]).inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_processed(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_flow_rejection(_strategy: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_forced_flush(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_retransmit_exhausted(_count: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_delivery_failure() {}

#[cfg(not(feature = "metrics"))]
pub fn record_sequencing_error(_kind: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_never_panics() {
        record_processed("accept");
        record_flow_rejection("credit");
        record_forced_flush("timeout");
        record_retransmit_exhausted(2);
        record_delivery_failure();
        record_sequencing_error("missing_response");
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_counters_increment() {
        let before = FORCED_FLUSHES.with_label_values(&["window_full"]).get();
        record_forced_flush("window_full");
        assert!(FORCED_FLUSHES.with_label_values(&["window_full"]).get() > before);
    }
}
