//! # Reference Scenarios
//!
//! One test per primitive, driven through the public API of
//! `courier-reliability` with real envelopes from `courier-envelope`.

#[cfg(test)]
mod tests {
    use crate::fixtures::{command, event, numbers, response_to, sequenced};
    use courier_envelope::Priority;
    use courier_reliability::{
        CreditFlow, CreditOutcome, DedupCheck, DeduplicationStore, DeliveryMode, EnqueueOutcome,
        FlowConfig, FlowDecision, InsertOutcome, PriorityQueue, ProcessResult, ReliabilityConfig,
        ReliabilityController, ReorderBuffer, ReorderConfig, SequencingError, TokenBucket,
        TokenOutcome, SEQUENCE_HEADER,
    };

    // =========================================================================
    // REORDER
    // =========================================================================

    #[test]
    fn test_reorder_catch_up_through_controller() {
        let config = ReliabilityConfig {
            reorder: ReorderConfig {
                max_window_size: 10,
                max_wait_ms: 1_000,
            },
            ..ReliabilityConfig::default()
        };
        let mut controller = ReliabilityController::new("inventory", &config, 0).unwrap();

        assert_eq!(
            controller.process(sequenced(2), 10),
            ProcessResult::Buffered {
                missing: vec![0, 1]
            }
        );

        let ProcessResult::Accept(first) = controller.process(sequenced(0), 11) else {
            panic!("expected sequence 0 to be accepted");
        };
        assert_eq!(numbers(&[first]), vec![0]);

        let ProcessResult::BatchReady(batch) = controller.process(sequenced(1), 12) else {
            panic!("expected catch-up batch");
        };
        assert_eq!(numbers(&batch), vec![1, 2]);
        assert_eq!(controller.reorder().expected_next(), 3);
    }

    #[test]
    fn test_reorder_catch_up_in_buffer() {
        let mut buffer = ReorderBuffer::new("inventory", 10, 1_000);

        assert!(matches!(
            buffer.insert(2, "c", 0),
            InsertOutcome::GapDetected(_)
        ));
        assert_eq!(buffer.insert(0, "a", 1), InsertOutcome::Deliver("a"));
        assert_eq!(
            buffer.insert(1, "b", 2),
            InsertOutcome::WindowFull(vec!["b", "c"])
        );
        assert_eq!(buffer.expected_next(), 3);
    }

    #[test]
    fn test_duplicate_of_held_sequence_is_too_old() {
        let mut buffer = ReorderBuffer::new("inventory", 10, 1_000);
        buffer.insert(4, "first", 0);
        assert_eq!(buffer.insert(4, "again", 1), InsertOutcome::TooOld);
        assert_eq!(buffer.pending_count(), 1);
    }

    // =========================================================================
    // FLOW CONTROL
    // =========================================================================

    #[test]
    fn test_token_bucket_starts_full() {
        let mut bucket = TokenBucket::new(10, 2, 100, 0);
        assert_eq!(bucket.try_acquire(0), TokenOutcome::TokenGranted(9));
    }

    #[test]
    fn test_pause_wins_over_available_credit() {
        let mut credit = CreditFlow::new(10, 5);
        credit.pause();
        assert_eq!(credit.consume(), CreditOutcome::FlowPaused);
        assert_eq!(credit.available(), 10);
    }

    #[test]
    fn test_priority_queue_replaces_lowest_when_full() {
        let mut queue = PriorityQueue::new(2);
        assert_eq!(queue.enqueue(Priority::Low, "low", 0), EnqueueOutcome::Enqueued);
        assert_eq!(queue.enqueue(Priority::High, "high", 1), EnqueueOutcome::Enqueued);
        assert!(queue.is_full());

        assert_eq!(
            queue.enqueue(Priority::Normal, "normal", 2),
            EnqueueOutcome::EnqueuedWithDrop(Priority::Low)
        );
        assert_eq!(queue.dequeue(), Some("high"));
        assert_eq!(queue.dequeue(), Some("normal"));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_priority_controller_queues_then_drains() {
        let config = ReliabilityConfig {
            flow: FlowConfig::Priority { max_size: 2 },
            ..ReliabilityConfig::default()
        };
        let mut controller = ReliabilityController::new("inventory", &config, 0).unwrap();

        controller.process(event(1).with_priority(Priority::Low), 0);
        controller.process(event(2).with_priority(Priority::High), 1);
        assert_eq!(
            controller.process(event(3).with_priority(Priority::Normal), 2),
            ProcessResult::Queued {
                dropped: Some(Priority::Low)
            }
        );

        let released: Vec<_> = controller
            .drain_queued(3)
            .into_iter()
            .flat_map(ProcessResult::into_deliverable)
            .collect();
        assert_eq!(numbers(&released), vec![2, 3]);
    }

    #[test]
    fn test_exactly_once_retry_after_queue_eviction() {
        let config = ReliabilityConfig {
            mode: DeliveryMode::ExactlyOnce,
            flow: FlowConfig::Priority { max_size: 1 },
            ..ReliabilityConfig::default()
        };
        let mut controller = ReliabilityController::new("inventory", &config, 0).unwrap();
        let low = command(1, "low-tok").with_priority(Priority::Low);

        controller.process(low.clone(), 0);
        controller.process(event(2).with_priority(Priority::High), 1);
        // Queue is full of higher priority work; the retry is refused, not replayed.
        assert_eq!(
            controller.process(low.clone(), 2),
            ProcessResult::FlowRejected(FlowDecision::QueueFull {
                priority: Priority::Low
            })
        );

        controller.drain_queued(3);
        assert_eq!(
            controller.process(low, 4),
            ProcessResult::Queued { dropped: None }
        );
        let released: Vec<_> = controller
            .drain_queued(5)
            .into_iter()
            .flat_map(ProcessResult::into_deliverable)
            .collect();
        assert_eq!(numbers(&released), vec![1]);
        assert_eq!(controller.stats().duplicates, 0);
    }

    // =========================================================================
    // REQUEST / RESPONSE
    // =========================================================================

    #[test]
    fn test_late_response_reported_without_blocking_reorder() {
        let mut controller =
            ReliabilityController::new("inventory", &ReliabilityConfig::default(), 0).unwrap();
        let first = command(1, "r-1");
        let second = command(2, "r-2");
        controller.register_request(&first, 0).unwrap();
        controller.register_request(&second, 0).unwrap();

        let overtaking = response_to(&second).with_header(SEQUENCE_HEADER, "1");
        assert_eq!(
            controller.process(overtaking, 1),
            ProcessResult::Buffered { missing: vec![0] }
        );
        assert!(matches!(
            controller.process(sequenced(0), 2),
            ProcessResult::BatchReady(_)
        ));

        assert_eq!(
            controller.take_diagnostics(),
            vec![SequencingError::OutOfOrderResponse {
                request_id: 2,
                expected: 1
            }]
        );
        assert_eq!(controller.outstanding_requests(), 1);
    }

    // =========================================================================
    // DEDUP
    // =========================================================================

    #[test]
    fn test_dedup_token_expires_after_ttl() {
        let mut store: DeduplicationStore<String> = DeduplicationStore::new(100, 1_000);
        store.record("t1", 0, None);
        assert_eq!(store.check("t1", 1_500), DedupCheck::TokenExpired);
    }
}
