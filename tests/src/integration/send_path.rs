//! # Sender ↔ Receiver Over The Wire
//!
//! A sending controller stamps sequences and tracks acks; frames cross a
//! reordering "transport" as sealed envelopes; a receiving controller
//! restores order and acknowledges.

#[cfg(test)]
mod tests {
    use crate::fixtures::{event, numbers};
    use courier_envelope::{Encoding, Envelope, Message};
    use courier_reliability::{
        Ack, AckConfig, DeliveryMode, ProcessResult, ReliabilityConfig, ReliabilityController,
        SEQUENCE_HEADER,
    };

    fn config(mode: DeliveryMode) -> ReliabilityConfig {
        ReliabilityConfig {
            mode,
            ack: AckConfig {
                timeout_ms: 100,
                max_retries: 2,
            },
            ..ReliabilityConfig::default()
        }
    }

    fn frame(message: Message, encoding: Encoding) -> Vec<u8> {
        Envelope::seal(message, encoding).unwrap().to_bytes().unwrap()
    }

    fn unframe(bytes: &[u8]) -> Message {
        let envelope = Envelope::from_bytes(bytes).unwrap();
        envelope.verify().unwrap();
        envelope.message
    }

    #[test]
    fn test_reordered_frames_are_delivered_in_order_and_acked() {
        let mut sender =
            ReliabilityController::new("billing", &config(DeliveryMode::AtLeastOnce), 0).unwrap();
        let mut receiver =
            ReliabilityController::new("billing", &config(DeliveryMode::AtLeastOnce), 0).unwrap();

        let frames: Vec<Vec<u8>> = (0..3)
            .map(|n| {
                let (sequence, stamped) = sender.prepare_send(event(n), 10);
                assert_eq!(sequence, n);
                assert_eq!(stamped.header(SEQUENCE_HEADER), Some(n.to_string().as_str()));
                frame(stamped, Encoding::MsgpackCanonical)
            })
            .collect();
        assert_eq!(sender.pending_acks(), 3);

        let mut delivered = Vec::new();
        for index in [2, 0, 1] {
            let result = receiver.process(unframe(&frames[index]), 20);
            delivered.extend(result.into_deliverable());
        }
        assert_eq!(numbers(&delivered), vec![0, 1, 2]);

        // Receiver acknowledges everything it released.
        let outcome = sender.on_ack(&Ack::Cumulative(receiver.reorder().expected_next() - 1));
        assert_eq!(outcome.cleared, 3);
        assert_eq!(sender.pending_acks(), 0);
        assert_eq!(sender.stats().acked, 3);
    }

    #[test]
    fn test_retransmitted_frame_is_discarded_by_receiver() {
        let mut sender =
            ReliabilityController::new("billing", &config(DeliveryMode::AtLeastOnce), 0).unwrap();
        let mut receiver =
            ReliabilityController::new("billing", &config(DeliveryMode::AtLeastOnce), 0).unwrap();

        let (sequence, stamped) = sender.prepare_send(event(0), 0);
        let bytes = frame(stamped, Encoding::JsonCanonical);
        assert!(matches!(
            receiver.process(unframe(&bytes), 5),
            ProcessResult::Accept(_)
        ));

        // The ack was lost; the sender times out and resends the same frame.
        assert_eq!(sender.retransmit_candidates(101), vec![sequence]);
        assert!(sender.mark_retransmitted(sequence, 101));
        assert_eq!(receiver.process(unframe(&bytes), 110), ProcessResult::Discarded);

        sender.on_ack(&Ack::Positive(sequence));
        assert!(sender.retransmit_candidates(1_000).is_empty());
    }

    #[test]
    fn test_unacked_send_exhausts_retries() {
        let mut sender =
            ReliabilityController::new("billing", &config(DeliveryMode::AtLeastOnce), 0).unwrap();
        let (sequence, _) = sender.prepare_send(event(0), 0);

        let mut now = 0;
        for _ in 0..2 {
            now += 101;
            assert_eq!(sender.retransmit_candidates(now), vec![sequence]);
            sender.mark_retransmitted(sequence, now);
        }
        now += 101;
        assert!(sender.retransmit_candidates(now).is_empty());

        let exhausted = sender.take_exhausted(now);
        assert_eq!(exhausted.len(), 1);
        assert_eq!(exhausted[0].retries, 2);
        assert_eq!(sender.pending_acks(), 0);

        let stats = sender.stats();
        assert_eq!(stats.retransmitted, 2);
        assert_eq!(stats.exhausted, 1);
    }

    #[test]
    fn test_negative_ack_keeps_send_pending() {
        let mut sender =
            ReliabilityController::new("billing", &config(DeliveryMode::ExactlyOnce), 0).unwrap();
        let (sequence, _) = sender.prepare_send(event(0), 0);

        let outcome = sender.on_ack(&Ack::Negative {
            sequence,
            reason: "checksum mismatch".into(),
        });
        assert_eq!(outcome.cleared, 0);
        assert_eq!(outcome.nacked, Some(sequence));
        assert_eq!(sender.retransmit_candidates(101), vec![sequence]);
    }

    #[test]
    fn test_at_most_once_sends_are_not_tracked() {
        let mut sender =
            ReliabilityController::new("billing", &config(DeliveryMode::AtMostOnce), 0).unwrap();
        let (first, _) = sender.prepare_send(event(0), 0);
        let (second, _) = sender.prepare_send(event(1), 0);

        assert_eq!((first, second), (0, 1));
        assert_eq!(sender.pending_acks(), 0);
        assert!(sender.retransmit_candidates(10_000).is_empty());
        assert_eq!(sender.stats().sent, 2);
    }

    #[test]
    fn test_corrupted_frame_never_reaches_receiver() {
        let mut sender =
            ReliabilityController::new("billing", &config(DeliveryMode::AtLeastOnce), 0).unwrap();
        let (_, stamped) = sender.prepare_send(event(0), 0);
        let mut bytes = frame(stamped, Encoding::Raw);
        if let Some(last) = bytes.last_mut() {
            *last ^= 0xFF;
        }
        assert!(Envelope::from_bytes(&bytes).is_err());
    }
}
