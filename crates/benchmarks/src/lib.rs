//! Benchmark utilities for Courier reliability primitives
pub mod utils {
    use courier_envelope::{AuthContext, Message, MessageId, MessageType, Payload, Timestamp};
    use rand::seq::SliceRandom;

    /// A sequenced event with a small JSON payload.
    pub fn sequenced_message(sequence: u64) -> Message {
        Message::builder(
            MessageId::new(1, sequence + 1),
            Timestamp::from_millis(1_000 + sequence, 1),
            MessageType::Event("bench.tick".into()),
            AuthContext::system(0, u64::MAX),
        )
        .payload(Payload::Json(format!(r#"{{"seq":{sequence}}}"#)))
        .header("x-sequence", sequence.to_string())
        .build()
    }

    /// `0..count` with each block of `window` sequences shuffled, so every
    /// gap closes within one window.
    pub fn shuffled_within_windows(count: u64, window: usize) -> Vec<u64> {
        let mut sequences: Vec<u64> = (0..count).collect();
        let mut rng = rand::thread_rng();
        for chunk in sequences.chunks_mut(window.max(1)) {
            chunk.shuffle(&mut rng);
        }
        sequences
    }
}
