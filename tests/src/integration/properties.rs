//! # Property Tests
//!
//! Invariants that must hold for any input interleaving.

#[cfg(test)]
mod tests {
    use crate::fixtures::command;
    use courier_envelope::Priority;
    use courier_reliability::{
        Ack, AckTracker, DedupCheck, DeduplicationStore, DeliveryMode, InsertOutcome,
        PriorityQueue, ProcessResult, ReliabilityConfig, ReliabilityController, ReorderBuffer,
        TokenBucket, TokenOutcome,
    };
    use proptest::prelude::*;

    fn priority() -> impl Strategy<Value = Priority> {
        prop::sample::select(Priority::ALL.to_vec())
    }

    proptest! {
        /// Released sequences strictly increase across every release path.
        #[test]
        fn reorder_release_is_monotonic(
            arrivals in prop::collection::vec((0u64..48, 0u64..40, any::<bool>()), 1..120),
            window in 1usize..12,
            max_wait in 1u64..200,
        ) {
            let mut buffer = ReorderBuffer::new("prop", window, max_wait);
            let mut released = Vec::new();
            let mut now = 0;

            for (sequence, step, tick) in arrivals {
                now += step;
                match buffer.insert(sequence, sequence, now) {
                    InsertOutcome::Deliver(s) => released.push(s),
                    InsertOutcome::WindowFull(batch) => released.extend(batch),
                    _ => {}
                }
                if tick {
                    released.extend(buffer.check_timeout(now));
                }
                prop_assert!(buffer.pending_count() <= window);
            }

            prop_assert!(released.windows(2).all(|w| w[0] < w[1]), "{:?}", released);
        }

        /// Everything held is eventually released once the wait has passed.
        #[test]
        fn reorder_timeout_empties_buffer(
            sequences in prop::collection::vec(1u64..64, 1..32),
        ) {
            let mut buffer = ReorderBuffer::new("prop", 64, 100);
            for sequence in sequences {
                buffer.insert(sequence, sequence, 0);
            }
            buffer.check_timeout(101);
            prop_assert_eq!(buffer.pending_count(), 0);
        }

        /// A recorded token is a duplicate until its TTL passes, then expired.
        #[test]
        fn dedup_token_lifetime(
            recorded_at in 0u64..10_000,
            ttl in 1u64..5_000,
            probe in 0u64..20_000,
        ) {
            let mut store: DeduplicationStore<()> = DeduplicationStore::new(16, ttl);
            store.record("token", recorded_at, None);
            let check = store.check("token", recorded_at + probe);
            if probe < ttl {
                prop_assert!(check.is_duplicate());
            } else {
                prop_assert_eq!(check, DedupCheck::TokenExpired);
            }
        }

        /// The store never exceeds its bound.
        #[test]
        fn dedup_is_bounded(
            tokens in prop::collection::vec(0u32..500, 1..300),
            max_entries in 1usize..32,
        ) {
            let mut store: DeduplicationStore<()> = DeduplicationStore::new(max_entries, 60_000);
            for (at, token) in tokens.into_iter().enumerate() {
                store.record(token.to_string(), at as u64, None);
                prop_assert!(store.len() <= max_entries);
            }
        }

        /// Grants never exceed the initial capacity plus whole-interval refills.
        #[test]
        fn token_bucket_never_overgrants(
            capacity in 1u64..20,
            refill_rate in 1u64..5,
            interval in 1u64..100,
            steps in prop::collection::vec(0u64..50, 1..200),
        ) {
            let mut bucket = TokenBucket::new(capacity, refill_rate, interval, 0);
            let mut now = 0;
            let mut granted = 0u64;
            for step in steps {
                now += step;
                match bucket.try_acquire(now) {
                    TokenOutcome::TokenGranted(remaining) => {
                        granted += 1;
                        prop_assert!(remaining < capacity);
                    }
                    TokenOutcome::TokenDenied { wait_ms } => prop_assert!(wait_ms <= interval),
                }
                prop_assert!(granted <= capacity + refill_rate * (now / interval));
            }
        }

        /// Dequeue order is priority descending, then FIFO within a level.
        #[test]
        fn priority_queue_order(
            items in prop::collection::vec(priority(), 1..64),
            max_size in 1usize..16,
        ) {
            let mut queue = PriorityQueue::new(max_size);
            for (at, level) in items.into_iter().enumerate() {
                queue.enqueue(level, (level, at as u64), at as u64);
                prop_assert!(queue.len() <= max_size);
            }

            let mut drained = Vec::new();
            while let Some(item) = queue.dequeue() {
                drained.push(item);
            }
            prop_assert!(drained
                .windows(2)
                .all(|w| w[0].0 > w[1].0 || (w[0].0 == w[1].0 && w[0].1 < w[1].1)));
        }

        /// A cumulative ack clears exactly the prefix.
        #[test]
        fn cumulative_ack_clears_prefix(
            sent in prop::collection::btree_set(0u64..200, 1..50),
            up_to in 0u64..200,
        ) {
            let mut tracker = AckTracker::new(100, 3);
            for &sequence in &sent {
                tracker.record_sent(sequence, 0);
            }
            let outcome = tracker.process_ack(&Ack::Cumulative(up_to));
            prop_assert_eq!(outcome.cleared, sent.iter().filter(|&&s| s <= up_to).count());
            for &sequence in &sent {
                prop_assert_eq!(tracker.is_pending(sequence), sequence > up_to);
            }
        }

        /// Exactly-once channels accept each token once per TTL.
        #[test]
        fn exactly_once_accepts_token_once(
            tokens in prop::collection::vec(0u8..8, 1..64),
        ) {
            let config = ReliabilityConfig {
                mode: DeliveryMode::ExactlyOnce,
                ..ReliabilityConfig::default()
            };
            let mut controller = ReliabilityController::new("prop", &config, 0).unwrap();
            let mut accepted = std::collections::HashSet::new();

            for (n, token) in tokens.iter().enumerate() {
                let token = format!("tok-{token}");
                match controller.process(command(n as u64, &token), n as u64) {
                    ProcessResult::Accept(_) => prop_assert!(accepted.insert(token)),
                    ProcessResult::Duplicate { .. } => prop_assert!(accepted.contains(&token)),
                    other => prop_assert!(false, "unexpected {:?}", other),
                }
            }
        }
    }
}
