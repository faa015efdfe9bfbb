//! # Channel Flows
//!
//! Channel drivers running on tokio, delivering into in-memory sinks.

#[cfg(test)]
mod tests {
    use crate::fixtures::{command, event, numbers, response_to, sequenced};
    use courier_envelope::{Priority, UnixMillis};
    use courier_reliability::{
        ChannelDriver, ChannelHandle, DeliveryMode, DriverError, FlowConfig, ManualTimeSource,
        MemorySink, Receipt, ReliabilityConfig, ReliabilityController,
    };
    use courier_telemetry::{init_logging, TelemetryConfig};
    use std::sync::Arc;
    use std::time::Duration;

    const START: UnixMillis = 50_000;

    fn spawn_with(
        channel: &str,
        config: &ReliabilityConfig,
        sink: Arc<MemorySink>,
    ) -> ChannelHandle {
        let time = Arc::new(ManualTimeSource::new(START));
        let controller = ReliabilityController::new(channel, config, START).unwrap();
        let (handle, _task) =
            ChannelDriver::spawn(controller, sink, time, Duration::from_millis(50));
        handle
    }

    #[tokio::test]
    async fn test_channels_are_independent() {
        // A second subscriber in the same process is fine; ignore that error.
        let _ = init_logging(&TelemetryConfig::for_component("courier-tests"));

        let config = ReliabilityConfig::default();
        let channels = ["orders", "payments", "shipping"];
        let sinks: Vec<Arc<MemorySink>> = channels.iter().map(|_| Arc::new(MemorySink::new())).collect();

        let mut tasks = Vec::new();
        for (channel, sink) in channels.iter().zip(&sinks) {
            let handle = spawn_with(channel, &config, sink.clone());
            tasks.push(tokio::spawn(async move {
                // Reverse order: everything is held until sequence 0 arrives.
                for n in (0..8).rev() {
                    handle.submit(sequenced(n)).await.unwrap();
                }
                handle.shutdown().await.unwrap()
            }));
        }

        for task in tasks {
            let stats = task.await.unwrap();
            assert_eq!(stats.delivered, 8);
            assert_eq!(stats.buffered, 7);
        }
        for sink in &sinks {
            assert_eq!(numbers(&sink.delivered().await), (0..8).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_cloned_handles_share_one_channel() {
        let sink = Arc::new(MemorySink::new());
        let handle = spawn_with("audit", &ReliabilityConfig::default(), sink.clone());

        let submitters: Vec<_> = (0..4)
            .map(|worker| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    for n in 0..5 {
                        handle.submit(event(worker * 5 + n)).await.unwrap();
                    }
                })
            })
            .collect();
        for submitter in submitters {
            submitter.await.unwrap();
        }

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.processed, 20);
        assert_eq!(stats.accepted, 20);
        assert_eq!(sink.len().await, 20);
    }

    #[tokio::test]
    async fn test_priority_channel_queues_then_delivers() {
        let config = ReliabilityConfig {
            flow: FlowConfig::Priority { max_size: 8 },
            ..ReliabilityConfig::default()
        };
        let sink = Arc::new(MemorySink::new());
        let handle = spawn_with("alerts", &config, sink.clone());

        assert_eq!(
            handle.submit(event(0).with_priority(Priority::High)).await,
            Ok(Receipt::Queued { dropped: None })
        );
        assert_eq!(
            handle.submit(event(1).with_priority(Priority::Low)).await,
            Ok(Receipt::Queued { dropped: None })
        );

        let stats = handle.shutdown().await.unwrap();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.delivered, 2);
        assert_eq!(sink.len().await, 2);
    }

    #[tokio::test]
    async fn test_exactly_once_across_retries() {
        let config = ReliabilityConfig {
            mode: DeliveryMode::ExactlyOnce,
            ..ReliabilityConfig::default()
        };
        let sink = Arc::new(MemorySink::responding(|request| Some(response_to(request))));
        let handle = spawn_with("reservations", &config, sink.clone());

        let request = command(1, "reserve-A-1");
        assert_eq!(handle.submit(request.clone()).await, Ok(Receipt::Delivered(1)));

        for _ in 0..3 {
            match handle.submit(request.clone()).await.unwrap() {
                Receipt::Duplicate {
                    processed_at,
                    result: Some(response),
                } => {
                    assert_eq!(processed_at, START);
                    assert_eq!(response.correlation_id(), Some(request.id()));
                }
                other => panic!("unexpected receipt: {other:?}"),
            }
        }

        assert_eq!(sink.len().await, 1);
        assert_eq!(handle.stats().await.unwrap().duplicates, 3);
    }

    #[tokio::test]
    async fn test_sink_failure_is_reported() {
        let sink = Arc::new(MemorySink::failing_for("ledger"));
        let handle = spawn_with("ledger", &ReliabilityConfig::default(), sink.clone());

        match handle.submit(event(0)).await {
            Err(DriverError::Sink(error)) => assert_eq!(error.channel, "ledger"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(sink.is_empty().await);

        // The driver keeps running after a failed delivery.
        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.delivery_failures, 1);
    }

    #[tokio::test]
    async fn test_exactly_once_resubmit_after_refused_delivery() {
        let config = ReliabilityConfig {
            mode: DeliveryMode::ExactlyOnce,
            ..ReliabilityConfig::default()
        };
        let sink = Arc::new(MemorySink::failing_for("c"));
        let handle = spawn_with("c", &config, sink.clone());
        let request = command(4, "reserve-A-4");

        assert!(matches!(handle.submit(request.clone()).await, Err(DriverError::Sink(_))));
        match handle.submit(request).await {
            Err(DriverError::Sink(error)) => assert_eq!(error.channel, "c"),
            other => panic!("unexpected result: {other:?}"),
        }

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.duplicates, 0);
        assert_eq!(stats.delivery_failures, 2);
    }

    #[tokio::test]
    async fn test_token_bucket_channel_rejects_with_retry_hint() {
        let config = ReliabilityConfig {
            flow: FlowConfig::TokenBucket {
                capacity: 2,
                refill_rate: 1,
                refill_interval_ms: 1_000,
            },
            ..ReliabilityConfig::default()
        };
        let sink = Arc::new(MemorySink::new());
        let handle = spawn_with("webhooks", &config, sink.clone());

        handle.submit(event(0)).await.unwrap();
        handle.submit(event(1)).await.unwrap();
        match handle.submit(event(2)).await.unwrap() {
            Receipt::FlowRejected(decision) => {
                assert_eq!(decision.strategy(), "token_bucket");
                assert_eq!(decision.retry_after_ms(), Some(1_000));
            }
            other => panic!("unexpected receipt: {other:?}"),
        }
        assert_eq!(sink.len().await, 2);
    }
}
