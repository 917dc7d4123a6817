use std::time::Duration;
use thermolink::frame::RawFrame;
use thermolink::handoff::{self, Received};
use thermolink::sampler::Sample;

const WAIT: Duration = Duration::from_millis(50);

fn numbered(n: u32) -> Sample {
    Sample::from_frame(RawFrame::encode(n as f32, 20.0))
}

fn number_of(sample: Sample) -> u32 {
    match sample {
        Sample::Reading(reading) => reading.thermocouple_c() as u32,
        Sample::Fault { code, .. } => panic!("unexpected fault {code}"),
    }
}

#[cfg(test)]
mod delivery_tests {
    use super::*;

    #[tokio::test]
    async fn test_samples_arrive_in_order() {
        let (sender, mut receiver) = handoff::channel(5);
        for n in 0..3 {
            assert!(sender.publish(numbered(n)));
        }

        for expected in 0..3 {
            match receiver.recv_timeout(WAIT).await {
                Received::Sample(sample) => assert_eq!(number_of(sample), expected),
                other => panic!("expected sample {expected}, got {other:?}"),
            }
        }
        assert_eq!(receiver.dropped(), 0);
    }

    #[tokio::test]
    async fn test_idle_when_nothing_published() {
        let (_sender, mut receiver) = handoff::channel(5);
        assert_eq!(receiver.recv_timeout(WAIT).await, Received::Idle);
    }

    #[tokio::test]
    async fn test_closed_after_queue_drains() {
        let (sender, mut receiver) = handoff::channel(5);
        sender.publish(numbered(7));
        drop(sender);

        assert!(matches!(receiver.recv_timeout(WAIT).await, Received::Sample(_)));
        assert_eq!(receiver.recv_timeout(WAIT).await, Received::Closed);
    }

    #[tokio::test]
    async fn test_publish_without_consumer_reports_discard() {
        let (sender, receiver) = handoff::channel(5);
        drop(receiver);
        assert!(!sender.publish(numbered(1)));
    }

    #[tokio::test]
    async fn test_zero_capacity_still_delivers() {
        let (sender, mut receiver) = handoff::channel(0);
        sender.publish(numbered(3));
        match receiver.recv_timeout(WAIT).await {
            Received::Sample(sample) => assert_eq!(number_of(sample), 3),
            other => panic!("expected a sample, got {other:?}"),
        }
    }
}

#[cfg(test)]
mod overflow_tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_consumer_loses_oldest_samples() {
        let (sender, mut receiver) = handoff::channel(5);
        for n in 0..20 {
            sender.publish(numbered(n));
        }
        drop(sender);

        let mut received = Vec::new();
        loop {
            match receiver.recv_timeout(WAIT).await {
                Received::Sample(sample) => received.push(number_of(sample)),
                Received::Idle => panic!("queued samples should be ready immediately"),
                Received::Closed => break,
            }
        }

        // Only the configured capacity survives, even though the ring rounds up to 8.
        assert_eq!(received, (15..20).collect::<Vec<_>>());
        assert_eq!(receiver.dropped(), 15);
    }

    #[tokio::test]
    async fn test_full_queue_at_capacity_loses_nothing() {
        let (sender, mut receiver) = handoff::channel(3);
        for n in 0..3 {
            sender.publish(numbered(n));
        }

        for expected in 0..3 {
            match receiver.recv_timeout(WAIT).await {
                Received::Sample(sample) => assert_eq!(number_of(sample), expected),
                other => panic!("expected sample {expected}, got {other:?}"),
            }
        }
        assert_eq!(receiver.dropped(), 0);
    }

    #[tokio::test]
    async fn test_consumer_catches_up_after_overflow() {
        let (sender, mut receiver) = handoff::channel(2);
        for n in 0..10 {
            sender.publish(numbered(n));
        }
        while let Received::Sample(_) = receiver.recv_timeout(WAIT).await {}
        let dropped_before = receiver.dropped();

        sender.publish(numbered(100));
        match receiver.recv_timeout(WAIT).await {
            Received::Sample(sample) => assert_eq!(number_of(sample), 100),
            other => panic!("expected the fresh sample, got {other:?}"),
        }
        assert_eq!(receiver.dropped(), dropped_before);
    }
}
