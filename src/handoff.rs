//! Bounded producer-to-consumer handoff that keeps only the newest samples.
//!
//! Sending never blocks. When the consumer falls behind, the oldest unread
//! samples are discarded and the consumer resumes from the oldest one still
//! held, so at most `capacity` samples are ever waiting.

use crate::sampler::Sample;
use std::time::Duration;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::time::{timeout_at, Instant};
use tracing::warn;

/// Create a handoff holding at most `capacity` unread samples.
///
/// A capacity of zero is treated as one.
pub fn channel(capacity: usize) -> (SampleSender, SampleReceiver) {
    let capacity = capacity.max(1);
    // The broadcast ring rounds up to a power of two; the receiver trims the
    // surplus before every read.
    let (tx, rx) = broadcast::channel(capacity);
    (SampleSender { tx }, SampleReceiver { rx, capacity, dropped: 0 })
}

#[derive(Debug)]
pub struct SampleSender {
    tx: broadcast::Sender<Sample>,
}

impl SampleSender {
    /// Queue a sample without waiting. Returns `false` when no consumer is
    /// attached, in which case the sample is discarded.
    pub fn publish(&self, sample: Sample) -> bool {
        self.tx.send(sample).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Received {
    Sample(Sample),
    /// Nothing arrived within the wait.
    Idle,
    /// The producer is gone and every queued sample has been read.
    Closed,
}

#[derive(Debug)]
pub struct SampleReceiver {
    rx: broadcast::Receiver<Sample>,
    capacity: usize,
    dropped: u64,
}

impl SampleReceiver {
    /// Wait up to `timeout` for the next sample.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Received {
        self.discard_surplus();
        let deadline = Instant::now() + timeout;
        loop {
            match timeout_at(deadline, self.rx.recv()).await {
                Err(_) => return Received::Idle,
                Ok(Ok(sample)) => return Received::Sample(sample),
                Ok(Err(RecvError::Lagged(skipped))) => {
                    self.dropped += skipped;
                    warn!(skipped, "consumer fell behind; oldest samples dropped");
                }
                Ok(Err(RecvError::Closed)) => return Received::Closed,
            }
        }
    }

    /// Skip the oldest unread samples until no more than `capacity` remain.
    fn discard_surplus(&mut self) {
        let mut skipped = 0u64;
        while self.rx.len() > self.capacity {
            match self.rx.try_recv() {
                Ok(_) => skipped += 1,
                Err(TryRecvError::Lagged(lost)) => skipped += lost,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if skipped > 0 {
            self.dropped += skipped;
            warn!(skipped, "consumer fell behind; oldest samples dropped");
        }
    }

    /// Samples discarded before this receiver got to them.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
