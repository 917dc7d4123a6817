//! Host delay provider for running sessions off-target.

use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use std::time::Duration;

/// Blocks the calling thread. Only suitable off the async executor, e.g.
/// inside `tokio::task::spawn_blocking`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayMs<u32> for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

impl DelayUs<u32> for StdDelay {
    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_delay_ms_blocks_at_least_requested() {
        let start = Instant::now();
        StdDelay.delay_ms(20);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
