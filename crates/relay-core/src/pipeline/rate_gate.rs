//! Minimum spacing between sends.
//!
//! The gate keeps the earliest instant the next send may start. Each caller
//! reserves a slot under the lock and sleeps outside it, so concurrent
//! callers are spaced out too.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::PipelineConfig;

/// Send pacing for one worker.
pub struct RateGate {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateGate {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Gate for one worker of the configured pool.
    #[must_use]
    pub fn per_worker(config: &PipelineConfig) -> Self {
        Self::new(config.send_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a send is allowed, and reserve that slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}
