//! Minimum interval between calls to the same remote service.
//!
//! Each service gets its own slot clock. A caller reserves the next free
//! slot under the lock and sleeps outside it, so concurrent workers hitting
//! the same service queue up one interval apart while other services are
//! unaffected.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Per-service call pacing.
pub struct Pacer {
    min_interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until `service` may be called again.
    pub async fn wait(&self, service: &str) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = {
            let mut slots = self.next_slot.lock();
            let now = Instant::now();
            let slot = slots
                .get(service)
                .copied()
                .filter(|s| *s > now)
                .unwrap_or(now);
            slots.insert(service.to_string(), slot + self.min_interval);
            slot
        };

        if slot > Instant::now() {
            tokio::time::sleep_until(slot).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_services_are_paced_independently() {
        let pacer = Pacer::new(Duration::from_secs(1));
        let started = Instant::now();

        pacer.wait("a").await;
        pacer.wait("b").await;
        assert_eq!(started.elapsed(), Duration::ZERO);

        pacer.wait("a").await;
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_service_is_not_delayed() {
        let pacer = Pacer::new(Duration::from_secs(1));
        pacer.wait("a").await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        let before = Instant::now();
        pacer.wait("a").await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_waits() {
        let pacer = Pacer::new(Duration::ZERO);
        let started = Instant::now();
        for _ in 0..10 {
            pacer.wait("a").await;
        }
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
