use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive broker or data calls.
///
/// Callers queue on the inner lock, so concurrent sessions are released one
/// at a time, each at least `min_delay` after the previous one.
#[derive(Debug)]
pub struct Throttle {
    min_delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last: Mutex::new(None),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until the next call is allowed and claims the slot.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.min_delay).await;
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_call_is_immediate() {
        let throttle = Throttle::new(Duration::from_millis(500));
        let started = Instant::now();
        throttle.wait().await;
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn consecutive_calls_are_spaced() {
        let throttle = Throttle::new(Duration::from_millis(30));
        let started = Instant::now();
        for _ in 0..3 {
            throttle.wait().await;
        }
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
