//! Shared rate gate for outbound requests.
//!
//! Every component that talks to the filing source or the fallback share
//! provider holds the same [`RateGate`] through an `Arc`, so the whole
//! process observes one request budget regardless of how many workers are
//! running.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Enforces a minimum interval between consecutive outbound requests.
///
/// Waiters serialize on an async mutex and sleep inside the critical
/// section, so concurrent callers are granted slots one interval apart
/// rather than racing the clock.
#[derive(Debug)]
pub struct RateGate {
    last_grant: Mutex<Instant>,
    min_interval: Duration,
}

impl RateGate {
    /// Creates a gate with the given minimum inter-request interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_grant: Mutex::new(Instant::now() - min_interval),
            min_interval,
        }
    }

    /// Waits until a request slot is available and claims it.
    pub async fn acquire(&self) {
        let mut last = self.last_grant.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }

    /// The configured minimum inter-request interval.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
