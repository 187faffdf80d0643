//! Request pacing for the lichess API
//!
//! Lichess asks clients to wait between requests and to back off for a full minute
//! after a 429 response. Requests are strictly sequential, so a single "earliest next
//! request" instant is all the state needed.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Margin applied to the normal delay so we never race the server's own clock
pub const DELAY_MARGIN: f64 = 1.05;

/// Longest gap the limiter will schedule; larger gaps are clamped to it
pub const MAX_GAP: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Paces requests with a fixed delay and a longer cool-down after throttling
#[derive(Debug)]
pub struct RateLimiter {
    request_delay: Duration,
    throttle_cooldown: Duration,
    next_allowed: Instant,
}

impl RateLimiter {
    /// Creates a limiter that allows the first request immediately
    ///
    /// # Arguments
    /// * `request_delay` - Minimum gap after a completed request
    /// * `throttle_cooldown` - Gap after the server answered 429
    pub fn new(request_delay: Duration, throttle_cooldown: Duration) -> Self {
        Self {
            request_delay,
            throttle_cooldown,
            next_allowed: Instant::now(),
        }
    }

    /// Earliest instant at which the next request may be sent
    pub fn next_allowed(&self) -> Instant {
        self.next_allowed
    }

    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    pub fn throttle_cooldown(&self) -> Duration {
        self.throttle_cooldown
    }

    /// Sleeps until the next request is allowed
    pub async fn wait_turn(&self) {
        let now = Instant::now();
        if self.next_allowed > now {
            debug!("Sleep {:.3} seconds", (self.next_allowed - now).as_secs_f64());
            sleep_until(self.next_allowed).await;
        }
    }

    /// Records a completed request
    pub fn record_success(&mut self) {
        self.push_back(self.request_delay.min(MAX_GAP).mul_f64(DELAY_MARGIN));
    }

    /// Records a 429 response
    pub fn record_throttled(&mut self) {
        self.push_back(self.throttle_cooldown);
    }

    fn push_back(&mut self, gap: Duration) {
        let now = Instant::now();
        let candidate = now
            .checked_add(gap.min(MAX_GAP))
            .unwrap_or(self.next_allowed);
        self.next_allowed = self.next_allowed.max(candidate);
    }
}
