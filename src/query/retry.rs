//! Retry state machine for a single logical fetch
//!
//! Throttling is retried indefinitely; the rate limiter supplies the back-off.
//! Everything else either finishes the fetch or ends it fatally.

use super::fetcher::FetchOutcome;

/// Where a fetch currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// No attempt made yet
    Idle,
    /// A request is in flight
    Fetching,
    /// The last attempt was throttled; waiting out the cool-down
    ThrottledBackoff,
    /// A response was obtained
    Done,
    /// The server answered with a non-retryable status
    Fatal,
}

/// Tracks attempts of one fetch through [`RetryState`]
#[derive(Debug, Clone)]
pub struct FetchRetry {
    state: RetryState,
    attempts: u32,
    throttles: u32,
}

impl Default for FetchRetry {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchRetry {
    pub fn new() -> Self {
        Self {
            state: RetryState::Idle,
            attempts: 0,
            throttles: 0,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn throttles(&self) -> u32 {
        self.throttles
    }

    /// True once the fetch is `Done` or `Fatal`
    pub fn is_finished(&self) -> bool {
        matches!(self.state, RetryState::Done | RetryState::Fatal)
    }

    /// Moves to `Fetching`
    ///
    /// Only valid from `Idle` or `ThrottledBackoff`; finished machines stay put.
    pub fn begin_attempt(&mut self) -> RetryState {
        if matches!(self.state, RetryState::Idle | RetryState::ThrottledBackoff) {
            self.state = RetryState::Fetching;
            self.attempts += 1;
        }
        self.state
    }

    /// Applies the outcome of the attempt in flight
    pub fn record(&mut self, outcome: &FetchOutcome) -> RetryState {
        if self.state != RetryState::Fetching {
            return self.state;
        }
        self.state = match outcome {
            FetchOutcome::Success(_) => RetryState::Done,
            FetchOutcome::Throttled => {
                self.throttles += 1;
                RetryState::ThrottledBackoff
            }
            FetchOutcome::HardFailure { .. } => RetryState::Fatal,
        };
        self.state
    }
}
