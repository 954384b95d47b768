//! Doubling delay schedule shared by the poller and the updater.

use std::time::Duration;

/// Exponential backoff: the delay before attempt `i` (0-based) is
/// `initial * 2^i`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max_attempts: u32,
    pub max_delay: Duration,
}

impl Backoff {
    pub const fn new(initial: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            max_attempts,
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.initial
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// The full schedule, one delay per attempt. Never decreasing.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts).map(move |attempt| self.delay(attempt))
    }
}

/// Retry and rate-limit settings for a [`RemoteClient`](crate::RemoteClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Schedule for polling long-running operations; sleeps before each poll.
    pub poll: Backoff,
    /// Schedule for retrying instance updates; sleeps between attempts.
    pub update: Backoff,
    /// Pause after a 429 before reconnecting and reissuing the request.
    pub rate_limit_cooldown: Duration,
    /// Consecutive 429s tolerated on a single request.
    pub max_rate_limit_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll: Backoff::new(Duration::from_millis(200), 10),
            update: Backoff::new(Duration::from_millis(200), 5),
            rate_limit_cooldown: Duration::from_secs(15),
            max_rate_limit_retries: 8,
        }
    }
}
