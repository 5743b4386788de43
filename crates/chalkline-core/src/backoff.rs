//! Retry delay scheduling.
//!
//! Pure computation: the driver asks for the next delay, sleeps it, and
//! reports the outcome. Delays grow as `min(base * 2^attempt, cap)` with
//! equal jitter (half the raw delay fixed, half randomized) so a fleet of
//! clients recovering from the same outage does not reconnect in lockstep.

use std::time::Duration;

use crate::env::Environment;

/// Default first retry delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default ceiling on the raw (pre-jitter) delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Default number of consecutive failures before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Shift cap keeping `base << attempt` inside `Duration` range.
const MAX_SHIFT: u32 = 16;

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// First retry delay; doubles on each consecutive failure.
    pub base: Duration,
    /// Ceiling on the raw delay before jitter.
    pub cap: Duration,
    /// Consecutive failures tolerated before the connection is declared
    /// exhausted.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_DELAY,
            cap: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Retry attempt tracker.
///
/// Owns only a counter; time is the driver's concern. The counter resets on
/// any successful open so a long-lived connection that drops once starts
/// again from the base delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    /// Create a backoff tracker at attempt zero.
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Consecutive failures recorded so far.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether the attempt budget is spent.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.attempt >= self.config.max_attempts
    }

    /// Reset the counter after a successful open.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay to wait before the next retry, advancing the attempt counter.
    ///
    /// Returns `None` once the attempt budget is spent; the caller must then
    /// stop retrying and surface exhaustion.
    pub fn next_delay<E: Environment>(&mut self, env: &E) -> Option<Duration> {
        if self.exhausted() {
            return None;
        }

        let shift = self.attempt.min(MAX_SHIFT);
        let raw = self.config.base.saturating_mul(1 << shift).min(self.config.cap);
        self.attempt += 1;

        let half = raw / 2;
        let span_ms = half.as_millis() as u64;
        let jitter = if span_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(env.random_u64() % (span_ms + 1))
        };

        Some(half + jitter)
    }
}
