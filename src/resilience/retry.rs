//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Retry schedule: exponential backoff capped at a maximum delay, with a
/// uniform jitter fraction so synchronized callers fan out.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
}

impl RetryPolicy {
    /// Builds a policy from validated configuration.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before the attempt numbered `attempt` (1-based; the delay
    /// precedes attempt 2 and later).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        if self.jitter == 0.0 {
            return backoff;
        }
        let spread = backoff.as_secs_f64() * self.jitter;
        let sampled = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((backoff.as_secs_f64() + sampled).max(0.0))
    }
}
