//! Three-state circuit breaker.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::BreakerConfig;

/// Observable breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BreakerState {
    /// Statements flow normally.
    Closed,
    /// Statements are rejected until the cool-down elapses.
    Open,
    /// One probe statement is allowed through.
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker guarding the transport.
///
/// Trips open after a run of consecutive failures, rejects statements for
/// a cool-down period, then admits a single probe; the probe's outcome
/// closes the breaker or re-opens it.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cool_down: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Builds a breaker from validated configuration.
    pub fn new(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            cool_down: Duration::from_millis(config.cool_down_ms),
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Whether a statement may be attempted right now.
    ///
    /// An open breaker flips to half-open once the cool-down has elapsed,
    /// admitting the caller as its probe.
    pub fn admit(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.cool_down {
                    debug!("circuit breaker half-open, admitting probe");
                    inner.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Records a successful statement, closing the breaker.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    /// Records a failed statement; a half-open probe failure or reaching
    /// the threshold re-opens the breaker.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let tripped = inner.state == BreakerState::HalfOpen
            || inner.consecutive_failures >= self.failure_threshold;
        if tripped && inner.state != BreakerState::Open {
            warn!(
                failures = inner.consecutive_failures,
                "circuit breaker opened"
            );
            inner.state = BreakerState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }
}
