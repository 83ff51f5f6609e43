//! Statement latency tracking.

use std::time::Duration;

use parking_lot::Mutex;

/// Point-in-time latency summary.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatencySnapshot {
    /// Samples recorded since construction (or the last reset), including
    /// those already rotated out of the window.
    pub recorded: u64,
    /// Samples currently retained in the window.
    pub window: usize,
    /// Median latency.
    pub p50: Option<Duration>,
    /// 95th percentile latency.
    pub p95: Option<Duration>,
    /// 99th percentile latency.
    pub p99: Option<Duration>,
    /// Slowest retained sample.
    pub max: Option<Duration>,
}

#[derive(Debug)]
struct Ring {
    samples: Vec<Duration>,
    next: usize,
    recorded: u64,
}

/// Bounded ring buffer of recent latency samples with percentile
/// extraction.
///
/// Old samples rotate out once the window is full, so percentiles reflect
/// recent behavior rather than process lifetime.
#[derive(Debug)]
pub struct LatencyTracker {
    capacity: usize,
    inner: Mutex<Ring>,
}

impl LatencyTracker {
    /// Creates a tracker retaining up to `capacity` samples (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Ring {
                samples: Vec::with_capacity(capacity),
                next: 0,
                recorded: 0,
            }),
        }
    }

    /// Records one sample, evicting the oldest when the window is full.
    pub fn record(&self, sample: Duration) {
        let mut inner = self.inner.lock();
        inner.recorded += 1;
        if inner.samples.len() < self.capacity {
            inner.samples.push(sample);
        } else {
            let slot = inner.next;
            inner.samples[slot] = sample;
        }
        inner.next = (inner.next + 1) % self.capacity;
    }

    /// Nearest-rank percentile over the retained window; `pct` in
    /// `0.0..=100.0`. Returns `None` while no samples are retained.
    pub fn percentile(&self, pct: f64) -> Option<Duration> {
        let inner = self.inner.lock();
        percentile_of(&inner.samples, pct)
    }

    /// Summary of the current window.
    pub fn snapshot(&self) -> LatencySnapshot {
        let inner = self.inner.lock();
        LatencySnapshot {
            recorded: inner.recorded,
            window: inner.samples.len(),
            p50: percentile_of(&inner.samples, 50.0),
            p95: percentile_of(&inner.samples, 95.0),
            p99: percentile_of(&inner.samples, 99.0),
            max: inner.samples.iter().max().copied(),
        }
    }

    /// Clears the window and the running count.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.samples.clear();
        inner.next = 0;
        inner.recorded = 0;
    }
}

fn percentile_of(samples: &[Duration], pct: f64) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let pct = pct.clamp(0.0, 100.0);
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
}
