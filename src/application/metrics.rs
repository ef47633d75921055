//! Observability metrics for throttled dispatch.
//!
//! Counters are shared between clones of a dispatcher and can be read at any
//! time without blocking dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking dispatch statistics.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Calls granted a unit of local capacity and sent to the remote
    calls_admitted: AtomicU64,
    /// Times a caller had to wait for local capacity
    admission_waits: AtomicU64,
    /// Throttling rejections reported by the remote service
    remote_rejections: AtomicU64,
    /// Dispatches that ran out of retries
    throttle_exhausted: AtomicU64,
    /// Dispatches abandoned because the deadline would pass
    deadlines_exceeded: AtomicU64,
    /// Non-throttling remote failures passed through
    remote_failures: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.calls_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_admission_wait(&self) {
        self.inner.admission_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_rejection(&self) {
        self.inner.remote_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_exhausted(&self) {
        self.inner.throttle_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deadline_exceeded(&self) {
        self.inner.deadlines_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_failure(&self) {
        self.inner.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of calls sent to the remote service.
    pub fn calls_admitted(&self) -> u64 {
        self.inner.calls_admitted.load(Ordering::Relaxed)
    }

    /// Get the number of local admission waits.
    pub fn admission_waits(&self) -> u64 {
        self.inner.admission_waits.load(Ordering::Relaxed)
    }

    /// Get the number of remote throttling rejections.
    pub fn remote_rejections(&self) -> u64 {
        self.inner.remote_rejections.load(Ordering::Relaxed)
    }

    /// Get the number of dispatches that exhausted their retries.
    pub fn throttle_exhausted(&self) -> u64 {
        self.inner.throttle_exhausted.load(Ordering::Relaxed)
    }

    /// Get the number of dispatches that hit their deadline.
    pub fn deadlines_exceeded(&self) -> u64 {
        self.inner.deadlines_exceeded.load(Ordering::Relaxed)
    }

    /// Get the number of non-throttling remote failures.
    pub fn remote_failures(&self) -> u64 {
        self.inner.remote_failures.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls_admitted: self.calls_admitted(),
            admission_waits: self.admission_waits(),
            remote_rejections: self.remote_rejections(),
            throttle_exhausted: self.throttle_exhausted(),
            deadlines_exceeded: self.deadlines_exceeded(),
            remote_failures: self.remote_failures(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Calls sent to the remote service
    pub calls_admitted: u64,
    /// Local admission waits
    pub admission_waits: u64,
    /// Remote throttling rejections
    pub remote_rejections: u64,
    /// Dispatches that exhausted their retries
    pub throttle_exhausted: u64,
    /// Dispatches that hit their deadline
    pub deadlines_exceeded: u64,
    /// Non-throttling remote failures
    pub remote_failures: u64,
}

impl MetricsSnapshot {
    /// Fraction of remote calls rejected for throttling (0.0 to 1.0).
    ///
    /// A high value means local policies are looser than the remote quota.
    pub fn rejection_rate(&self) -> f64 {
        if self.calls_admitted == 0 {
            0.0
        } else {
            self.remote_rejections as f64 / self.calls_admitted as f64
        }
    }
}
