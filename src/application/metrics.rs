//! Observability metrics for the shield.
//!
//! Lifetime counters of admission decisions and pruning work, complementary
//! to the sliding window counts returned by `telemetry`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking shield statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Total number of requests allowed
    requests_allowed: AtomicU64,
    /// Total number of requests denied
    requests_denied: AtomicU64,
    /// Total number of events removed by pruning
    events_pruned: AtomicU64,
    /// Total number of emptied buckets removed from the ledger
    buckets_released: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                requests_allowed: AtomicU64::new(0),
                requests_denied: AtomicU64::new(0),
                events_pruned: AtomicU64::new(0),
                buckets_released: AtomicU64::new(0),
            }),
        }
    }

    /// Record an allowed request.
    pub(crate) fn record_allowed(&self) {
        self.inner.requests_allowed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a denied request.
    pub(crate) fn record_denied(&self) {
        self.inner.requests_denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one prune pass.
    pub(crate) fn record_prune(&self, events_removed: u64, buckets_released: u64) {
        if events_removed > 0 {
            self.inner
                .events_pruned
                .fetch_add(events_removed, Ordering::Relaxed);
        }
        if buckets_released > 0 {
            self.inner
                .buckets_released
                .fetch_add(buckets_released, Ordering::Relaxed);
        }
    }

    /// Get the total number of requests allowed.
    pub fn requests_allowed(&self) -> u64 {
        self.inner.requests_allowed.load(Ordering::Relaxed)
    }

    /// Get the total number of requests denied.
    pub fn requests_denied(&self) -> u64 {
        self.inner.requests_denied.load(Ordering::Relaxed)
    }

    /// Get the total number of events removed by pruning.
    pub fn events_pruned(&self) -> u64 {
        self.inner.events_pruned.load(Ordering::Relaxed)
    }

    /// Get the total number of buckets released after emptying.
    pub fn buckets_released(&self) -> u64 {
        self.inner.buckets_released.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_allowed: self.requests_allowed(),
            requests_denied: self.requests_denied(),
            events_pruned: self.events_pruned(),
            buckets_released: self.buckets_released(),
        }
    }

    /// Reset all metrics to zero.
    ///
    /// Does not touch the ledger; window counts are unaffected.
    pub fn reset(&self) {
        self.inner.requests_allowed.store(0, Ordering::Relaxed);
        self.inner.requests_denied.store(0, Ordering::Relaxed);
        self.inner.events_pruned.store(0, Ordering::Relaxed);
        self.inner.buckets_released.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total number of requests allowed
    pub requests_allowed: u64,
    /// Total number of requests denied
    pub requests_denied: u64,
    /// Total number of events removed by pruning
    pub events_pruned: u64,
    /// Total number of emptied buckets removed from the ledger
    pub buckets_released: u64,
}

impl MetricsSnapshot {
    /// Calculate the denial rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been checked.
    pub fn denial_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.requests_denied as f64 / total as f64
        }
    }

    /// Get the total number of requests checked (allowed + denied).
    pub fn total_requests(&self) -> u64 {
        self.requests_allowed.saturating_add(self.requests_denied)
    }
}
