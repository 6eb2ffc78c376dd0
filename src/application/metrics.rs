//! Observability metrics for the notification service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters describing service activity.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    created: AtomicU64,
    rate_limited: AtomicU64,
    evicted: AtomicU64,
    expired: AtomicU64,
    deleted: AtomicU64,
    cleanup_passes: AtomicU64,
    cleanup_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_created(&self) {
        self.inner.created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rate_limited(&self) {
        self.inner.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.inner.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired(&self, count: usize) {
        self.inner
            .expired
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_deleted(&self) {
        self.inner.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cleanup_pass(&self) {
        self.inner.cleanup_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cleanup_failure(&self) {
        self.inner.cleanup_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Notifications admitted and stored.
    pub fn notifications_created(&self) -> u64 {
        self.inner.created.load(Ordering::Relaxed)
    }

    /// Creations rejected by the rate limiter.
    pub fn notifications_rate_limited(&self) -> u64 {
        self.inner.rate_limited.load(Ordering::Relaxed)
    }

    /// Records removed to make room for new ones.
    pub fn notifications_evicted(&self) -> u64 {
        self.inner.evicted.load(Ordering::Relaxed)
    }

    /// Records removed by expiry purges.
    pub fn notifications_expired(&self) -> u64 {
        self.inner.expired.load(Ordering::Relaxed)
    }

    /// Records removed by explicit deletion.
    pub fn notifications_deleted(&self) -> u64 {
        self.inner.deleted.load(Ordering::Relaxed)
    }

    /// Completed cleanup passes.
    pub fn cleanup_passes(&self) -> u64 {
        self.inner.cleanup_passes.load(Ordering::Relaxed)
    }

    /// Cleanup passes that panicked.
    pub fn cleanup_failures(&self) -> u64 {
        self.inner.cleanup_failures.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            notifications_created: self.notifications_created(),
            notifications_rate_limited: self.notifications_rate_limited(),
            notifications_evicted: self.notifications_evicted(),
            notifications_expired: self.notifications_expired(),
            notifications_deleted: self.notifications_deleted(),
            cleanup_passes: self.cleanup_passes(),
            cleanup_failures: self.cleanup_failures(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub notifications_created: u64,
    pub notifications_rate_limited: u64,
    pub notifications_evicted: u64,
    pub notifications_expired: u64,
    pub notifications_deleted: u64,
    pub cleanup_passes: u64,
    pub cleanup_failures: u64,
}

impl MetricsSnapshot {
    /// Fraction of creation attempts rejected by the rate limiter (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been attempted.
    pub fn rejection_rate(&self) -> f64 {
        let total = self
            .notifications_created
            .saturating_add(self.notifications_rate_limited);
        if total == 0 {
            0.0
        } else {
            self.notifications_rate_limited as f64 / total as f64
        }
    }
}
