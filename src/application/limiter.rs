//! Per-component admission control.
//!
//! The rate limiter keeps one sliding window per producing component, so a
//! flapping sensor can only exhaust its own budget.

use crate::application::metrics::Metrics;
use crate::domain::policy::{PolicyDecision, RateLimitPolicy, TimeWindowPolicy};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

/// Decision about whether to admit a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitDecision {
    /// Admit the notification
    Allow,
    /// The component's window is full
    Reject {
        /// Time until the window has room again
        retry_after: Duration,
    },
}

impl LimitDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, LimitDecision::Allow)
    }
}

/// Coordinates admission decisions for all components.
///
/// Windows live in a sharded `DashMap`: calls for different components rarely
/// contend, and calls for the same component are serialized on its shard.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, TimeWindowPolicy>,
    max_events: usize,
    window: Duration,
    metrics: Metrics,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `max_events` - Admissions allowed per component within `window`
    /// * `window` - Length of the sliding window
    /// * `metrics` - Metrics tracker; rejections are recorded here
    pub fn new(max_events: usize, window: Duration, metrics: Metrics) -> Self {
        Self {
            windows: DashMap::new(),
            max_events,
            window,
            metrics,
        }
    }

    /// Decide whether a notification from `component` may be admitted at `now`.
    ///
    /// An `Allow` consumes one slot of the component's window.
    pub fn allow(&self, component: &str, now: DateTime<Utc>) -> LimitDecision {
        let decision = match self.windows.get_mut(component) {
            Some(mut policy) => policy.register_event(now),
            None => self
                .windows
                .entry(component.to_string())
                .or_insert_with(|| TimeWindowPolicy::new(self.max_events, self.window))
                .register_event(now),
        };

        match decision {
            PolicyDecision::Admit => LimitDecision::Allow,
            PolicyDecision::Reject { retry_after } => {
                self.metrics.record_rate_limited();
                LimitDecision::Reject { retry_after }
            }
        }
    }

    /// Drop components with no admissions left in their window.
    ///
    /// Returns the number of components removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, policy| !policy.is_idle(now));
        before.saturating_sub(self.windows.len())
    }

    /// Number of components with tracked windows.
    pub fn tracked_components(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn limiter(max: usize, window_secs: u64) -> RateLimiter {
        RateLimiter::new(max, Duration::from_secs(window_secs), Metrics::new())
    }

    #[test]
    fn test_rejects_after_max_events() {
        let limiter = limiter(10, 60);
        let now = Utc::now();

        for i in 0..10 {
            assert!(limiter.allow("detection", now).is_allow(), "event {}", i);
        }
        assert!(matches!(
            limiter.allow("detection", now),
            LimitDecision::Reject { .. }
        ));
        assert_eq!(limiter.metrics.notifications_rate_limited(), 1);
    }

    #[test]
    fn test_window_rolls_forward() {
        let limiter = limiter(2, 60);
        let now = Utc::now();

        assert!(limiter.allow("audio", now).is_allow());
        assert!(limiter.allow("audio", now + chrono::Duration::seconds(30)).is_allow());
        assert!(!limiter.allow("audio", now + chrono::Duration::seconds(59)).is_allow());

        // First admission ages out at +60s, second at +90s
        assert!(limiter.allow("audio", now + chrono::Duration::seconds(60)).is_allow());
        assert!(!limiter.allow("audio", now + chrono::Duration::seconds(61)).is_allow());
    }

    #[test]
    fn test_components_are_independent() {
        let limiter = limiter(1, 60);
        let now = Utc::now();

        assert!(limiter.allow("detection", now).is_allow());
        assert!(!limiter.allow("detection", now).is_allow());
        assert!(limiter.allow("system", now).is_allow());
        assert_eq!(limiter.tracked_components(), 2);
    }

    #[test]
    fn test_prune_idle_components() {
        let limiter = limiter(5, 60);
        let now = Utc::now();

        limiter.allow("a", now);
        limiter.allow("b", now + chrono::Duration::seconds(30));

        assert_eq!(limiter.prune(now + chrono::Duration::seconds(60)), 1);
        assert_eq!(limiter.tracked_components(), 1);
        assert_eq!(limiter.prune(now + chrono::Duration::seconds(90)), 1);
        assert_eq!(limiter.tracked_components(), 0);
    }

    #[test]
    fn test_concurrent_admissions_respect_limit() {
        let limiter = Arc::new(limiter(50, 60));
        let admitted = Arc::new(AtomicUsize::new(0));
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                thread::spawn(move || {
                    for _ in 0..20 {
                        if limiter.allow("shared", now).is_allow() {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::Relaxed), 50);
        assert_eq!(limiter.metrics.notifications_rate_limited(), 110);
    }
}
