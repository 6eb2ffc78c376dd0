//! Admission policies for notification producers.
//!
//! A policy tracks the admission history of one component and decides
//! whether the next notification from it may be admitted.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

/// Decision made by an admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Admit the notification
    Admit,
    /// Reject the notification; the window reopens after `retry_after`
    Reject {
        /// Time until the oldest admission ages out of the window
        retry_after: Duration,
    },
}

impl PolicyDecision {
    /// Check if this decision is Admit.
    pub fn is_admit(&self) -> bool {
        matches!(self, PolicyDecision::Admit)
    }

    /// Check if this decision is Reject.
    pub fn is_reject(&self) -> bool {
        matches!(self, PolicyDecision::Reject { .. })
    }
}

/// Trait for admission policies.
pub trait RateLimitPolicy: Send + Sync {
    /// Register an admission attempt at `now` and decide on it.
    fn register_event(&mut self, now: DateTime<Utc>) -> PolicyDecision;

    /// Whether the policy holds no admissions that still count at `now`.
    fn is_idle(&self, now: DateTime<Utc>) -> bool;

    /// Forget all history.
    fn reset(&mut self);
}

/// Sliding-window admission policy.
///
/// Admits up to `max_events` within any trailing window of `window_duration`.
/// An admission stops counting once `now - admitted_at >= window_duration`.
///
/// Clock readings are clamped to the latest one seen, so a wall clock that
/// steps backwards cannot reopen a full window.
///
/// # Example
/// ```
/// use notification_hub::{RateLimitPolicy, TimeWindowPolicy};
/// use chrono::Utc;
/// use std::time::Duration;
///
/// let mut policy = TimeWindowPolicy::new(2, Duration::from_secs(60));
/// let now = Utc::now();
///
/// assert!(policy.register_event(now).is_admit());
/// assert!(policy.register_event(now).is_admit());
/// assert!(policy.register_event(now).is_reject());
///
/// let later = now + chrono::Duration::seconds(60);
/// assert!(policy.register_event(later).is_admit());
/// ```
#[derive(Debug, Clone)]
pub struct TimeWindowPolicy {
    max_events: usize,
    window_duration: Duration,
    admissions: VecDeque<DateTime<Utc>>,
    latest: Option<DateTime<Utc>>,
}

impl TimeWindowPolicy {
    /// Create a new time-window policy.
    ///
    /// # Arguments
    /// * `max_events` - Maximum admissions within the window
    /// * `window_duration` - Length of the sliding window
    pub fn new(max_events: usize, window_duration: Duration) -> Self {
        Self {
            max_events,
            window_duration,
            admissions: VecDeque::with_capacity(max_events.min(64)),
            latest: None,
        }
    }

    /// Number of admissions currently counted.
    pub fn admitted(&self) -> usize {
        self.admissions.len()
    }

    fn monotonic(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = match self.latest {
            Some(latest) if latest > now => latest,
            _ => now,
        };
        self.latest = Some(now);
        now
    }

    fn age(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        (now - since).to_std().unwrap_or(Duration::ZERO)
    }

    fn expire_old_events(&mut self, now: DateTime<Utc>) {
        while let Some(&oldest) = self.admissions.front() {
            if self.age(oldest, now) >= self.window_duration {
                self.admissions.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateLimitPolicy for TimeWindowPolicy {
    fn register_event(&mut self, now: DateTime<Utc>) -> PolicyDecision {
        let now = self.monotonic(now);
        self.expire_old_events(now);

        if self.admissions.len() < self.max_events {
            self.admissions.push_back(now);
            return PolicyDecision::Admit;
        }

        let retry_after = self
            .admissions
            .front()
            .map(|&oldest| self.window_duration.saturating_sub(self.age(oldest, now)))
            .unwrap_or(self.window_duration);
        PolicyDecision::Reject { retry_after }
    }

    fn is_idle(&self, now: DateTime<Utc>) -> bool {
        let now = self.latest.map_or(now, |latest| latest.max(now));
        self.admissions
            .back()
            .map_or(true, |&newest| self.age(newest, now) >= self.window_duration)
    }

    fn reset(&mut self) {
        self.admissions.clear();
        self.latest = None;
    }
}
