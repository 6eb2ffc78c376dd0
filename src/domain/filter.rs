//! Query predicate for listing notifications.

use crate::domain::notification::{Notification, NotificationType, Priority, Status};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Filter applied by list queries.
///
/// Empty sets match everything. Expired records are excluded unless
/// `include_expired` is set.
///
/// # Example
/// ```
/// use notification_hub::{NotificationFilter, NotificationType, Status};
///
/// let filter = NotificationFilter::new()
///     .with_status(Status::Unread)
///     .with_type(NotificationType::Detection)
///     .with_limit(20);
/// assert_eq!(filter.limit, Some(20));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotificationFilter {
    /// Accepted statuses
    pub statuses: Vec<Status>,
    /// Accepted types
    pub types: Vec<NotificationType>,
    /// Exact component match
    pub component: Option<String>,
    /// Minimum priority
    pub min_priority: Option<Priority>,
    /// Only records created at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Keep records whose expiry has passed
    pub include_expired: bool,
    /// Number of matches to skip (newest first)
    pub offset: usize,
    /// Maximum number of matches to return
    pub limit: Option<usize>,
}

impl NotificationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_type(mut self, notification_type: NotificationType) -> Self {
        self.types.push(notification_type);
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_min_priority(mut self, priority: Priority) -> Self {
        self.min_priority = Some(priority);
        self
    }

    pub fn since(mut self, instant: DateTime<Utc>) -> Self {
        self.since = Some(instant);
        self
    }

    pub fn including_expired(mut self) -> Self {
        self.include_expired = true;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `notification` satisfies every predicate at `now`.
    ///
    /// Paging (`offset`, `limit`) is applied by the caller.
    pub fn matches(&self, notification: &Notification, now: DateTime<Utc>) -> bool {
        if !self.include_expired && notification.is_expired(now) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&notification.status()) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&notification.notification_type()) {
            return false;
        }
        if let Some(component) = &self.component {
            if notification.component() != component {
                return false;
            }
        }
        if let Some(min) = self.min_priority {
            if notification.priority() < min {
                return false;
            }
        }
        if let Some(since) = self.since {
            if notification.timestamp() < since {
                return false;
            }
        }
        true
    }
}
