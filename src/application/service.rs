//! Notification service facade.
//!
//! Ties validation, per-component rate limiting, the bounded store,
//! subscriber fan-out and background cleanup into one handle.

use crate::application::cleanup::{CleanupHandle, CleanupScheduler, ShutdownError};
use crate::application::config::{ConfigError, ServiceConfig};
use crate::application::limiter::{LimitDecision, RateLimiter};
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, EvictionPolicy};
use crate::application::store::{NotificationList, NotificationStore};
use crate::domain::error::NotificationError;
use crate::domain::filter::NotificationFilter;
use crate::domain::notification::{Notification, NotificationId, NotificationRequest, Status};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::eviction::StatusPriorityEviction;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// Per-operation logging: `debug` when the service runs with `debug = true`,
/// `trace` otherwise.
macro_rules! op_log {
    ($service:expr, $($arg:tt)+) => {
        if $service.config.debug {
            debug!($($arg)+);
        } else {
            trace!($($arg)+);
        }
    };
}

/// Builder for constructing a [`NotificationService`].
pub struct NotificationServiceBuilder {
    config: ServiceConfig,
    clock: Option<Arc<dyn Clock>>,
    eviction: Option<Arc<dyn EvictionPolicy>>,
}

impl NotificationServiceBuilder {
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the default [`StatusPriorityEviction`] policy.
    pub fn with_eviction_policy(mut self, policy: Arc<dyn EvictionPolicy>) -> Self {
        self.eviction = Some(policy);
        self
    }

    /// Build the service.
    ///
    /// Background cleanup starts immediately when called inside a Tokio
    /// runtime. Outside one, a warning is logged and expired records are only
    /// removed by [`NotificationService::purge_expired`].
    ///
    /// # Errors
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn build(self) -> Result<NotificationService, ConfigError> {
        self.config.validate()?;
        let cleanup_config = self.config.cleanup_config()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let eviction = self
            .eviction
            .unwrap_or_else(|| Arc::new(StatusPriorityEviction::new()));
        let metrics = Metrics::new();

        let store = Arc::new(NotificationStore::new(
            self.config.max_notifications,
            eviction,
            clock.clone(),
        ));
        let limiter = Arc::new(RateLimiter::new(
            self.config.rate_limit_max_events,
            self.config.rate_limit_window,
            metrics.clone(),
        ));
        let (events, _) = broadcast::channel(self.config.subscriber_buffer);

        let scheduler = CleanupScheduler::new(
            store.clone(),
            limiter.clone(),
            clock.clone(),
            metrics.clone(),
            cleanup_config,
        );
        let cleanup_task = match Handle::try_current() {
            Ok(runtime) => Some(scheduler.clone().start_on(&runtime)),
            Err(_) => {
                warn!("no Tokio runtime available, background cleanup disabled");
                None
            }
        };

        info!(
            max_notifications = self.config.max_notifications,
            rate_limit_max_events = self.config.rate_limit_max_events,
            rate_limit_window = ?self.config.rate_limit_window,
            cleanup_interval = ?self.config.cleanup_interval,
            "notification service started"
        );

        Ok(NotificationService {
            config: self.config,
            store,
            limiter,
            clock,
            metrics,
            events,
            scheduler,
            cleanup_task: Mutex::new(cleanup_task),
        })
    }
}

/// In-process notification service.
///
/// All methods take `&self` and are safe to call from any thread; share the
/// service behind an `Arc`.
///
/// # Examples
///
/// ```
/// use notification_hub::{NotificationFilter, NotificationRequest, NotificationService, ServiceConfig};
///
/// let service = NotificationService::new(ServiceConfig::default()).unwrap();
///
/// let created = service
///     .create(NotificationRequest::detection("New species", "Dunnock detected"))
///     .unwrap();
/// service.mark_read(created.id()).unwrap();
///
/// assert_eq!(service.unread_count(), 0);
/// assert_eq!(service.list(&NotificationFilter::new()).len(), 1);
/// ```
pub struct NotificationService {
    config: ServiceConfig,
    store: Arc<NotificationStore>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    events: broadcast::Sender<Notification>,
    scheduler: CleanupScheduler,
    cleanup_task: Mutex<Option<CleanupHandle>>,
}

impl NotificationService {
    /// Create a service with the system clock and default eviction.
    ///
    /// # Errors
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn new(config: ServiceConfig) -> Result<Self, ConfigError> {
        Self::builder().with_config(config).build()
    }

    pub fn builder() -> NotificationServiceBuilder {
        NotificationServiceBuilder {
            config: ServiceConfig::default(),
            clock: None,
            eviction: None,
        }
    }

    /// Admit and store a new notification.
    ///
    /// The record gets a fresh ID, the current timestamp, `Unread` status and
    /// its expiry, and is published to subscribers once stored.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank component or an expiry not after now
    /// - `RateLimited` when the component's window is full; the event is dropped
    pub fn create(&self, request: NotificationRequest) -> Result<Notification, NotificationError> {
        let now = self.clock.now();
        let notification = request.build(now, self.config.default_expiry)?;

        if let LimitDecision::Reject { retry_after } =
            self.limiter.allow(notification.component(), now)
        {
            warn!(
                component = notification.component(),
                notification_type = %notification.notification_type(),
                retry_after = ?retry_after,
                "notification rate limited, dropping"
            );
            return Err(NotificationError::RateLimited {
                component: notification.component().to_string(),
                retry_after,
            });
        }

        if let Some(evicted) = self.store.insert(notification.clone())? {
            self.metrics.record_eviction();
            if evicted.status() == Status::Unread && !evicted.is_expired(now) {
                warn!(
                    id = %evicted.id(),
                    component = evicted.component(),
                    priority = %evicted.priority(),
                    "store full, evicted unread notification"
                );
            } else {
                op_log!(self, id = %evicted.id(), "store full, evicted notification");
            }
        }
        self.metrics.record_created();

        op_log!(
            self,
            id = %notification.id(),
            notification_type = %notification.notification_type(),
            priority = %notification.priority(),
            component = notification.component(),
            "notification created"
        );

        // No receivers is not an error
        let _ = self.events.send(notification.clone());
        Ok(notification)
    }

    /// Look up a live notification.
    ///
    /// # Errors
    /// `NotFound` if the ID is unknown or the notification has expired.
    pub fn get(&self, id: NotificationId) -> Result<Notification, NotificationError> {
        self.store.get(id)
    }

    /// Snapshot of live notifications matching `filter`, newest first.
    pub fn list(&self, filter: &NotificationFilter) -> NotificationList {
        self.store.list(filter)
    }

    /// Mark a notification as read.
    ///
    /// # Errors
    /// `NotFound` for unknown or expired IDs, `InvalidTransition` if the
    /// notification was already dismissed.
    pub fn mark_read(&self, id: NotificationId) -> Result<Notification, NotificationError> {
        self.update_status(id, Status::Read)
    }

    /// Dismiss a notification. Allowed from both `Unread` and `Read`.
    ///
    /// # Errors
    /// `NotFound` for unknown or expired IDs.
    pub fn dismiss(&self, id: NotificationId) -> Result<Notification, NotificationError> {
        self.update_status(id, Status::Dismissed)
    }

    fn update_status(
        &self,
        id: NotificationId,
        status: Status,
    ) -> Result<Notification, NotificationError> {
        let updated = self.store.update_status(id, status)?;
        op_log!(self, id = %id, status = %status, "notification status updated");
        Ok(updated)
    }

    /// Remove a notification. Deleting an unknown ID is not an error.
    ///
    /// Returns whether a notification was removed.
    pub fn delete(&self, id: NotificationId) -> bool {
        let removed = self.store.delete(id);
        if removed {
            self.metrics.record_deleted();
            op_log!(self, id = %id, "notification deleted");
        }
        removed
    }

    /// Mark every live unread notification as read.
    ///
    /// Returns the number of notifications changed.
    pub fn mark_all_read(&self) -> usize {
        let changed = self.store.mark_all_read();
        op_log!(self, changed, "marked all notifications read");
        changed
    }

    /// Number of live unread notifications.
    pub fn unread_count(&self) -> usize {
        self.store.unread_count()
    }

    /// Number of stored notifications, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Receive every notification created from now on.
    ///
    /// A receiver that falls more than `subscriber_buffer` notifications
    /// behind observes `RecvError::Lagged` and skips ahead; producers never block.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    /// Run a cleanup pass now.
    ///
    /// Returns the number of expired notifications removed; 0 if a
    /// background pass was already in progress.
    pub fn purge_expired(&self) -> usize {
        self.scheduler.run_once().map_or(0, |report| report.purged)
    }

    /// Whether the background cleanup task is running.
    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop background cleanup and wait for the task to finish.
    ///
    /// The service stays usable afterwards; only the periodic purge stops.
    /// Calling this more than once is a no-op.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the cleanup task panicked or was cancelled.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let handle = self
            .cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handle {
            Some(handle) => {
                let result = handle.shutdown().await;
                info!("notification service shut down");
                result
            }
            None => Ok(()),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Components currently holding a rate-limit window.
    pub fn tracked_components(&self) -> usize {
        self.limiter.tracked_components()
    }
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("config", &self.config)
            .field("stored", &self.store.len())
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}
