//! # notification-hub
//!
//! Bounded, rate-limited, in-process notification service.
//!
//! Components of an application (detectors, device monitors, background jobs)
//! raise notifications; UIs and API handlers list them, mark them read or
//! dismiss them. The service keeps them in memory with:
//!
//! - **Per-component rate limiting**: a sliding window of N admissions per
//!   component, so one noisy producer cannot drown out the others
//! - **Bounded retention**: at most `max_notifications` records; when full,
//!   expired records go first, then read ones, and `Critical` records last
//! - **Expiry**: records expire after a default lifetime and are purged by a
//!   background task
//! - **Forward-only status**: `Unread` → `Read` → `Dismissed`
//!
//! ## Quick Start
//!
//! ```rust
//! use notification_hub::{
//!     NotificationFilter, NotificationRequest, NotificationService, Priority, ServiceConfig, Status,
//! };
//! use std::time::Duration;
//!
//! let config = ServiceConfig::default()
//!     .with_max_notifications(100)
//!     .with_rate_limit(10, Duration::from_secs(60));
//! let service = NotificationService::new(config).unwrap();
//!
//! let alert = service
//!     .create(
//!         NotificationRequest::detection("New species detected", "Eurasian Wren at 06:12")
//!             .with_metadata_entry("species", "Eurasian Wren")
//!             .with_metadata_entry("confidence", 0.93),
//!     )
//!     .unwrap();
//! assert_eq!(alert.priority(), Priority::High);
//!
//! let unread = service.list(&NotificationFilter::new().with_status(Status::Unread));
//! assert_eq!(unread.len(), 1);
//! ```
//!
//! ## Rate Limiting
//!
//! Admissions are counted per component. Once a component has used its
//! budget for the window, further `create` calls fail with
//! [`NotificationError::RateLimited`] and the notification is dropped:
//!
//! ```rust
//! # use notification_hub::{NotificationRequest, NotificationService, ServiceConfig, ErrorKind};
//! # use std::time::Duration;
//! let service = NotificationService::new(
//!     ServiceConfig::default().with_rate_limit(2, Duration::from_secs(60)),
//! )
//! .unwrap();
//!
//! for _ in 0..2 {
//!     service.create(NotificationRequest::error("db", "Timeout", "query timed out")).unwrap();
//! }
//! let err = service
//!     .create(NotificationRequest::error("db", "Timeout", "query timed out"))
//!     .unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::RateLimited);
//!
//! // Other components have their own window
//! assert!(service.create(NotificationRequest::error("audio", "Clipping", "input too hot")).is_ok());
//! ```
//!
//! ## Background Cleanup
//!
//! When the service is built inside a Tokio runtime it spawns a task that
//! purges expired records every `cleanup_interval`. Stop it with
//! [`NotificationService::shutdown`]; dropping the service stops it as well.
//! Outside a runtime no task is started and [`NotificationService::purge_expired`]
//! can be called manually.
//!
//! ## Process-wide Instance
//!
//! [`initialize`] installs one service for the whole process; [`get_service`],
//! [`is_initialized`] and [`require_service`] read it back. Code that runs
//! before initialization should report the service as unavailable
//! ([`ErrorKind::ServiceUnavailable`]).
//!
//! ## Observability
//!
//! ```rust
//! # use notification_hub::{NotificationService, ServiceConfig};
//! # let service = NotificationService::new(ServiceConfig::default()).unwrap();
//! let snapshot = service.metrics().snapshot();
//! println!("created: {}", snapshot.notifications_created);
//! println!("rate limited: {:.2}%", snapshot.rejection_rate() * 100.0);
//! ```
//!
//! All logging goes through `tracing`; the crate never installs a subscriber.

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    error::{ErrorKind, NotificationError},
    filter::NotificationFilter,
    notification::{
        Expiry, Metadata, Notification, NotificationId, NotificationRequest, NotificationType,
        Priority, Status,
    },
    policy::{PolicyDecision, RateLimitPolicy, TimeWindowPolicy},
};

pub use application::{
    cleanup::{
        CleanupConfig, CleanupConfigError, CleanupHandle, CleanupReport, CleanupScheduler,
        ShutdownError,
    },
    config::{ConfigError, ServiceConfig, MAX_DEFAULT_EXPIRY},
    global::{get_service, initialize, is_initialized, require_service, InitError},
    limiter::{LimitDecision, RateLimiter},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, EvictionCandidate, EvictionPolicy},
    service::{NotificationService, NotificationServiceBuilder},
    store::{NotificationList, NotificationStore},
};

#[cfg(any(test, feature = "test-helpers"))]
pub use application::global::{
    replace_service_for_testing, reset_service_for_testing, set_service_for_testing,
};

pub use infrastructure::{
    clock::SystemClock,
    eviction::{OldestFirstEviction, StatusPriorityEviction},
};
