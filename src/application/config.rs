//! Service configuration.

use crate::application::cleanup::{CleanupConfig, CleanupConfigError};
use std::time::Duration;

/// Longest accepted `default_expiry`: 100 years.
pub const MAX_DEFAULT_EXPIRY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Error returned when a [`ServiceConfig`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Store capacity must be greater than zero
    ZeroMaxNotifications,
    /// Rate limit window must be greater than zero
    ZeroRateLimitWindow,
    /// Rate limit budget must be greater than zero
    ZeroRateLimitMaxEvents,
    /// Default expiry must be greater than zero
    ZeroDefaultExpiry,
    /// Default expiry must not exceed [`MAX_DEFAULT_EXPIRY`]
    DefaultExpiryTooLong,
    /// Subscriber buffer must be greater than zero
    ZeroSubscriberBuffer,
    /// Cleanup configuration validation failed
    Cleanup(CleanupConfigError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroMaxNotifications => {
                write!(f, "max_notifications must be greater than 0")
            }
            ConfigError::ZeroRateLimitWindow => {
                write!(f, "rate_limit_window must be greater than 0")
            }
            ConfigError::ZeroRateLimitMaxEvents => {
                write!(f, "rate_limit_max_events must be greater than 0")
            }
            ConfigError::ZeroDefaultExpiry => write!(f, "default_expiry must be greater than 0"),
            ConfigError::DefaultExpiryTooLong => write!(
                f,
                "default_expiry must not exceed {} days",
                MAX_DEFAULT_EXPIRY.as_secs() / 86_400
            ),
            ConfigError::ZeroSubscriberBuffer => {
                write!(f, "subscriber_buffer must be greater than 0")
            }
            ConfigError::Cleanup(e) => write!(f, "cleanup configuration error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<CleanupConfigError> for ConfigError {
    fn from(e: CleanupConfigError) -> Self {
        ConfigError::Cleanup(e)
    }
}

/// Tunables for a [`NotificationService`](crate::NotificationService).
///
/// Validated once when the service is built and never changed afterwards.
///
/// # Examples
///
/// ```
/// use notification_hub::ServiceConfig;
/// use std::time::Duration;
///
/// let config = ServiceConfig::default()
///     .with_max_notifications(100)
///     .with_cleanup_interval(Duration::from_secs(30 * 60))
///     .with_rate_limit(10, Duration::from_secs(60));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.rate_limit_max_events, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Store capacity
    pub max_notifications: usize,
    /// Period of the background purge
    pub cleanup_interval: Duration,
    /// Length of each component's sliding window
    pub rate_limit_window: Duration,
    /// Admissions per component per window
    pub rate_limit_max_events: usize,
    /// Log every operation at `debug` instead of `trace`
    pub debug: bool,
    /// Lifetime given to notifications without an explicit expiry
    pub default_expiry: Duration,
    /// Per-subscriber backlog of created notifications
    pub subscriber_buffer: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_notifications: 1000,
            cleanup_interval: Duration::from_secs(5 * 60),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max_events: 100,
            debug: false,
            default_expiry: Duration::from_secs(24 * 60 * 60),
            subscriber_buffer: 100,
        }
    }
}

impl ServiceConfig {
    pub fn with_max_notifications(mut self, max: usize) -> Self {
        self.max_notifications = max;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Allow `max_events` notifications per component every `window`.
    pub fn with_rate_limit(mut self, max_events: usize, window: Duration) -> Self {
        self.rate_limit_max_events = max_events;
        self.rate_limit_window = window;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_default_expiry(mut self, expiry: Duration) -> Self {
        self.default_expiry = expiry;
        self
    }

    pub fn with_subscriber_buffer(mut self, capacity: usize) -> Self {
        self.subscriber_buffer = capacity;
        self
    }

    /// Check every field.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_notifications == 0 {
            return Err(ConfigError::ZeroMaxNotifications);
        }
        if self.rate_limit_window.is_zero() {
            return Err(ConfigError::ZeroRateLimitWindow);
        }
        if self.rate_limit_max_events == 0 {
            return Err(ConfigError::ZeroRateLimitMaxEvents);
        }
        if self.default_expiry.is_zero() {
            return Err(ConfigError::ZeroDefaultExpiry);
        }
        if self.default_expiry > MAX_DEFAULT_EXPIRY {
            return Err(ConfigError::DefaultExpiryTooLong);
        }
        if self.subscriber_buffer == 0 {
            return Err(ConfigError::ZeroSubscriberBuffer);
        }
        self.cleanup_config()?;
        Ok(())
    }

    pub(crate) fn cleanup_config(&self) -> Result<CleanupConfig, CleanupConfigError> {
        CleanupConfig::new(self.cleanup_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_notifications, 1000);
        assert_eq!(config.cleanup_interval, Duration::from_secs(300));
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.rate_limit_max_events, 100);
        assert!(!config.debug);
        assert_eq!(config.default_expiry, Duration::from_secs(86_400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = ServiceConfig::default();

        assert_eq!(
            base.clone().with_max_notifications(0).validate(),
            Err(ConfigError::ZeroMaxNotifications)
        );
        assert_eq!(
            base.clone()
                .with_rate_limit(10, Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroRateLimitWindow)
        );
        assert_eq!(
            base.clone()
                .with_rate_limit(0, Duration::from_secs(1))
                .validate(),
            Err(ConfigError::ZeroRateLimitMaxEvents)
        );
        assert_eq!(
            base.clone().with_default_expiry(Duration::ZERO).validate(),
            Err(ConfigError::ZeroDefaultExpiry)
        );
        assert_eq!(
            base.clone()
                .with_default_expiry(Duration::from_secs(10_000_000_000_000))
                .validate(),
            Err(ConfigError::DefaultExpiryTooLong)
        );
        assert_eq!(
            base.clone().with_default_expiry(Duration::MAX).validate(),
            Err(ConfigError::DefaultExpiryTooLong)
        );
        assert!(base
            .clone()
            .with_default_expiry(MAX_DEFAULT_EXPIRY)
            .validate()
            .is_ok());
        assert_eq!(
            base.clone().with_subscriber_buffer(0).validate(),
            Err(ConfigError::ZeroSubscriberBuffer)
        );
        assert_eq!(
            base.with_cleanup_interval(Duration::ZERO).validate(),
            Err(ConfigError::Cleanup(CleanupConfigError::ZeroCleanupInterval))
        );
    }

    #[test]
    fn test_error_display() {
        let err: ConfigError = CleanupConfigError::ZeroCleanupInterval.into();
        assert_eq!(
            err.to_string(),
            "cleanup configuration error: cleanup interval must be greater than 0"
        );
    }
}
