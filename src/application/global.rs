//! Process-wide service instance.
//!
//! The service is installed once, normally at startup, and read from anywhere
//! afterwards. Boundary code that runs before installation (or in a process
//! that never installs one) should check [`is_initialized`] or call
//! [`require_service`] and report the service as unavailable.

use crate::application::config::{ConfigError, ServiceConfig};
use crate::application::service::NotificationService;
use crate::domain::error::NotificationError;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::info;

static SERVICE: OnceLock<RwLock<Option<Arc<NotificationService>>>> = OnceLock::new();

fn slot() -> &'static RwLock<Option<Arc<NotificationService>>> {
    SERVICE.get_or_init(|| RwLock::new(None))
}

/// Error returned by [`initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// The configuration was rejected
    Config(ConfigError),
    /// A service is already installed
    AlreadyInitialized,
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::Config(e) => write!(f, "invalid service configuration: {}", e),
            InitError::AlreadyInitialized => {
                write!(f, "notification service already initialized")
            }
        }
    }
}

impl std::error::Error for InitError {}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        InitError::Config(e)
    }
}

/// Build a service from `config` and install it process-wide.
///
/// Only the first successful call installs a service. The check and the
/// install happen under one lock, so concurrent callers cannot both win.
///
/// # Errors
/// `AlreadyInitialized` if a service is installed, `Config` if `config` is invalid.
pub fn initialize(config: ServiceConfig) -> Result<Arc<NotificationService>, InitError> {
    let mut guard = slot().write().unwrap_or_else(PoisonError::into_inner);
    if guard.is_some() {
        return Err(InitError::AlreadyInitialized);
    }

    let service = Arc::new(NotificationService::new(config)?);
    *guard = Some(service.clone());
    info!("global notification service initialized");
    Ok(service)
}

/// The installed service, if any.
pub fn get_service() -> Option<Arc<NotificationService>> {
    slot()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Whether a service is installed.
pub fn is_initialized() -> bool {
    slot()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// The installed service, or `ServiceUnavailable`.
///
/// # Examples
///
/// ```
/// use notification_hub::{require_service, ErrorKind};
///
/// // Nothing has been installed in this process
/// let err = require_service().unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
/// ```
pub fn require_service() -> Result<Arc<NotificationService>, NotificationError> {
    get_service().ok_or(NotificationError::ServiceUnavailable)
}

/// Install `service` if the slot is empty.
///
/// # Errors
/// Returns `AlreadyInitialized` if a service is installed.
#[cfg(any(test, feature = "test-helpers"))]
pub fn set_service_for_testing(service: Arc<NotificationService>) -> Result<(), NotificationError> {
    let mut guard = slot().write().unwrap_or_else(PoisonError::into_inner);
    if guard.is_some() {
        return Err(NotificationError::AlreadyInitialized);
    }
    *guard = Some(service);
    Ok(())
}

/// Install `service` unconditionally, returning the one it replaced.
#[cfg(any(test, feature = "test-helpers"))]
pub fn replace_service_for_testing(
    service: Arc<NotificationService>,
) -> Option<Arc<NotificationService>> {
    slot()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(service)
}

/// Empty the slot, returning the removed service.
#[cfg(any(test, feature = "test-helpers"))]
pub fn reset_service_for_testing() -> Option<Arc<NotificationService>> {
    slot().write().unwrap_or_else(PoisonError::into_inner).take()
}

#[cfg(test)]
mod tests {
    use super::*;

    // The slot is process-wide, so every assertion on it lives in this one test.
    #[test]
    fn test_global_lifecycle() {
        reset_service_for_testing();
        assert!(!is_initialized());
        assert!(get_service().is_none());
        assert_eq!(
            require_service().unwrap_err(),
            NotificationError::ServiceUnavailable
        );

        let err = initialize(ServiceConfig::default().with_max_notifications(0)).unwrap_err();
        assert_eq!(err, InitError::Config(ConfigError::ZeroMaxNotifications));
        assert!(!is_initialized());

        let first = initialize(ServiceConfig::default()).unwrap();
        assert!(is_initialized());
        assert!(Arc::ptr_eq(&first, &require_service().unwrap()));
        assert_eq!(
            initialize(ServiceConfig::default()).unwrap_err(),
            InitError::AlreadyInitialized
        );

        let fake = Arc::new(NotificationService::new(ServiceConfig::default()).unwrap());
        assert_eq!(
            set_service_for_testing(fake.clone()).unwrap_err(),
            NotificationError::AlreadyInitialized
        );

        let previous = replace_service_for_testing(fake.clone()).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));
        assert!(Arc::ptr_eq(&get_service().unwrap(), &fake));

        assert!(reset_service_for_testing().is_some());
        assert!(!is_initialized());
        set_service_for_testing(fake).unwrap();
        assert!(is_initialized());
        reset_service_for_testing();
    }
}
