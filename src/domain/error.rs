//! Error taxonomy for notification operations.
//!
//! Every failure is returned as an explicit result. None of these errors is
//! fatal to the process: the worst case is a rejected or dropped notification.

use crate::domain::notification::{NotificationId, Status};
use std::time::Duration;

/// Coarse classification of a [`NotificationError`].
///
/// Boundary layers map these onto their own status codes (for example HTTP 400,
/// 429, 404, 409 and 503).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed notification fields; the caller's bug, never retried internally.
    InvalidInput,
    /// Admission throttled for the producing component.
    RateLimited,
    /// The referenced notification does not exist (or has expired).
    NotFound,
    /// Attempted status regression.
    InvalidTransition,
    /// No service instance has been initialized.
    ServiceUnavailable,
    /// A process-wide service instance is already installed.
    AlreadyInitialized,
}

/// Error returned by notification operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// A field failed validation.
    InvalidInput(String),
    /// The component exceeded its admission budget for the current window.
    RateLimited {
        /// Component whose window is full
        component: String,
        /// Time until the oldest admission leaves the window
        retry_after: Duration,
    },
    /// No live notification with this ID.
    NotFound(NotificationId),
    /// Status change would move backwards.
    InvalidTransition {
        /// Current status of the record
        from: Status,
        /// Requested status
        to: Status,
    },
    /// The process-wide service has not been initialized.
    ServiceUnavailable,
    /// The process-wide service has already been initialized.
    AlreadyInitialized,
}

impl NotificationError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotificationError::InvalidInput(_) => ErrorKind::InvalidInput,
            NotificationError::RateLimited { .. } => ErrorKind::RateLimited,
            NotificationError::NotFound(_) => ErrorKind::NotFound,
            NotificationError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            NotificationError::ServiceUnavailable => ErrorKind::ServiceUnavailable,
            NotificationError::AlreadyInitialized => ErrorKind::AlreadyInitialized,
        }
    }

    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        NotificationError::InvalidInput(reason.into())
    }

    /// Whether the caller should drop the event rather than treat it as a fault.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, NotificationError::RateLimited { .. })
    }
}

impl std::fmt::Display for NotificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationError::InvalidInput(reason) => {
                write!(f, "invalid notification input: {}", reason)
            }
            NotificationError::RateLimited {
                component,
                retry_after,
            } => write!(
                f,
                "rate limit exceeded for component '{}' (retry after {:?})",
                component, retry_after
            ),
            NotificationError::NotFound(id) => write!(f, "notification {} not found", id),
            NotificationError::InvalidTransition { from, to } => {
                write!(f, "invalid status transition from {} to {}", from, to)
            }
            NotificationError::ServiceUnavailable => {
                write!(f, "notification service not available")
            }
            NotificationError::AlreadyInitialized => {
                write!(f, "notification service already initialized")
            }
        }
    }
}

impl std::error::Error for NotificationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let id = NotificationId::new();
        assert_eq!(
            NotificationError::invalid_input("x").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(NotificationError::NotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(
            NotificationError::InvalidTransition {
                from: Status::Dismissed,
                to: Status::Read,
            }
            .kind(),
            ErrorKind::InvalidTransition
        );
        assert_eq!(
            NotificationError::ServiceUnavailable.kind(),
            ErrorKind::ServiceUnavailable
        );
    }

    #[test]
    fn test_display() {
        let err = NotificationError::RateLimited {
            component: "detection".to_string(),
            retry_after: Duration::from_secs(5),
        };
        assert!(err.is_rate_limited());
        assert_eq!(
            err.to_string(),
            "rate limit exceeded for component 'detection' (retry after 5s)"
        );

        let err = NotificationError::InvalidTransition {
            from: Status::Dismissed,
            to: Status::Unread,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition from dismissed to unread"
        );
        assert_eq!(
            NotificationError::ServiceUnavailable.to_string(),
            "notification service not available"
        );
    }
}
