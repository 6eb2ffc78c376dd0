//! The notification record and its closed enumerations.
//!
//! A [`Notification`] is immutable once created except for its [`Status`],
//! which only moves forward (`Unread → Read → Dismissed`). Records are only
//! built through [`NotificationRequest::build`], which validates the input.

use crate::domain::error::NotificationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Caller-defined metadata passed through unchanged.
///
/// Values are JSON values (null, bool, number, string, array, object), so a
/// boundary can serialize them without further interpretation.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Opaque unique identifier of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NotificationId {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| NotificationError::invalid_input(format!("malformed id '{}': {}", s, e)))
    }
}

/// Kind of event a notification represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// A species detection alert
    Detection,
    /// Lifecycle or housekeeping message from the system itself
    System,
    /// A failure in some subsystem
    Error,
    /// A degraded but working condition
    Warning,
    /// Purely informational
    Info,
}

impl NotificationType {
    /// All variants, in declaration order.
    pub const ALL: [NotificationType; 5] = [
        NotificationType::Detection,
        NotificationType::System,
        NotificationType::Error,
        NotificationType::Warning,
        NotificationType::Info,
    ];

    /// Priority used when the producer does not choose one.
    pub fn default_priority(&self) -> Priority {
        match self {
            NotificationType::Detection | NotificationType::Error => Priority::High,
            NotificationType::Warning | NotificationType::System => Priority::Normal,
            NotificationType::Info => Priority::Low,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Detection => "detection",
            NotificationType::System => "system",
            NotificationType::Error => "error",
            NotificationType::Warning => "warning",
            NotificationType::Info => "info",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                NotificationError::invalid_input(format!("unknown notification type '{}'", s))
            })
    }
}

/// Urgency of a notification, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[serde(alias = "medium")]
    Normal,
    High,
    Critical,
}

impl Priority {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" | "medium" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(NotificationError::invalid_input(format!(
                "unknown priority '{}'",
                s
            ))),
        }
    }
}

/// Consumer-driven state of a notification.
///
/// The declaration order is the lifecycle order; transitions may only move
/// to an equal or later variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unread,
    Read,
    Dismissed,
}

impl Status {
    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// Re-applying the current status is allowed and is a no-op.
    pub fn can_transition_to(&self, next: Status) -> bool {
        next >= *self
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unread => "unread",
            Status::Read => "read",
            Status::Dismissed => "dismissed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unread" => Ok(Status::Unread),
            "read" => Ok(Status::Read),
            "dismissed" => Ok(Status::Dismissed),
            _ => Err(NotificationError::invalid_input(format!(
                "unknown status '{}'",
                s
            ))),
        }
    }
}

/// When a new notification should expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    /// `timestamp + ServiceConfig::default_expiry`
    #[default]
    Default,
    /// An explicit instant, which must lie after the creation timestamp
    At(DateTime<Utc>),
    /// Keep until evicted or deleted
    Never,
}

/// One event record.
///
/// Deserialization applies the same checks as [`NotificationRequest::build`],
/// so a record read from the wire cannot carry a blank component or an expiry
/// at or before its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NotificationRecord")]
pub struct Notification {
    id: NotificationId,
    #[serde(rename = "type")]
    notification_type: NotificationType,
    priority: Priority,
    component: String,
    title: String,
    message: String,
    status: Status,
    #[serde(default)]
    metadata: Metadata,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Unchecked wire form of a [`Notification`].
#[derive(Deserialize)]
struct NotificationRecord {
    id: NotificationId,
    #[serde(rename = "type")]
    notification_type: NotificationType,
    priority: Priority,
    component: String,
    title: String,
    message: String,
    status: Status,
    #[serde(default)]
    metadata: Metadata,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRecord> for Notification {
    type Error = NotificationError;

    fn try_from(record: NotificationRecord) -> Result<Self, Self::Error> {
        let component = record.component.trim();
        if component.is_empty() {
            return Err(NotificationError::invalid_input("component must not be empty"));
        }
        check_expiry(record.timestamp, record.expires_at)?;

        Ok(Notification {
            id: record.id,
            notification_type: record.notification_type,
            priority: record.priority,
            component: component.to_string(),
            title: record.title,
            message: record.message,
            status: record.status,
            metadata: record.metadata,
            timestamp: record.timestamp,
            expires_at: record.expires_at,
        })
    }
}

fn check_expiry(
    timestamp: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), NotificationError> {
    match expires_at {
        Some(at) if at <= timestamp => Err(NotificationError::invalid_input(format!(
            "expiry {} is not after creation time {}",
            at, timestamp
        ))),
        _ => Ok(()),
    }
}

impl Notification {
    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the record is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether a consumer has seen (read or dismissed) this notification.
    pub fn is_read(&self) -> bool {
        self.status != Status::Unread
    }

    /// Apply a status change, enforcing monotonic transitions.
    pub(crate) fn transition_to(&mut self, next: Status) -> Result<(), NotificationError> {
        if !self.status.can_transition_to(next) {
            return Err(NotificationError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Input for creating a notification.
///
/// # Example
/// ```
/// use notification_hub::{NotificationRequest, NotificationType, Priority};
///
/// let request = NotificationRequest::new(
///     NotificationType::Warning,
///     "audio",
///     "Input clipping",
///     "Microphone level above threshold",
/// )
/// .with_priority(Priority::High)
/// .with_metadata_entry("channel", 1);
///
/// assert_eq!(request.priority(), Priority::High);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    notification_type: NotificationType,
    priority: Option<Priority>,
    component: String,
    title: String,
    message: String,
    metadata: Metadata,
    expiry: Expiry,
}

impl NotificationRequest {
    /// Start a request; priority defaults to the type's default priority.
    pub fn new(
        notification_type: NotificationType,
        component: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_type,
            priority: None,
            component: component.into(),
            title: title.into(),
            message: message.into(),
            metadata: Metadata::new(),
            expiry: Expiry::Default,
        }
    }

    /// A species detection alert from the `detection` component.
    pub fn detection(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationType::Detection, "detection", title, message)
    }

    /// An error report from `component`.
    pub fn error(
        component: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(NotificationType::Error, component, title, message)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replace the metadata map.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add one metadata entry.
    pub fn with_metadata_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Expire at an explicit instant instead of the default.
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expiry = Expiry::At(at);
        self
    }

    pub fn never_expires(mut self) -> Self {
        self.expiry = Expiry::Never;
        self
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    /// Effective priority.
    pub fn priority(&self) -> Priority {
        self.priority
            .unwrap_or_else(|| self.notification_type.default_priority())
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Component with surrounding whitespace removed, as used for rate limiting.
    pub(crate) fn component_key(&self) -> &str {
        self.component.trim()
    }

    /// Check fields that do not depend on the creation instant.
    pub fn validate(&self) -> Result<(), NotificationError> {
        if self.component_key().is_empty() {
            return Err(NotificationError::invalid_input("component must not be empty"));
        }
        Ok(())
    }

    /// Validate and turn the request into a fresh `Unread` record.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the component is blank or an explicit expiry
    /// does not lie strictly after `timestamp`.
    pub fn build(
        self,
        timestamp: DateTime<Utc>,
        default_expiry: Duration,
    ) -> Result<Notification, NotificationError> {
        self.validate()?;

        let expires_at = match self.expiry {
            Expiry::Default => {
                let expires_at = chrono::Duration::from_std(default_expiry)
                    .ok()
                    .and_then(|ttl| timestamp.checked_add_signed(ttl))
                    .ok_or_else(|| {
                        NotificationError::invalid_input(format!(
                            "default expiry {:?} from {} is out of range",
                            default_expiry, timestamp
                        ))
                    })?;
                Some(expires_at)
            }
            Expiry::At(at) => Some(at),
            Expiry::Never => None,
        };

        check_expiry(timestamp, expires_at)?;

        let priority = self.priority();
        Ok(Notification {
            id: NotificationId::new(),
            notification_type: self.notification_type,
            priority,
            component: self.component.trim().to_string(),
            title: self.title,
            message: self.message,
            status: Status::Unread,
            metadata: self.metadata,
            timestamp,
            expires_at,
        })
    }
}
