//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::notification::{Notification, NotificationId};
use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Candidate record for eviction consideration.
///
/// Borrowed from the store while its write lock is held, so policies see a
/// consistent view and never clone records they do not pick.
#[derive(Debug, Clone, Copy)]
pub struct EvictionCandidate<'a> {
    /// The stored record
    pub notification: &'a Notification,
    /// Insertion sequence number; lower is older
    pub sequence: u64,
    /// Whether the record is already past its expiry
    pub expired: bool,
}

/// Port for eviction policy decisions.
///
/// The store calls this when it is full and a new record must be inserted.
/// Infrastructure provides concrete implementations (`StatusPriorityEviction`,
/// `OldestFirstEviction`).
pub trait EvictionPolicy: Send + Sync + Debug {
    /// Select a victim from the given candidates.
    ///
    /// Candidates are passed in insertion order (oldest first).
    ///
    /// # Returns
    /// The ID of the record to evict, or None if the slice is empty
    fn select_victim(&self, candidates: &[EvictionCandidate<'_>]) -> Option<NotificationId>;
}

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current wall-clock instant.
    fn now(&self) -> DateTime<Utc>;
}
