//! Insertion-order eviction adapter.

use crate::application::ports::{EvictionCandidate, EvictionPolicy};
use crate::domain::notification::NotificationId;

/// Evicts the oldest record regardless of status or priority.
///
/// Useful for consumers that treat the store as a plain ring buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestFirstEviction;

impl OldestFirstEviction {
    pub fn new() -> Self {
        Self
    }
}

impl EvictionPolicy for OldestFirstEviction {
    fn select_victim(&self, candidates: &[EvictionCandidate<'_>]) -> Option<NotificationId> {
        candidates
            .iter()
            .min_by_key(|candidate| candidate.sequence)
            .map(|candidate| candidate.notification.id())
    }
}
