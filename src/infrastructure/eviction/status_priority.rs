//! Status- and priority-aware eviction adapter.

use crate::application::ports::{EvictionCandidate, EvictionPolicy};
use crate::domain::notification::{NotificationId, Priority, Status};

/// Default eviction policy.
///
/// Picks the candidate with the smallest key
/// `(still live, unread, critical, insertion sequence)`:
/// 1. records that already expired go first,
/// 2. then records a consumer has read or dismissed,
/// 3. within the same status, non-critical records go before critical ones,
/// 4. remaining ties go to the oldest insertion.
///
/// An unread critical alert is therefore only displaced when every stored
/// record is an unread critical alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusPriorityEviction;

impl StatusPriorityEviction {
    pub fn new() -> Self {
        Self
    }

    fn rank(candidate: &EvictionCandidate<'_>) -> (bool, bool, bool, u64) {
        let n = candidate.notification;
        (
            !candidate.expired,
            n.status() == Status::Unread,
            n.priority() == Priority::Critical,
            candidate.sequence,
        )
    }
}

impl EvictionPolicy for StatusPriorityEviction {
    fn select_victim(&self, candidates: &[EvictionCandidate<'_>]) -> Option<NotificationId> {
        candidates
            .iter()
            .min_by_key(|candidate| Self::rank(candidate))
            .map(|candidate| candidate.notification.id())
    }
}
