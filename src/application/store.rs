//! Bounded in-memory notification store.
//!
//! Holds at most `capacity` records, indexed by ID for lookup and by
//! insertion sequence for ordered scans. Every operation takes a single
//! `RwLock`, so mutations are linearizable and readers never observe a
//! partially-applied change.

use crate::application::ports::{Clock, EvictionCandidate, EvictionPolicy};
use crate::domain::error::NotificationError;
use crate::domain::filter::NotificationFilter;
use crate::domain::notification::{Notification, NotificationId, Status};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct Entry {
    sequence: u64,
    notification: Notification,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: AHashMap<NotificationId, Entry>,
    order: BTreeMap<u64, NotificationId>,
    next_sequence: u64,
}

impl StoreInner {
    fn remove(&mut self, id: &NotificationId) -> Option<Notification> {
        let entry = self.records.remove(id)?;
        self.order.remove(&entry.sequence);
        Some(entry.notification)
    }

    fn live_mut(
        &mut self,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<&mut Notification, NotificationError> {
        match self.records.get_mut(&id) {
            Some(entry) if !entry.notification.is_expired(now) => Ok(&mut entry.notification),
            _ => Err(NotificationError::NotFound(id)),
        }
    }
}

/// Thread-safe bounded store with pluggable eviction.
#[derive(Debug)]
pub struct NotificationStore {
    inner: RwLock<StoreInner>,
    capacity: usize,
    eviction: Arc<dyn EvictionPolicy>,
    clock: Arc<dyn Clock>,
}

impl NotificationStore {
    /// Create a store holding at most `capacity` records (minimum 1).
    pub fn new(capacity: usize, eviction: Arc<dyn EvictionPolicy>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            capacity: capacity.max(1),
            eviction,
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a record, evicting one first if the store is full.
    ///
    /// # Returns
    /// The evicted record, if eviction was needed.
    ///
    /// # Errors
    /// `InvalidInput` if a record with the same ID is already stored.
    pub fn insert(
        &self,
        notification: Notification,
    ) -> Result<Option<Notification>, NotificationError> {
        let now = self.clock.now();
        let mut inner = self.write();

        if inner.records.contains_key(&notification.id()) {
            return Err(NotificationError::invalid_input(format!(
                "duplicate notification id {}",
                notification.id()
            )));
        }

        let evicted = if inner.records.len() >= self.capacity {
            let victim = {
                let view: &StoreInner = &inner;
                let candidates: Vec<EvictionCandidate<'_>> = view
                    .order
                    .values()
                    .filter_map(|id| view.records.get(id))
                    .map(|entry| EvictionCandidate {
                        notification: &entry.notification,
                        sequence: entry.sequence,
                        expired: entry.notification.is_expired(now),
                    })
                    .collect();
                self.eviction.select_victim(&candidates)
            };
            // A policy that picks nothing (or an unknown ID) must not break the bound
            let victim = victim
                .filter(|id| inner.records.contains_key(id))
                .or_else(|| inner.order.first_key_value().map(|(_, id)| *id));
            victim.and_then(|id| inner.remove(&id))
        } else {
            None
        };

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.order.insert(sequence, notification.id());
        inner.records.insert(
            notification.id(),
            Entry {
                sequence,
                notification,
            },
        );

        Ok(evicted)
    }

    /// Look up a live record.
    ///
    /// # Errors
    /// `NotFound` if the ID is unknown or the record has expired.
    pub fn get(&self, id: NotificationId) -> Result<Notification, NotificationError> {
        let now = self.clock.now();
        self.read()
            .records
            .get(&id)
            .map(|entry| &entry.notification)
            .filter(|n| !n.is_expired(now))
            .cloned()
            .ok_or(NotificationError::NotFound(id))
    }

    /// Snapshot of records matching `filter`, newest first.
    ///
    /// Records with equal timestamps are ordered by insertion, newest first.
    pub fn list(&self, filter: &NotificationFilter) -> NotificationList {
        let now = self.clock.now();
        let guard = self.read();
        let inner: &StoreInner = &guard;

        let mut matches: Vec<&Entry> = inner
            .order
            .values()
            .rev()
            .filter_map(|id| inner.records.get(id))
            .filter(|entry| filter.matches(&entry.notification, now))
            .collect();
        // Stable: keeps newest-inserted first among equal timestamps
        matches.sort_by(|a, b| b.notification.timestamp().cmp(&a.notification.timestamp()));

        let items: Vec<Notification> = matches
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .map(|entry| entry.notification.clone())
            .collect();

        NotificationList::new(items)
    }

    /// Move a record forward in its lifecycle.
    ///
    /// # Errors
    /// `NotFound` for unknown or expired IDs, `InvalidTransition` if `status`
    /// would move the record backwards.
    pub fn update_status(
        &self,
        id: NotificationId,
        status: Status,
    ) -> Result<Notification, NotificationError> {
        let now = self.clock.now();
        let mut inner = self.write();
        let notification = inner.live_mut(id, now)?;
        notification.transition_to(status)?;
        Ok(notification.clone())
    }

    /// Mark every live unread record as read.
    ///
    /// Returns the number of records changed.
    pub fn mark_all_read(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.write();
        let mut changed = 0;
        for entry in inner.records.values_mut() {
            let n = &mut entry.notification;
            if n.status() == Status::Unread
                && !n.is_expired(now)
                && n.transition_to(Status::Read).is_ok()
            {
                changed += 1;
            }
        }
        changed
    }

    /// Remove every record whose expiry is at or before `now`.
    ///
    /// Returns the number of records removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.write();
        let expired: Vec<NotificationId> = inner
            .records
            .iter()
            .filter(|(_, entry)| entry.notification.is_expired(now))
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            inner.remove(id);
        }
        expired.len()
    }

    /// Remove a record. Idempotent.
    ///
    /// Returns whether a record was removed.
    pub fn delete(&self, id: NotificationId) -> bool {
        self.write().remove(&id).is_some()
    }

    /// Number of stored records, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// Number of live unread records.
    pub fn unread_count(&self) -> usize {
        let now = self.clock.now();
        self.read()
            .records
            .values()
            .filter(|entry| {
                entry.notification.status() == Status::Unread && !entry.notification.is_expired(now)
            })
            .count()
    }

    /// Maximum number of records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Immutable snapshot returned by list queries.
///
/// Cheap to clone. Iterating it again restarts from the first record, and
/// later store mutations never affect it.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationList {
    items: Arc<[Notification]>,
}

impl NotificationList {
    fn new(items: Vec<Notification>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Notification> {
        self.items.get(index)
    }
}

impl<'a> IntoIterator for &'a NotificationList {
    type Item = &'a Notification;
    type IntoIter = std::slice::Iter<'a, Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for NotificationList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::{NotificationRequest, NotificationType, Priority};
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::eviction::StatusPriorityEviction;
    use crate::infrastructure::mocks::MockClock;
    use std::thread;
    use std::time::Duration;

    const HOUR: Duration = Duration::from_secs(3600);

    fn store(capacity: usize) -> NotificationStore {
        NotificationStore::new(
            capacity,
            Arc::new(StatusPriorityEviction::new()),
            Arc::new(SystemClock::new()),
        )
    }

    fn record(title: &str, priority: Priority) -> Notification {
        NotificationRequest::new(NotificationType::Info, "test", title, "message")
            .with_priority(priority)
            .build(Utc::now(), HOUR)
            .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = store(10);
        let n = record("a", Priority::Normal);
        let id = n.id();

        assert_eq!(store.insert(n.clone()).unwrap(), None);
        assert_eq!(store.get(id).unwrap(), n);
        assert_eq!(store.len(), 1);
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = store(10);
        let n = record("a", Priority::Normal);

        store.insert(n.clone()).unwrap();
        let err = store.insert(n).unwrap_err();
        assert!(matches!(err, NotificationError::InvalidInput(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_unknown() {
        let store = store(10);
        let id = NotificationId::new();
        assert_eq!(store.get(id), Err(NotificationError::NotFound(id)));
    }

    #[test]
    fn test_capacity_bound_and_eviction_order() {
        let store = store(3);
        let a = record("a", Priority::Normal);
        let b = record("b", Priority::Normal);
        let c = record("c", Priority::Normal);
        store.insert(a.clone()).unwrap();
        store.insert(b.clone()).unwrap();
        store.insert(c.clone()).unwrap();
        store.update_status(b.id(), Status::Read).unwrap();

        // b is the only read record, so it goes first
        let evicted = store.insert(record("d", Priority::Normal)).unwrap();
        assert_eq!(evicted.map(|n| n.id()), Some(b.id()));

        // Nothing read: oldest goes
        let evicted = store.insert(record("e", Priority::Normal)).unwrap();
        assert_eq!(evicted.map(|n| n.id()), Some(a.id()));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_unread_critical_survives_eviction() {
        let store = store(2);
        let critical = record("fire", Priority::Critical);
        store.insert(critical.clone()).unwrap();

        for i in 0..20 {
            store.insert(record(&format!("noise {}", i), Priority::Low)).unwrap();
            assert!(store.len() <= 2);
        }
        assert!(store.get(critical.id()).is_ok());
    }

    #[test]
    fn test_list_newest_first_and_snapshot() {
        let store = store(10);
        let now = Utc::now();
        let mut ids = Vec::new();
        for i in 0..3 {
            let n = NotificationRequest::new(NotificationType::Info, "test", "t", "m")
                .build(now + chrono::Duration::seconds(i), HOUR)
                .unwrap();
            ids.push(n.id());
            store.insert(n).unwrap();
        }

        let list = store.list(&NotificationFilter::new());
        let listed: Vec<_> = list.iter().map(|n| n.id()).collect();
        assert_eq!(listed, vec![ids[2], ids[1], ids[0]]);

        // Snapshot is unaffected by later mutations and restartable
        store.delete(ids[0]);
        store.update_status(ids[1], Status::Read).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(1).unwrap().status(), Status::Unread);
        assert_eq!(list.iter().count(), 3);
        assert_eq!((&list).into_iter().count(), 3);
    }

    #[test]
    fn test_list_equal_timestamps_use_insertion_order() {
        let store = store(10);
        let now = Utc::now();
        let first = NotificationRequest::new(NotificationType::Info, "test", "1", "m")
            .build(now, HOUR)
            .unwrap();
        let second = NotificationRequest::new(NotificationType::Info, "test", "2", "m")
            .build(now, HOUR)
            .unwrap();
        store.insert(first.clone()).unwrap();
        store.insert(second.clone()).unwrap();

        let list = store.list(&NotificationFilter::new());
        assert_eq!(list.get(0).unwrap().id(), second.id());
        assert_eq!(list.get(1).unwrap().id(), first.id());
    }

    #[test]
    fn test_list_paging_and_filtering() {
        let store = store(20);
        for i in 0..10 {
            let priority = if i % 2 == 0 { Priority::High } else { Priority::Low };
            store.insert(record(&i.to_string(), priority)).unwrap();
        }

        let high = store.list(&NotificationFilter::new().with_min_priority(Priority::High));
        assert_eq!(high.len(), 5);

        let page = store.list(&NotificationFilter::new().with_offset(8).with_limit(5));
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_status_transitions() {
        let store = store(10);
        let n = record("a", Priority::Normal);
        let id = n.id();
        store.insert(n).unwrap();

        assert_eq!(store.update_status(id, Status::Read).unwrap().status(), Status::Read);
        assert_eq!(
            store.update_status(id, Status::Dismissed).unwrap().status(),
            Status::Dismissed
        );
        assert_eq!(
            store.update_status(id, Status::Unread),
            Err(NotificationError::InvalidTransition {
                from: Status::Dismissed,
                to: Status::Unread,
            })
        );
        assert_eq!(store.get(id).unwrap().status(), Status::Dismissed);
    }

    #[test]
    fn test_purge_expired() {
        let clock = MockClock::new(Utc::now());
        let store = NotificationStore::new(
            10,
            Arc::new(StatusPriorityEviction::new()),
            Arc::new(clock.clone()),
        );
        let short = NotificationRequest::new(NotificationType::Info, "test", "short", "m")
            .build(clock.now(), Duration::from_secs(60))
            .unwrap();
        let long = record("long", Priority::Normal);
        store.insert(short.clone()).unwrap();
        store.insert(long.clone()).unwrap();

        clock.advance(Duration::from_secs(60));
        // Expired records are invisible before the purge runs
        assert!(store.get(short.id()).is_err());
        assert_eq!(store.list(&NotificationFilter::new()).len(), 1);
        assert_eq!(store.len(), 2);

        assert_eq!(store.purge_expired(clock.now()), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(short.id()), Err(NotificationError::NotFound(short.id())));
        assert!(store.get(long.id()).is_ok());
    }

    #[test]
    fn test_purge_removes_records_created_with_past_expiry() {
        let store = store(10);
        let past = Utc::now() - chrono::Duration::hours(2);
        let n = NotificationRequest::new(NotificationType::Info, "test", "old", "m")
            .build(past, HOUR)
            .unwrap();
        store.insert(n.clone()).unwrap();

        assert_eq!(store.purge_expired(Utc::now()), 1);
        assert!(store.get(n.id()).is_err());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = store(10);
        let n = record("a", Priority::Normal);
        let id = n.id();
        store.insert(n).unwrap();

        assert!(store.delete(id));
        assert!(!store.delete(id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_mark_all_read() {
        let store = store(10);
        for i in 0..4 {
            store.insert(record(&i.to_string(), Priority::Normal)).unwrap();
        }
        assert_eq!(store.mark_all_read(), 4);
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.mark_all_read(), 0);
    }

    #[test]
    fn test_concurrent_inserts_stay_bounded() {
        let store = Arc::new(store(50));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        let n = record(&format!("{}-{}", t, i), Priority::Normal);
                        store.insert(n).unwrap();
                        if i % 10 == 0 {
                            store.list(&NotificationFilter::new());
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 50);
        let list = store.list(&NotificationFilter::new());
        let mut ids: Vec<_> = list.iter().map(|n| n.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[derive(Debug)]
    struct DecliningEviction;

    impl EvictionPolicy for DecliningEviction {
        fn select_victim(&self, _candidates: &[EvictionCandidate<'_>]) -> Option<NotificationId> {
            None
        }
    }

    #[derive(Debug)]
    struct UnknownVictimEviction;

    impl EvictionPolicy for UnknownVictimEviction {
        fn select_victim(&self, _candidates: &[EvictionCandidate<'_>]) -> Option<NotificationId> {
            Some(NotificationId::new())
        }
    }

    #[test]
    fn test_capacity_holds_when_policy_picks_no_victim() {
        let policies: [Arc<dyn EvictionPolicy>; 2] =
            [Arc::new(DecliningEviction), Arc::new(UnknownVictimEviction)];

        for policy in policies {
            let store = NotificationStore::new(2, policy, Arc::new(SystemClock::new()));
            let inserted: Vec<_> = (0..5)
                .map(|i| record(&i.to_string(), Priority::Normal))
                .collect();

            for (i, n) in inserted.iter().enumerate() {
                let evicted = store.insert(n.clone()).unwrap();
                // Falls back to the oldest stored record
                let expected = i.checked_sub(2).map(|old| inserted[old].id());
                assert_eq!(evicted.map(|e| e.id()), expected);
                assert!(store.len() <= 2);
            }
            assert_eq!(store.len(), 2);
        }
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let store = store(0);
        assert_eq!(store.capacity(), 1);
        store.insert(record("a", Priority::Normal)).unwrap();
        store.insert(record("b", Priority::Normal)).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_mixed_mutations() {
        const CAPACITY: usize = 40;
        let clock = MockClock::new(Utc::now());
        let store = Arc::new(NotificationStore::new(
            CAPACITY,
            Arc::new(StatusPriorityEviction::new()),
            Arc::new(clock.clone()),
        ));

        let mut handles = Vec::new();
        for t in 0..4 {
            let store = Arc::clone(&store);
            let clock = clock.clone();
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let ttl = if i % 2 == 0 {
                        Duration::from_secs(1)
                    } else {
                        HOUR
                    };
                    let n = NotificationRequest::new(
                        NotificationType::Info,
                        format!("producer-{}", t),
                        i.to_string(),
                        "m",
                    )
                    .build(clock.now(), ttl)
                    .unwrap();
                    store.insert(n).unwrap();
                    assert!(store.len() <= CAPACITY);
                }
            }));
        }
        for target in [Status::Read, Status::Dismissed] {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    for n in &store.list(&NotificationFilter::new()) {
                        match store.update_status(n.id(), target) {
                            Ok(updated) => assert!(updated.status() >= target),
                            Err(NotificationError::NotFound(_))
                            | Err(NotificationError::InvalidTransition { .. }) => {}
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                }
            }));
        }
        {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let list = store.list(&NotificationFilter::new());
                    for n in list.iter().step_by(3) {
                        store.delete(n.id());
                    }
                    assert!(store.len() <= CAPACITY);
                }
            }));
        }
        {
            let store = Arc::clone(&store);
            let clock = clock.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    clock.advance(Duration::from_millis(100));
                    store.purge_expired(clock.now());
                    assert!(store.len() <= CAPACITY);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(store.len() <= CAPACITY);
        let all = store.list(&NotificationFilter::new().including_expired());
        assert_eq!(all.len(), store.len());
        let mut ids: Vec<_> = all.iter().map(|n| n.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all.len());
        assert!(store.unread_count() <= store.len());
    }
}
