//! Notification store.
//!
//! Ordered collection of notification records, de-duplicated by id. The
//! unread count is maintained incrementally so badge rendering never scans.
//! Duplicate deliveries are absorbed silently but counted, which is how
//! tests observe the at-least-once transport being collapsed to
//! exactly-once state.
//!
//! An injectable [`AlertSink`] mirrors the host platform's alert facility:
//! permission is requested exactly once per session and denial never blocks
//! in-app delivery.

use std::{collections::HashMap, ops::Sub, time::Duration};

use chalkline_proto::{NotificationId, NotificationRecord, Priority};

use crate::config::NotificationConfig;

/// Outcome of an alert permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPermission {
    /// The host allows forwarding alerts.
    Granted,
    /// The host refused; alerts stay in-app only.
    Denied,
}

/// Host alerting capability.
///
/// Injected so the store has no compile-time dependency on any specific
/// host facility. Implementations wrap whatever the embedding platform
/// offers; [`NoAlerts`] is the null implementation.
pub trait AlertSink: Send {
    /// Ask the host for permission to raise alerts.
    ///
    /// Called at most once per session; the store caches the answer,
    /// including denial.
    fn request_permission(&mut self) -> AlertPermission;

    /// Forward a newly ingested record to the host.
    ///
    /// Only called after a granted permission, and only for records at or
    /// above the configured priority threshold.
    fn deliver(&mut self, record: &NotificationRecord);
}

/// Null alert sink: never asks, never delivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAlerts;

impl AlertSink for NoAlerts {
    fn request_permission(&mut self) -> AlertPermission {
        AlertPermission::Denied
    }

    fn deliver(&mut self, _record: &NotificationRecord) {}
}

/// One stored notification.
#[derive(Debug, Clone)]
struct Entry<I> {
    record: NotificationRecord,
    read: bool,
    ingested_at: I,
}

/// Ordered, de-duplicating notification store.
///
/// # Invariants
///
/// - At most one entry per id; re-ingest updates in place, keeping position
/// - `unread_count()` equals the number of entries with `read == false`
/// - Mutations on unknown ids are no-ops, never errors
pub struct NotificationStore<I> {
    config: NotificationConfig,
    entries: Vec<Entry<I>>,
    index: HashMap<NotificationId, usize>,
    unread: usize,
    duplicates: u64,
    sink: Box<dyn AlertSink>,
    permission: Option<AlertPermission>,
}

impl<I> NotificationStore<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a store with the null alert sink.
    pub fn new(config: NotificationConfig) -> Self {
        Self::with_sink(config, Box::new(NoAlerts))
    }

    /// Create a store forwarding qualifying records to `sink`.
    pub fn with_sink(config: NotificationConfig, sink: Box<dyn AlertSink>) -> Self {
        Self {
            config,
            entries: Vec::new(),
            index: HashMap::new(),
            unread: 0,
            duplicates: 0,
            sink,
            permission: None,
        }
    }

    /// Replace the alert sink and forget any cached permission, so the next
    /// qualifying ingest asks the new sink.
    pub fn set_alert_sink(&mut self, sink: Box<dyn AlertSink>) {
        self.sink = sink;
        self.permission = None;
    }

    /// Insert or update a record by id.
    ///
    /// Returns `true` if the unread count grew: a fresh record, or a
    /// re-delivery of one the user had already read (last ingest wins, so
    /// it becomes unread again). Duplicate deliveries never append a second
    /// entry.
    pub fn ingest(&mut self, record: NotificationRecord, now: I) -> bool {
        if let Some(&position) = self.index.get(&record.id) {
            self.duplicates += 1;
            let entry = &mut self.entries[position];
            let was_read = entry.read;
            entry.record = record;
            entry.read = false;
            entry.ingested_at = now;
            if was_read {
                self.unread += 1;
            }
            return was_read;
        }

        let qualifies = record.priority >= self.config.alert_threshold;
        if qualifies && self.alert_permission() == AlertPermission::Granted {
            self.sink.deliver(&record);
        }

        self.index.insert(record.id.clone(), self.entries.len());
        self.entries.push(Entry { record, read: false, ingested_at: now });
        self.unread += 1;
        true
    }

    /// Mark one record as read. Unknown id is a no-op.
    ///
    /// Returns whether anything changed.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        let Some(&position) = self.index.get(id) else {
            return false;
        };

        let entry = &mut self.entries[position];
        if entry.read {
            return false;
        }

        entry.read = true;
        self.unread -= 1;
        true
    }

    /// Mark every record as read.
    ///
    /// Returns whether anything changed.
    pub fn mark_all_read(&mut self) -> bool {
        if self.unread == 0 {
            return false;
        }

        for entry in &mut self.entries {
            entry.read = true;
        }
        self.unread = 0;
        true
    }

    /// Delete one record. Unknown id is a no-op.
    ///
    /// Returns whether anything changed.
    pub fn delete(&mut self, id: &NotificationId) -> bool {
        let Some(position) = self.index.remove(id) else {
            return false;
        };

        let entry = self.entries.remove(position);
        if !entry.read {
            self.unread -= 1;
        }
        self.reindex_from(position);
        true
    }

    /// Delete every record.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.unread = 0;
    }

    /// Drop low-priority records older than the configured TTL.
    ///
    /// Returns whether anything changed. Records at normal priority and
    /// above are never expired.
    pub fn expire(&mut self, now: I) -> bool {
        let ttl = self.config.low_priority_ttl;
        let stale: Vec<NotificationId> = self
            .entries
            .iter()
            .filter(|e| e.record.priority == Priority::Low && now - e.ingested_at >= ttl)
            .map(|e| e.record.id.clone())
            .collect();

        let mut changed = false;
        for id in stale {
            changed |= self.delete(&id);
        }
        changed
    }

    /// Number of unread records. O(1).
    #[must_use]
    pub fn unread_count(&self) -> usize {
        debug_assert_eq!(self.unread, self.entries.iter().filter(|e| !e.read).count());
        self.unread
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records in insertion order with their read state.
    pub fn iter(&self) -> impl Iterator<Item = (&NotificationRecord, bool)> {
        self.entries.iter().map(|e| (&e.record, e.read))
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &NotificationId) -> Option<&NotificationRecord> {
        self.index.get(id).map(|&position| &self.entries[position].record)
    }

    /// Duplicate deliveries absorbed since construction.
    #[must_use]
    pub fn duplicates_absorbed(&self) -> u64 {
        self.duplicates
    }

    fn alert_permission(&mut self) -> AlertPermission {
        if let Some(permission) = self.permission {
            return permission;
        }
        let permission = self.sink.request_permission();
        self.permission = Some(permission);
        permission
    }

    fn reindex_from(&mut self, position: usize) {
        for (offset, entry) in self.entries[position..].iter().enumerate() {
            self.index.insert(entry.record.id.clone(), position + offset);
        }
    }
}
