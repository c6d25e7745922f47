//! Last observed reading per record, kept for diffing.
//!
//! The cache is process-local and never persisted. It is internally locked:
//! [`SnapshotCache::observe`] holds the entry lock for one record across the
//! whole read-compute-write step, so two deliveries for the same record are
//! applied one after the other against each other's result.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::LocationRecord;
use crate::RecordId;

/// Immutable capture of a record's `latest` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub latest: i64,
}

impl Snapshot {
    pub fn of(record: &LocationRecord) -> Self {
        Self {
            latest: record.latest(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: DashMap<RecordId, Snapshot>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        record_id: &RecordId,
    ) -> Option<Snapshot> {
        self.entries.get(record_id).map(|entry| *entry.value())
    }

    /// Unconditional overwrite.
    pub fn put(
        &self,
        record_id: RecordId,
        snapshot: Snapshot,
    ) {
        self.entries.insert(record_id, snapshot);
    }

    /// Run `f` against the current snapshot while holding the record's entry
    /// lock. When `f` returns `Some(next)` the entry is overwritten with it
    /// before the lock is released; `None` leaves the entry as it was.
    ///
    /// `f` must not call back into this cache.
    pub fn observe<T, F>(
        &self,
        record_id: &RecordId,
        f: F,
    ) -> T
    where
        F: FnOnce(Option<Snapshot>) -> (T, Option<Snapshot>),
    {
        match self.entries.entry(record_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let (out, next) = f(Some(*occupied.get()));
                if let Some(next) = next {
                    occupied.insert(next);
                }
                out
            }
            Entry::Vacant(vacant) => {
                let (out, next) = f(None);
                if let Some(next) = next {
                    vacant.insert(next);
                }
                out
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
