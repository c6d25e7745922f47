use std::fmt;

use crate::LocationRecord;
use crate::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Update,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Update => "update",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record change delivered by a watched query.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub record_id: RecordId,
    /// Path of the collection holding the record, e.g. `countries/Thailand/records`
    pub parent_path: String,
    pub record: LocationRecord,
}

impl ChangeEvent {
    pub fn new(
        kind: EventKind,
        parent_path: impl Into<String>,
        record: LocationRecord,
    ) -> Self {
        Self {
            kind,
            record_id: record.record_id(),
            parent_path: parent_path.into(),
            record,
        }
    }
}
