use std::collections::BTreeMap;
use std::fmt;

use crate::constants::COUNTRIES_COLLECTION;
use crate::constants::PARTS_FIELD;
use crate::AggregationError;
use crate::Category;
use crate::KeyCodec;
use crate::RecordId;
use crate::Result;

/// Path of the entity that owns running totals, e.g. `countries/Thailand`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AggregateRef(String);

impl AggregateRef {
    pub fn country(name: &str) -> Self {
        Self(format!("{COUNTRIES_COLLECTION}/{name}"))
    }

    /// Resolve the owner of a records collection.
    ///
    /// `parent_path` is the collection the record lives in, so the owner is
    /// the document one level up: `countries/Thailand/records` resolves to
    /// `countries/Thailand`. Collection paths always have an odd number of
    /// segments; anything else, or a top-level collection, has no owner.
    pub fn from_parent_path(parent_path: &str) -> Result<Self> {
        let segments: Vec<&str> = parent_path.split('/').collect();
        if segments.len() < 3 || segments.len() % 2 == 0 || segments.iter().any(|s| s.is_empty()) {
            return Err(AggregationError::UnresolvableTarget {
                path: parent_path.to_string(),
            }
            .into());
        }
        Ok(Self(segments[..segments.len() - 1].join("/")))
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregateRef {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A numeric field on an aggregate document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldPath {
    /// Running total for one category
    Total(Category),
    /// One record's contribution inside the `parts` map
    Part(RecordId),
}

impl fmt::Display for FieldPath {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            FieldPath::Total(category) => write!(f, "{category}"),
            FieldPath::Part(id) => write!(f, "{PARTS_FIELD}.{id}"),
        }
    }
}

pub type FieldDeltas = BTreeMap<FieldPath, i64>;

/// Increments queued for one aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub target: AggregateRef,
    pub fields: FieldDeltas,
    /// Missing fields are created and existing ones incremented; other
    /// fields on the target are left untouched.
    pub merge: bool,
}

impl PendingWrite {
    pub fn increment(
        target: AggregateRef,
        fields: FieldDeltas,
    ) -> Self {
        Self {
            target,
            fields,
            merge: true,
        }
    }
}

/// One all-or-nothing multi-target write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<PendingWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        write: PendingWrite,
    ) {
        self.writes.push(write);
    }

    pub fn writes(&self) -> &[PendingWrite] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

impl FromIterator<PendingWrite> for WriteBatch {
    fn from_iter<I: IntoIterator<Item = PendingWrite>>(iter: I) -> Self {
        Self {
            writes: iter.into_iter().collect(),
        }
    }
}

/// Read-side view of a stored aggregate document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateView {
    pub totals: BTreeMap<Category, i64>,
    pub parts: BTreeMap<String, i64>,
}

impl AggregateView {
    pub fn total(
        &self,
        category: Category,
    ) -> i64 {
        self.totals.get(&category).copied().unwrap_or(0)
    }

    pub fn confirmed(&self) -> i64 {
        KeyCodec::count(&self.parts, Category::Confirmed.as_str())
    }

    pub fn deaths(&self) -> i64 {
        KeyCodec::count(&self.parts, Category::Deaths.as_str())
    }

    pub fn recovered(&self) -> i64 {
        KeyCodec::count(&self.parts, Category::Recovered.as_str())
    }
}
