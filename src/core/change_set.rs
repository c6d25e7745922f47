use std::collections::HashMap;

use parking_lot::Mutex;
use prometheus::IntGauge;
use tracing::trace;

use crate::metrics::PENDING_TARGETS;
use crate::AggregateRef;
use crate::AggregationError;
use crate::FieldDeltas;
use crate::PendingWrite;
use crate::Result;

/// Thread-safe accumulator of pending increments, keyed by aggregate.
///
/// Producers merge into the live map; the committer swaps it out whole. Both
/// sides hold the lock only for the in-memory merge or swap.
#[derive(Debug)]
pub struct PendingChangeSet {
    entries: Mutex<HashMap<AggregateRef, FieldDeltas>>,
    /// Tracks `entries.len()`; only written while `entries` is locked.
    pending_targets: IntGauge,
}

impl Default for PendingChangeSet {
    fn default() -> Self {
        Self::with_gauge(PENDING_TARGETS.clone())
    }
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gauge(pending_targets: IntGauge) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            pending_targets,
        }
    }

    /// Merge `field_deltas` into the pending entry for `target` by per-field
    /// summation.
    ///
    /// The merge is all or nothing: if any field sum would overflow, nothing
    /// is added and `InvalidRecord` is returned.
    pub fn add(
        &self,
        target: AggregateRef,
        field_deltas: FieldDeltas,
    ) -> Result<()> {
        if field_deltas.is_empty() {
            return Ok(());
        }

        let mut entries = self.entries.lock();
        let mut merged = FieldDeltas::new();
        {
            let pending = entries.get(&target);
            for (field, delta) in &field_deltas {
                let current = pending.and_then(|p| p.get(field)).copied().unwrap_or(0);
                let sum = current.checked_add(*delta).ok_or_else(|| {
                    AggregationError::InvalidRecord(format!(
                        "pending {field} on {target} overflows: {current} + {delta}"
                    ))
                })?;
                merged.insert(field.clone(), sum);
            }
        }

        entries.entry(target).or_default().extend(merged);
        self.pending_targets.set(entries.len() as i64);
        trace!("PendingChangeSet::add, pending targets={}", entries.len());
        Ok(())
    }

    /// Swap the live accumulator for an empty one and return what it held.
    ///
    /// Every add that completed before the swap is in the result; every add
    /// that starts after it lands in the next drain.
    pub fn drain(&self) -> Vec<PendingWrite> {
        let drained = {
            let mut entries = self.entries.lock();
            self.pending_targets.set(0);
            std::mem::take(&mut *entries)
        };

        let mut writes: Vec<PendingWrite> = drained
            .into_iter()
            .map(|(target, fields)| PendingWrite::increment(target, fields))
            .collect();
        writes.sort_by(|a, b| a.target.cmp(&b.target));
        writes
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
