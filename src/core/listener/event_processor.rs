use std::sync::Arc;

use tracing::trace;
use tracing::warn;

use crate::metrics::EVENTS_DROPPED;
use crate::metrics::EVENTS_PROCESSED;
use crate::AggregateRef;
use crate::AggregationError;
use crate::Category;
use crate::ChangeEvent;
use crate::DeltaComputer;
use crate::FieldDeltas;
use crate::FieldPath;
use crate::MissingBaselinePolicy;
use crate::PendingChangeSet;
use crate::Result;
use crate::Snapshot;
use crate::SnapshotCache;

/// Per-event pipeline shared by every subscription task.
pub(crate) struct EventProcessor {
    pub(crate) cache: Arc<SnapshotCache>,
    pub(crate) change_set: Arc<PendingChangeSet>,
    pub(crate) missing_baseline: MissingBaselinePolicy,
    pub(crate) track_parts: bool,
}

impl EventProcessor {
    /// Process one event and record the outcome. Failures cost only this
    /// event.
    pub(crate) fn handle(
        &self,
        event: ChangeEvent,
    ) -> Result<i64> {
        match self.process(&event) {
            Ok(delta) => {
                EVENTS_PROCESSED.with_label_values(&[event.kind.as_str()]).inc();
                trace!(record_id = %event.record_id, delta, "{} processed", event.kind);
                Ok(delta)
            }
            Err(e) => {
                EVENTS_DROPPED.with_label_values(&[e.reason()]).inc();
                warn!(record_id = %event.record_id, parent = %event.parent_path, "dropping {} event: {}", event.kind, e);
                Err(e)
            }
        }
    }

    fn process(
        &self,
        event: &ChangeEvent,
    ) -> Result<i64> {
        let target = AggregateRef::from_parent_path(&event.parent_path)?;

        event.record_id.decode()?;
        if event.record_id != event.record.record_id() {
            return Err(AggregationError::InvalidRecord(format!(
                "id {} does not match the {} reading at {}",
                event.record_id,
                event.record.category(),
                event.record.coordinates().location_key()
            ))
            .into());
        }

        // Entry lock is held from compute through snapshot update; the change
        // set lock is only ever taken inside it.
        self.cache.observe(&event.record_id, |cached| {
            let queued = DeltaComputer::compute(event.kind, &event.record, cached.as_ref(), self.missing_baseline)
                .and_then(|delta| {
                    if delta != 0 {
                        self.change_set
                            .add(target, self.field_deltas(event, event.record.category(), delta))?;
                    }
                    Ok(delta)
                });
            match queued {
                Ok(delta) => (Ok(delta), Some(Snapshot::of(&event.record))),
                Err(e) => (Err(e), None),
            }
        })
    }

    fn field_deltas(
        &self,
        event: &ChangeEvent,
        category: Category,
        delta: i64,
    ) -> FieldDeltas {
        let mut fields = FieldDeltas::new();
        fields.insert(FieldPath::Total(category), delta);
        if self.track_parts {
            fields.insert(FieldPath::Part(event.record_id.clone()), delta);
        }
        fields
    }
}
