use tracing::debug;
use tracing::warn;

use crate::AggregationError;
use crate::EventKind;
use crate::LocationRecord;
use crate::MissingBaselinePolicy;
use crate::Result;
use crate::Snapshot;

/// Turns a newly observed reading into the increment to apply.
pub struct DeltaComputer;

impl DeltaComputer {
    /// A create has an implicit zero baseline.
    pub fn compute_create_delta(reading: &LocationRecord) -> i64 {
        reading.latest()
    }

    pub fn compute_update_delta(
        reading: &LocationRecord,
        cached: &Snapshot,
    ) -> i64 {
        reading.latest() - cached.latest
    }

    /// Delta for `reading` given what was last observed for the same record.
    ///
    /// - A create with a cached baseline is a redelivery and is diffed against
    ///   that baseline.
    /// - An update without a baseline follows `policy`.
    pub fn compute(
        kind: EventKind,
        reading: &LocationRecord,
        cached: Option<&Snapshot>,
        policy: MissingBaselinePolicy,
    ) -> Result<i64> {
        match (kind, cached) {
            (EventKind::Create, None) => Ok(Self::compute_create_delta(reading)),
            (EventKind::Create, Some(cached)) => {
                debug!(record_id = %reading.record_id(), cached = cached.latest, "create redelivered, diffing against baseline");
                Ok(Self::compute_update_delta(reading, cached))
            }
            (EventKind::Update, Some(cached)) => Ok(Self::compute_update_delta(reading, cached)),
            (EventKind::Update, None) => match policy {
                MissingBaselinePolicy::Reject => Err(AggregationError::MissingBaseline {
                    record_id: reading.record_id().to_string(),
                }
                .into()),
                MissingBaselinePolicy::ZeroBaseline => {
                    warn!(record_id = %reading.record_id(), "update without baseline, applying full value {}", reading.latest());
                    Ok(Self::compute_create_delta(reading))
                }
            },
        }
    }
}
