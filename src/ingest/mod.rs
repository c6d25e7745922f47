//! Upstream bulk ingestion into the records collections.
mod json_source;
mod location_source;

pub use json_source::*;
pub use location_source::*;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::Category;
use crate::LocationRecord;
use crate::RecordStore;
use crate::Result;


/// Fetch every location for `category` and write the valid ones to the
/// records collections as one batch.
///
/// Invalid locations are skipped and logged. Returns the number of records
/// written.
pub async fn ingest_category<L, R>(
    source: &L,
    records: &R,
    category: Category,
) -> Result<usize>
where
    L: LocationSource + ?Sized,
    R: RecordStore + ?Sized,
{
    let raw = source.fetch_category(category).await?;
    let fetched = raw.len();

    let mut batch = Vec::with_capacity(fetched);
    for location in raw {
        let label = format!("{}/{}", location.country, location.coordinates.location_key());
        match LocationRecord::new(location, category) {
            Ok(record) => batch.push(record),
            Err(e) => warn!("skipping {} location {}: {}", category, label, e),
        }
    }

    let written = batch.len();
    if written == 0 {
        debug!("no valid {} locations among {} fetched", category, fetched);
        return Ok(0);
    }

    records.put_batch(batch).await?;
    info!("ingested {} of {} {} locations", written, fetched, category);
    Ok(written)
}
