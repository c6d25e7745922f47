use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::constants::COUNTRIES_COLLECTION;
use crate::constants::RECORDS_COLLECTION;
use crate::LocationRecord;
use crate::Result;

/// The records collections the change listener watches.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Write records as one batch. Each record lands in
    /// `countries/<country>/records` under its record id.
    async fn put_batch(
        &self,
        records: Vec<LocationRecord>,
    ) -> Result<()>;
}

/// Collection a record is routed to, e.g. `countries/Thailand/records`.
pub fn records_collection_path(record: &LocationRecord) -> String {
    format!("{COUNTRIES_COLLECTION}/{}/{RECORDS_COLLECTION}", record.country())
}

