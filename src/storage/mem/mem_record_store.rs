use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::ChangeEvent;
use crate::records_collection_path;
use crate::EventKind;
use crate::LocationRecord;
use crate::MemChangeStream;
use crate::RecordId;
use crate::RecordStore;
use crate::Result;

/// In-memory records collections. Every write is published to the attached
/// [`MemChangeStream`] as a create or update event, in the order the writes
/// were stored.
#[derive(Debug)]
pub struct MemRecordStore {
    // (collection path, record id) -> record
    records: Mutex<HashMap<(String, RecordId), LocationRecord>>,
    stream: Arc<MemChangeStream>,
    // Held from store through publish
    publish_order: tokio::sync::Mutex<()>,
}

impl MemRecordStore {
    pub fn new(stream: Arc<MemChangeStream>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            stream,
            publish_order: tokio::sync::Mutex::new(()),
        }
    }

    /// Store one record and publish the resulting event.
    pub async fn put(
        &self,
        record: LocationRecord,
    ) -> Result<ChangeEvent> {
        let _ordered = self.publish_order.lock().await;
        let event = self.store(record);
        self.stream.publish(event.clone()).await;
        Ok(event)
    }

    pub fn get(
        &self,
        collection_path: &str,
        record_id: &RecordId,
    ) -> Option<LocationRecord> {
        self.records
            .lock()
            .get(&(collection_path.to_string(), record_id.clone()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(
        &self,
        record: LocationRecord,
    ) -> ChangeEvent {
        Self::store_locked(&mut self.records.lock(), record)
    }

    fn store_locked(
        records: &mut HashMap<(String, RecordId), LocationRecord>,
        record: LocationRecord,
    ) -> ChangeEvent {
        let collection = records_collection_path(&record);
        let key = (collection.clone(), record.record_id());
        let kind = if records.contains_key(&key) {
            EventKind::Update
        } else {
            EventKind::Create
        };
        records.insert(key, record.clone());
        ChangeEvent::new(kind, collection, record)
    }
}

#[async_trait]
impl RecordStore for MemRecordStore {
    async fn put_batch(
        &self,
        records: Vec<LocationRecord>,
    ) -> Result<()> {
        let _ordered = self.publish_order.lock().await;
        let events: Vec<ChangeEvent> = {
            let mut stored = self.records.lock();
            records
                .into_iter()
                .map(|record| Self::store_locked(&mut stored, record))
                .collect()
        };
        debug!("stored batch of {} records", events.len());
        for event in events {
            self.stream.publish(event).await;
        }
        Ok(())
    }
}
