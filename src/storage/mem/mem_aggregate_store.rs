use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use crate::AggregateRef;
use crate::AggregateStore;
use crate::AggregateView;
use crate::CommitError;
use crate::FieldPath;
use crate::Result;
use crate::WriteBatch;

/// In-memory aggregate documents. A batch is staged and applied under one
/// lock, so readers observe either all of it or none of it.
#[derive(Debug, Default)]
pub struct MemAggregateStore {
    documents: Mutex<HashMap<AggregateRef, AggregateView>>,
    commits: AtomicU64,

    // Fault injection
    failing_commits: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl MemAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `target`; an untouched aggregate reads as empty.
    pub fn view(
        &self,
        target: &AggregateRef,
    ) -> AggregateView {
        self.documents.lock().get(target).cloned().unwrap_or_default()
    }

    pub fn targets(&self) -> Vec<AggregateRef> {
        let mut targets: Vec<AggregateRef> = self.documents.lock().keys().cloned().collect();
        targets.sort();
        targets
    }

    /// Number of batches applied so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Reject the next `n` batches.
    pub fn fail_next_commits(
        &self,
        n: usize,
    ) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Delay every commit by `latency` before applying it.
    pub fn set_latency(
        &self,
        latency: Option<Duration>,
    ) {
        *self.latency.lock() = latency;
    }

    /// Compute the documents touched by `batch` without mutating the store.
    /// Any field sum that would overflow rejects the whole batch.
    fn stage(
        documents: &HashMap<AggregateRef, AggregateView>,
        batch: &WriteBatch,
    ) -> Result<HashMap<AggregateRef, AggregateView>> {
        let mut staged: HashMap<AggregateRef, AggregateView> = HashMap::new();
        for write in batch.writes() {
            let document = staged
                .entry(write.target.clone())
                .or_insert_with(|| documents.get(&write.target).cloned().unwrap_or_default());
            if !write.merge {
                *document = AggregateView::default();
            }
            for (field, delta) in &write.fields {
                let slot = match field {
                    FieldPath::Total(category) => document.totals.entry(*category).or_insert(0),
                    FieldPath::Part(id) => document.parts.entry(id.as_str().to_string()).or_insert(0),
                };
                *slot = slot.checked_add(*delta).ok_or_else(|| CommitError::Rejected {
                    targets: batch.len(),
                    reason: format!("{field} on {} overflows", write.target),
                })?;
            }
            trace!(target = %write.target, fields = write.fields.len(), "staged write");
        }
        Ok(staged)
    }
}

#[async_trait]
impl AggregateStore for MemAggregateStore {
    async fn commit(
        &self,
        batch: WriteBatch,
    ) -> Result<()> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failed = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(CommitError::Rejected {
                targets: batch.len(),
                reason: "injected failure".to_string(),
            }
            .into());
        }

        let mut documents = self.documents.lock();
        let staged = Self::stage(&documents, &batch)?;
        documents.extend(staged);
        self.commits.fetch_add(1, Ordering::SeqCst);
        debug!("committed batch with {} targets", batch.len());
        Ok(())
    }
}
