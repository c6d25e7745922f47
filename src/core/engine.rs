use std::sync::Arc;

use tracing::error;
use tracing::info;

use crate::AggregateStore;
use crate::BatchCommitter;
use crate::ChangeListener;
use crate::ChangeStream;
use crate::EngineConfig;
use crate::PendingChangeSet;
use crate::Result;
use crate::SnapshotCache;

/// Change listener and batch committer sharing one snapshot cache and one
/// pending change set.
pub struct AggregationEngine<S, A>
where
    S: ChangeStream,
    A: AggregateStore,
{
    listener: ChangeListener<S>,
    committer: BatchCommitter<A>,
    cache: Arc<SnapshotCache>,
    change_set: Arc<PendingChangeSet>,
}

impl<S, A> AggregationEngine<S, A>
where
    S: ChangeStream,
    A: AggregateStore,
{
    pub fn new(
        config: &EngineConfig,
        stream: Arc<S>,
        store: Arc<A>,
    ) -> Self {
        let cache = Arc::new(SnapshotCache::new());
        let change_set = Arc::new(PendingChangeSet::new());

        let listener = ChangeListener::new(
            stream,
            cache.clone(),
            change_set.clone(),
            &config.listener,
            config.retry.subscription,
        );
        let committer = BatchCommitter::new(store, change_set.clone(), &config.commit);

        Self {
            listener,
            committer,
            cache,
            change_set,
        }
    }

    /// Start the committer, then the listener. If the listener cannot start
    /// the committer is stopped again.
    pub async fn start(&self) -> Result<()> {
        self.committer.start().await?;

        if let Err(e) = self.listener.start().await {
            error!("listener failed to start: {}", e);
            self.committer.stop().await?;
            return Err(e);
        }

        info!("aggregation engine started");
        Ok(())
    }

    /// Close the listener, then stop the committer so every delta enqueued
    /// before the close is flushed.
    pub async fn shutdown(&self) -> Result<()> {
        let closed = self.listener.close().await;
        self.committer.stop().await?;
        closed?;

        info!("aggregation engine stopped");
        Ok(())
    }

    pub fn listener(&self) -> &ChangeListener<S> {
        &self.listener
    }

    pub fn committer(&self) -> &BatchCommitter<A> {
        &self.committer
    }

    pub fn snapshot_cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub fn change_set(&self) -> &Arc<PendingChangeSet> {
        &self.change_set
    }
}
