//! Periodic drain-and-commit of the pending change set.
//!
//! Commits are at-most-once: a batch that fails or misses its deadline is
//! logged and discarded, never retried.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval_at;
use tokio::time::timeout;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::metrics::BATCHES_COMMITTED;
use crate::metrics::BATCHES_DISCARDED;
use crate::utils::async_task::spawn_task;
use crate::AggregateStore;
use crate::AggregationError;
use crate::CommitConfig;
use crate::CommitError;
use crate::Error;
use crate::PendingChangeSet;
use crate::Result;
use crate::WriteBatch;

/// Result of one drain-and-commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing was pending; the store was not called
    Empty,
    Committed { targets: usize },
    Discarded { targets: usize },
}

struct Running {
    shutdown_tx: watch::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct BatchCommitter<A>
where A: AggregateStore
{
    worker: Arc<CommitWorker<A>>,
    interval: Duration,
    state: Mutex<Option<Running>>,
}

struct CommitWorker<A>
where A: AggregateStore
{
    store: Arc<A>,
    change_set: Arc<PendingChangeSet>,
    commit_timeout: Duration,
}

impl<A> BatchCommitter<A>
where A: AggregateStore
{
    pub fn new(
        store: Arc<A>,
        change_set: Arc<PendingChangeSet>,
        config: &CommitConfig,
    ) -> Self {
        Self {
            worker: Arc::new(CommitWorker {
                store,
                change_set,
                commit_timeout: Duration::from_millis(config.timeout_ms),
            }),
            interval: Duration::from_millis(config.interval_ms),
            state: Mutex::new(None),
        }
    }

    /// Start the ticker. The first cycle runs one interval from now.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(AggregationError::InvalidTransition("committer is already running").into());
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let worker = self.worker.clone();
        let period = self.interval;
        let mut handles = Vec::with_capacity(1);
        spawn_task("committer", move || run(worker, period, shutdown_rx), Some(&mut handles));

        let Some(handle) = handles.pop() else {
            return Err(Error::Fatal("committer task was not spawned".to_string()));
        };
        info!("committer started, interval {:?}", self.interval);
        *state = Some(Running { shutdown_tx, handle });
        Ok(())
    }

    /// Halt the ticker after one final drain-and-commit.
    ///
    /// A cycle already in flight completes first.
    pub async fn stop(&self) -> Result<()> {
        let running = self.state.lock().await.take();
        let Some(running) = running else {
            debug!("committer already stopped");
            return Ok(());
        };

        if running.shutdown_tx.send(()).is_err() {
            warn!("committer task had already exited");
        }
        running.handle.await?;
        info!("committer stopped");
        Ok(())
    }

    /// Run one cycle now, independent of the ticker.
    pub async fn flush(&self) -> CommitOutcome {
        self.worker.flush().await
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_some()
    }
}

impl<A> CommitWorker<A>
where A: AggregateStore
{
    async fn flush(&self) -> CommitOutcome {
        let writes = self.change_set.drain();
        if writes.is_empty() {
            trace!("nothing pending");
            return CommitOutcome::Empty;
        }

        let batch: WriteBatch = writes.into_iter().collect();
        let targets = batch.len();
        debug!("committing batch of {} targets", targets);

        let result = match timeout(self.commit_timeout, self.store.commit(batch)).await {
            Ok(result) => result,
            Err(_) => Err(CommitError::Timeout {
                targets,
                duration: self.commit_timeout,
            }
            .into()),
        };

        match result {
            Ok(()) => {
                BATCHES_COMMITTED.inc();
                info!("Done executing commit of {} targets", targets);
                CommitOutcome::Committed { targets }
            }
            Err(e) => {
                BATCHES_DISCARDED.inc();
                error!("discarding batch of {} targets: {}", targets, e);
                CommitOutcome::Discarded { targets }
            }
        }
    }
}

async fn run<A>(
    worker: Arc<CommitWorker<A>>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<()>
where
    A: AggregateStore,
{
    // If ticks are missed the next one waits a full period instead of firing
    // a burst.
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                warn!("[Committer] shutdown signal received, final flush");
                worker.flush().await;
                return Err(Error::Exit);
            }
            _ = ticker.tick() => {
                worker.flush().await;
            }
        }
    }
}
