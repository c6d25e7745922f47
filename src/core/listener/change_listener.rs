//! Change stream subscriptions feeding the pending change set.
//!
//! One task runs per watched query. A task that loses its stream resubscribes
//! under the `retry.subscription` policy and gives up once that policy is
//! exhausted; the other tasks keep running.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::EventProcessor;
use crate::metrics::SUBSCRIPTION_RECONNECTS;
use crate::utils::async_task::spawn_task;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::AggregationError;
use crate::BackoffPolicy;
use crate::ChangeEvent;
use crate::ChangeStream;
use crate::Error;
use crate::ListenerConfig;
use crate::PendingChangeSet;
use crate::Result;
use crate::SnapshotCache;
use crate::Subscription;
use crate::SubscriptionError;
use crate::WatchQuery;

struct Listening {
    shutdown_tx: watch::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

pub struct ChangeListener<S>
where S: ChangeStream
{
    stream: Arc<S>,
    processor: Arc<EventProcessor>,
    queries: Vec<WatchQuery>,
    retry: BackoffPolicy,
    state: Mutex<Option<Listening>>,
}

impl<S> ChangeListener<S>
where S: ChangeStream
{
    pub fn new(
        stream: Arc<S>,
        cache: Arc<SnapshotCache>,
        change_set: Arc<PendingChangeSet>,
        config: &ListenerConfig,
        retry: BackoffPolicy,
    ) -> Self {
        let mut queries = Vec::new();
        if !config.collection_group.is_empty() {
            queries.push(WatchQuery::CollectionGroup(config.collection_group.clone()));
        }
        queries.extend(config.collections.iter().cloned().map(WatchQuery::Collection));

        Self {
            stream,
            processor: Arc::new(EventProcessor {
                cache,
                change_set,
                missing_baseline: config.missing_baseline,
                track_parts: config.track_parts,
            }),
            queries,
            retry,
            state: Mutex::new(None),
        }
    }

    /// Subscribe to every configured query and start one task per
    /// subscription.
    ///
    /// Returns once all initial subscriptions are open, so events written
    /// after `start` returns are observed. Fails without starting anything
    /// when any initial subscription cannot be opened.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(AggregationError::InvalidTransition("listener is already listening").into());
        }

        let mut subscriptions = Vec::with_capacity(self.queries.len());
        for query in &self.queries {
            subscriptions.push(subscribe_with_retry(&self.stream, query, self.retry).await?);
        }

        let (shutdown_tx, _) = watch::channel(());
        let mut handles = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let name = format!("listener:{}", subscription.query());
            let stream = self.stream.clone();
            let processor = self.processor.clone();
            let retry = self.retry;
            let shutdown_rx = shutdown_tx.subscribe();
            spawn_task(
                &name,
                move || run_subscription(stream, processor, retry, subscription, shutdown_rx),
                Some(&mut handles),
            );
        }

        info!("listening on {} queries", handles.len());
        *state = Some(Listening { shutdown_tx, handles });
        Ok(())
    }

    /// Unsubscribe and wait for every subscription task to finish.
    pub async fn close(&self) -> Result<()> {
        let listening = self.state.lock().await.take();
        let Some(listening) = listening else {
            debug!("listener already stopped");
            return Ok(());
        };

        if listening.shutdown_tx.send(()).is_err() {
            debug!("all subscription tasks had already exited");
        }
        for result in join_all(listening.handles).await {
            result?;
        }
        info!("listener stopped");
        Ok(())
    }

    pub async fn is_listening(&self) -> bool {
        self.state.lock().await.is_some()
    }

    pub fn queries(&self) -> &[WatchQuery] {
        &self.queries
    }

    /// Process one event outside of any subscription.
    ///
    /// Returns the delta that was enqueued, or the reason the event was
    /// dropped.
    pub fn handle_event(
        &self,
        event: ChangeEvent,
    ) -> Result<i64> {
        self.processor.handle(event)
    }
}

async fn subscribe_with_retry<S>(
    stream: &Arc<S>,
    query: &WatchQuery,
    retry: BackoffPolicy,
) -> Result<Subscription>
where
    S: ChangeStream,
{
    task_with_timeout_and_exponential_backoff(
        || {
            let stream = stream.clone();
            let query = query.clone();
            async move { stream.subscribe(query).await }
        },
        retry,
    )
    .await
    .map_err(|e| {
        error!("giving up on {}: {}", query, e);
        SubscriptionError::RetriesExhausted {
            query: query.to_string(),
            attempts: retry.max_retries,
        }
        .into()
    })
}

async fn run_subscription<S>(
    stream: Arc<S>,
    processor: Arc<EventProcessor>,
    retry: BackoffPolicy,
    mut subscription: Subscription,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<()>
where
    S: ChangeStream,
{
    let query = subscription.query().clone();

    loop {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    debug!("[{}] shutdown signal received", query);
                    return Err(Error::Exit);
                }
                next = subscription.next() => match next {
                    // Dropped events were already counted and logged.
                    Some(event) => { let _ = processor.handle(event); }
                    None => break,
                }
            }
        }

        warn!("{}", SubscriptionError::Disconnected { query: query.to_string() });
        SUBSCRIPTION_RECONNECTS.with_label_values(&[&query.to_string()]).inc();

        subscription = tokio::select! {
            _ = shutdown_rx.changed() => return Err(Error::Exit),
            result = subscribe_with_retry(&stream, &query, retry) => result?,
        };
        info!("resubscribed to {}", query);
    }
}
