use std::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::ChangeEvent;
use crate::Result;

/// A watched source of record changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchQuery {
    /// One records collection, e.g. `countries/Thailand/records`
    Collection(String),
    /// Every collection whose id is the given name, at any depth
    CollectionGroup(String),
}

impl WatchQuery {
    /// Whether an event from the collection at `parent_path` belongs to this query.
    pub fn matches(
        &self,
        parent_path: &str,
    ) -> bool {
        match self {
            WatchQuery::Collection(path) => path == parent_path,
            WatchQuery::CollectionGroup(id) => parent_path.rsplit('/').next() == Some(id.as_str()),
        }
    }
}

impl fmt::Display for WatchQuery {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            WatchQuery::Collection(path) => write!(f, "collection({path})"),
            WatchQuery::CollectionGroup(id) => write!(f, "collection_group({id})"),
        }
    }
}

/// Live feed for one query. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    query: WatchQuery,
    receiver: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(
        query: WatchQuery,
        receiver: mpsc::Receiver<ChangeEvent>,
    ) -> Self {
        Self { query, receiver }
    }

    pub fn query(&self) -> &WatchQuery {
        &self.query
    }

    /// Next event, or `None` once the remote end has disconnected.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }
}

/// Inbound change-stream client.
///
/// Events for one record are delivered in order within a subscription. No
/// ordering is promised across subscriptions.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChangeStream: Send + Sync + 'static {
    async fn subscribe(
        &self,
        query: WatchQuery,
    ) -> Result<Subscription>;
}
