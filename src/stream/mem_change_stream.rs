use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;

use crate::ChangeEvent;
use crate::ChangeStream;
use crate::Result;
use crate::Subscription;
use crate::SubscriptionError;
use crate::WatchQuery;

#[derive(Debug)]
struct Subscriber {
    query: WatchQuery,
    sender: mpsc::Sender<ChangeEvent>,
}

/// In-process change stream fed by [`crate::MemRecordStore`].
#[derive(Debug)]
pub struct MemChangeStream {
    subscribers: Mutex<Vec<Subscriber>>,
    buffer_size: usize,
    failing_subscribes: AtomicUsize,
}

impl Default for MemChangeStream {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl MemChangeStream {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            buffer_size: buffer_size.max(1),
            failing_subscribes: AtomicUsize::new(0),
        }
    }

    /// Deliver `event` to every live subscription whose query matches.
    /// Returns the number of subscriptions that received it.
    pub async fn publish(
        &self,
        event: ChangeEvent,
    ) -> usize {
        let senders: Vec<mpsc::Sender<ChangeEvent>> = {
            let mut subscribers = self.subscribers.lock();
            subscribers.retain(|s| !s.sender.is_closed());
            subscribers
                .iter()
                .filter(|s| s.query.matches(&event.parent_path))
                .map(|s| s.sender.clone())
                .collect()
        };

        let mut delivered = 0;
        for sender in senders {
            if sender.send(event.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        trace!(record_id = %event.record_id, delivered, "published {}", event.kind);
        delivered
    }

    /// Drop every open subscription, as if the remote end went away.
    pub fn disconnect_all(&self) {
        let mut subscribers = self.subscribers.lock();
        debug!("disconnecting {} subscriptions", subscribers.len());
        subscribers.clear();
    }

    /// Make the next `n` subscribe calls fail.
    pub fn fail_next_subscribes(
        &self,
        n: usize,
    ) {
        self.failing_subscribes.store(n, Ordering::SeqCst);
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !s.sender.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl ChangeStream for MemChangeStream {
    async fn subscribe(
        &self,
        query: WatchQuery,
    ) -> Result<Subscription> {
        let failed = self
            .failing_subscribes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(SubscriptionError::SubscribeFailed {
                query: query.to_string(),
                reason: "injected failure".to_string(),
            }
            .into());
        }

        let (sender, receiver) = mpsc::channel(self.buffer_size);
        self.subscribers.lock().push(Subscriber {
            query: query.clone(),
            sender,
        });
        debug!("subscribed to {}", query);
        Ok(Subscription::new(query, receiver))
    }
}
