use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::test_utils::enable_logger;
use crate::AggregateRef;
use crate::AggregationError;
use crate::Category;
use crate::CommitConfig;
use crate::CommitError;
use crate::Error;
use crate::FieldDeltas;
use crate::FieldPath;
use crate::MemAggregateStore;
use crate::MockAggregateStore;
use crate::PendingChangeSet;

fn config(
    interval_ms: u64,
    timeout_ms: u64,
) -> CommitConfig {
    CommitConfig {
        interval_ms,
        timeout_ms,
    }
}

fn confirmed(delta: i64) -> FieldDeltas {
    [(FieldPath::Total(Category::Confirmed), delta)].into_iter().collect()
}

fn thailand() -> AggregateRef {
    AggregateRef::country("Thailand")
}

#[tokio::test]
async fn test_flush_empty_skips_store() {
    let mut store = MockAggregateStore::new();
    store.expect_commit().times(0);
    let committer = BatchCommitter::new(Arc::new(store), Arc::new(PendingChangeSet::new()), &config(2000, 5000));

    assert_eq!(committer.flush().await, CommitOutcome::Empty);
    assert_eq!(committer.flush().await, CommitOutcome::Empty);
}

#[tokio::test]
async fn test_flush_commits_one_batch_for_all_targets() {
    let mut store = MockAggregateStore::new();
    store
        .expect_commit()
        .times(1)
        .withf(|batch| {
            batch.len() == 2
                && batch.writes().iter().all(|w| w.merge)
                && batch.writes()[1].target == AggregateRef::country("Thailand")
                && batch.writes()[1].fields.get(&FieldPath::Total(Category::Confirmed)) == Some(&1940)
        })
        .returning(|_| Ok(()));
    let change_set = Arc::new(PendingChangeSet::new());
    change_set.add(thailand(), confirmed(114)).unwrap();
    change_set.add(thailand(), confirmed(1826)).unwrap();
    change_set.add(AggregateRef::country("Japan"), confirmed(3)).unwrap();
    let committer = BatchCommitter::new(Arc::new(store), change_set.clone(), &config(2000, 5000));

    assert_eq!(committer.flush().await, CommitOutcome::Committed { targets: 2 });
    assert!(change_set.is_empty());
}

#[tokio::test]
async fn test_failed_commit_is_discarded() {
    enable_logger();
    let mut store = MockAggregateStore::new();
    store.expect_commit().times(1).returning(|batch| {
        Err(CommitError::Rejected {
            targets: batch.len(),
            reason: "quota".to_string(),
        }
        .into())
    });
    let change_set = Arc::new(PendingChangeSet::new());
    change_set.add(thailand(), confirmed(114)).unwrap();
    let committer = BatchCommitter::new(Arc::new(store), change_set.clone(), &config(2000, 5000));

    assert_eq!(committer.flush().await, CommitOutcome::Discarded { targets: 1 });
    // not retried on the next cycle
    assert_eq!(committer.flush().await, CommitOutcome::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_slow_commit_times_out() {
    let store = Arc::new(MemAggregateStore::new());
    store.set_latency(Some(Duration::from_secs(10)));
    let change_set = Arc::new(PendingChangeSet::new());
    change_set.add(thailand(), confirmed(114)).unwrap();
    let committer = BatchCommitter::new(store.clone(), change_set, &config(2000, 5000));

    assert_eq!(committer.flush().await, CommitOutcome::Discarded { targets: 1 });
    assert_eq!(store.commit_count(), 0);
    assert_eq!(store.view(&thailand()).total(Category::Confirmed), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ticker_commits_each_interval() {
    enable_logger();
    let store = Arc::new(MemAggregateStore::new());
    let change_set = Arc::new(PendingChangeSet::new());
    let committer = BatchCommitter::new(store.clone(), change_set.clone(), &config(2000, 5000));
    committer.start().await.unwrap();

    change_set.add(thailand(), confirmed(114)).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.commit_count(), 0);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(store.commit_count(), 1);
    assert_eq!(store.view(&thailand()).total(Category::Confirmed), 114);

    change_set.add(thailand(), confirmed(1826)).unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(store.commit_count(), 2);
    assert_eq!(store.view(&thailand()).total(Category::Confirmed), 1940);

    committer.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_idle_ticks_never_call_store() {
    let mut store = MockAggregateStore::new();
    store.expect_commit().times(0);
    let committer = BatchCommitter::new(Arc::new(store), Arc::new(PendingChangeSet::new()), &config(100, 5000));
    committer.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;

    committer.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stop_flushes_pending() {
    let store = Arc::new(MemAggregateStore::new());
    let change_set = Arc::new(PendingChangeSet::new());
    let committer = BatchCommitter::new(store.clone(), change_set.clone(), &config(60_000, 5000));
    committer.start().await.unwrap();
    assert!(committer.is_running().await);

    change_set.add(thailand(), confirmed(42)).unwrap();
    committer.stop().await.unwrap();

    assert!(!committer.is_running().await);
    assert_eq!(store.commit_count(), 1);
    assert_eq!(store.view(&thailand()).total(Category::Confirmed), 42);
    assert!(change_set.is_empty());
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let committer = BatchCommitter::new(
        Arc::new(MemAggregateStore::new()),
        Arc::new(PendingChangeSet::new()),
        &config(2000, 5000),
    );
    committer.start().await.unwrap();

    assert!(matches!(
        committer.start().await,
        Err(Error::Aggregation(AggregationError::InvalidTransition(_)))
    ));

    committer.stop().await.unwrap();
    // stopping again is a no-op
    committer.stop().await.unwrap();
}
