use std::time::Duration;

use delta_tally::AggregateRef;
use delta_tally::Category;
use delta_tally::CommitOutcome;

use crate::commons::engine_config;
use crate::commons::record;
use crate::commons::thailand;
use crate::commons::wait_until;
use crate::commons::Harness;
use crate::commons::MANUAL_COMMIT_INTERVAL_MS;

#[tokio::test]
async fn test_stream_loss_resubscribes_without_double_counting() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    let created = thailand(Category::Confirmed, 114);
    harness.records.put(created.clone()).await.unwrap();
    assert!(harness.observed(&created).await);

    harness.stream.disconnect_all();
    let stream = harness.stream.clone();
    assert!(wait_until(|| stream.subscriber_count() == 1).await);

    // Rewriting the cached reading after reconnecting contributes nothing.
    harness.records.put(created.clone()).await.unwrap();
    let updated = created.with_reading("3/1/20", 1940);
    harness.records.put(updated.clone()).await.unwrap();
    assert!(harness.observed(&updated).await);
    harness.engine.shutdown().await.unwrap();

    assert_eq!(harness.view("Thailand").total(Category::Confirmed), 1940);
}

#[tokio::test]
async fn test_rejected_batch_is_discarded_not_retried() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    let created = thailand(Category::Confirmed, 114);
    harness.records.put(created.clone()).await.unwrap();
    assert!(harness.observed(&created).await);

    harness.store.fail_next_commits(1);
    assert_eq!(
        harness.engine.committer().flush().await,
        CommitOutcome::Discarded { targets: 1 }
    );
    assert!(harness.engine.change_set().is_empty());

    let updated = created.with_reading("3/1/20", 120);
    harness.records.put(updated.clone()).await.unwrap();
    assert!(harness.observed(&updated).await);
    harness.engine.shutdown().await.unwrap();

    // only the increment after the discarded batch landed
    assert_eq!(harness.view("Thailand").total(Category::Confirmed), 6);
    assert_eq!(harness.store.commit_count(), 1);
}

#[tokio::test]
async fn test_slow_store_times_out_and_discards() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    harness.store.set_latency(Some(Duration::from_secs(2)));
    let created = thailand(Category::Confirmed, 114);
    harness.records.put(created.clone()).await.unwrap();
    assert!(harness.observed(&created).await);

    assert_eq!(
        harness.engine.committer().flush().await,
        CommitOutcome::Discarded { targets: 1 }
    );

    harness.store.set_latency(None);
    harness.engine.shutdown().await.unwrap();
    assert_eq!(harness.view("Thailand").total(Category::Confirmed), 0);
}

#[tokio::test]
async fn test_ticker_commits_without_explicit_flush() {
    let harness = Harness::start(engine_config(50)).await;
    let created = thailand(Category::Confirmed, 114);
    harness.records.put(created.clone()).await.unwrap();

    let store = harness.store.clone();
    let confirmed = || store.view(&AggregateRef::country("Thailand")).total(Category::Confirmed);
    assert!(wait_until(|| confirmed() == 114).await);

    let updated = created.with_reading("3/1/20", 1940);
    harness.records.put(updated).await.unwrap();
    assert!(wait_until(|| confirmed() == 1940).await);

    harness.engine.shutdown().await.unwrap();
    assert!(harness.store.commit_count() >= 2);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;

    harness.engine.shutdown().await.unwrap();
    harness.engine.shutdown().await.unwrap();

    assert_eq!(harness.stream.subscriber_count(), 0);
    assert_eq!(harness.store.commit_count(), 0);
}

#[tokio::test]
async fn test_overflowing_reading_is_dropped_and_listener_keeps_running() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    let north = record("Thailand", "15", "101", Category::Confirmed, i64::MAX);
    let south = record("Thailand", "13", "100", Category::Confirmed, i64::MAX);
    harness.records.put(north.clone()).await.unwrap();
    assert!(harness.observed(&north).await);

    // the pending Thailand total cannot absorb a second i64::MAX
    harness.records.put(south.clone()).await.unwrap();
    let japan = record("Japan", "36", "138", Category::Confirmed, 7);
    harness.records.put(japan.clone()).await.unwrap();
    assert!(harness.observed(&japan).await);
    assert_eq!(harness.engine.snapshot_cache().get(&south.record_id()), None);
    harness.engine.shutdown().await.unwrap();

    assert_eq!(harness.view("Thailand").total(Category::Confirmed), i64::MAX);
    assert_eq!(harness.view("Japan").total(Category::Confirmed), 7);
}
