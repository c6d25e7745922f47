use delta_tally::ingest_category;
use delta_tally::Category;
use delta_tally::ChangeEvent;
use delta_tally::CommitOutcome;
use delta_tally::EventKind;
use delta_tally::JsonFileSource;
use delta_tally::MissingBaselinePolicy;

use crate::commons::engine_config;
use crate::commons::record;
use crate::commons::thailand;
use crate::commons::Harness;
use crate::commons::MANUAL_COMMIT_INTERVAL_MS;

#[tokio::test]
async fn test_create_contributes_latest() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    let created = thailand(Category::Confirmed, 114);

    harness.records.put(created.clone()).await.unwrap();
    assert!(harness.observed(&created).await);
    assert_eq!(
        harness.engine.committer().flush().await,
        CommitOutcome::Committed { targets: 1 }
    );

    let view = harness.view("Thailand");
    assert_eq!(view.total(Category::Confirmed), 114);
    assert_eq!(view.confirmed(), 114);
    harness.engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_increments_by_difference() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    let created = thailand(Category::Confirmed, 114);
    harness.records.put(created.clone()).await.unwrap();
    assert!(harness.observed(&created).await);
    harness.engine.committer().flush().await;

    let updated = created.with_reading("3/1/20", 1940);
    harness.records.put(updated.clone()).await.unwrap();
    assert!(harness.observed(&updated).await);
    harness.engine.committer().flush().await;

    let view = harness.view("Thailand");
    assert_eq!(view.total(Category::Confirmed), 1940);
    assert_eq!(view.confirmed(), 1940);
    assert_eq!(harness.store.commit_count(), 2);
    harness.engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_create_and_update_merge_into_one_commit() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    let created = thailand(Category::Confirmed, 114);
    let updated = created.with_reading("3/1/20", 1940);

    harness.records.put(created).await.unwrap();
    harness.records.put(updated.clone()).await.unwrap();
    assert!(harness.observed(&updated).await);
    harness.engine.shutdown().await.unwrap();

    assert_eq!(harness.store.commit_count(), 1);
    assert_eq!(harness.view("Thailand").total(Category::Confirmed), 1940);
}

#[tokio::test]
async fn test_categories_at_same_location_are_independent() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    let confirmed = thailand(Category::Confirmed, 100);
    let deaths = thailand(Category::Deaths, 3);
    assert_ne!(confirmed.record_id(), deaths.record_id());

    harness.records.put(confirmed.clone()).await.unwrap();
    harness.records.put(deaths.clone()).await.unwrap();
    let deaths = deaths.with_reading("3/1/20", 5);
    harness.records.put(deaths.clone()).await.unwrap();
    assert!(harness.observed(&confirmed).await);
    assert!(harness.observed(&deaths).await);
    harness.engine.shutdown().await.unwrap();

    let view = harness.view("Thailand");
    assert_eq!(view.total(Category::Confirmed), 100);
    assert_eq!(view.total(Category::Deaths), 5);
    assert_eq!(view.confirmed(), 100);
    assert_eq!(view.deaths(), 5);
    assert_eq!(view.recovered(), 0);
}

#[tokio::test]
async fn test_update_without_baseline_rejected_by_default() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    let unseen = thailand(Category::Confirmed, 1940);
    harness
        .stream
        .publish(ChangeEvent::new(EventKind::Update, "countries/Thailand/records", unseen.clone()))
        .await;
    // Same subscription, so the unseen update is handled before this create.
    let marker = record("Japan", "36", "138", Category::Confirmed, 1);
    harness.records.put(marker.clone()).await.unwrap();
    assert!(harness.observed(&marker).await);
    harness.engine.shutdown().await.unwrap();

    assert!(harness.engine.snapshot_cache().get(&unseen.record_id()).is_none());
    assert_eq!(harness.view("Thailand").total(Category::Confirmed), 0);
    assert_eq!(harness.view("Japan").total(Category::Confirmed), 1);
}

#[tokio::test]
async fn test_update_without_baseline_counts_in_full_with_zero_baseline() {
    let mut config = engine_config(MANUAL_COMMIT_INTERVAL_MS);
    config.listener.missing_baseline = MissingBaselinePolicy::ZeroBaseline;
    let harness = Harness::start(config).await;
    let unseen = thailand(Category::Confirmed, 1940);

    harness
        .stream
        .publish(ChangeEvent::new(EventKind::Update, "countries/Thailand/records", unseen.clone()))
        .await;
    assert!(harness.observed(&unseen).await);
    harness.engine.shutdown().await.unwrap();

    assert_eq!(harness.view("Thailand").total(Category::Confirmed), 1940);
}

#[tokio::test]
async fn test_seed_ingestion_rolls_up_per_country() {
    let harness = Harness::start(engine_config(MANUAL_COMMIT_INTERVAL_MS)).await;
    let source = JsonFileSource::from_json(
        r#"{"confirmed": [
            {"country": "Thailand", "country_code": "TH", "coordinates": {"lat": "15", "long": "101"}, "latest": 100},
            {"country": "Thailand", "country_code": "TH", "coordinates": {"lat": "13", "long": "100"}, "latest": 14},
            {"country": "Japan", "country_code": "JP", "coordinates": {"lat": "36", "long": "138"}, "latest": 7},
            {"country": "", "country_code": "", "coordinates": {"lat": "0", "long": "0"}, "latest": 9}
        ]}"#,
    )
    .unwrap();

    let written = ingest_category(&source, &harness.records, Category::Confirmed)
        .await
        .unwrap();
    assert_eq!(written, 3);
    assert!(harness.observed(&record("Japan", "36", "138", Category::Confirmed, 7)).await);
    assert!(harness.observed(&record("Thailand", "13", "100", Category::Confirmed, 14)).await);
    assert!(harness.observed(&record("Thailand", "15", "101", Category::Confirmed, 100)).await);
    harness.engine.shutdown().await.unwrap();

    let thailand = harness.view("Thailand");
    assert_eq!(thailand.total(Category::Confirmed), 114);
    assert_eq!(thailand.parts.len(), 2);
    assert_eq!(thailand.confirmed(), 114);
    assert_eq!(harness.view("Japan").confirmed(), 7);
    assert_eq!(harness.store.commit_count(), 1);
}
