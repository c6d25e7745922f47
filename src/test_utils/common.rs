use tracing_subscriber::EnvFilter;

use crate::Category;
use crate::ChangeEvent;
use crate::Coordinates;
use crate::EventKind;
use crate::LocationRecord;
use crate::RawLocation;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

pub(crate) fn raw_location(
    country: &str,
    lat: &str,
    long: &str,
    latest: i64,
) -> RawLocation {
    RawLocation {
        country: country.to_string(),
        country_code: country.chars().take(2).collect::<String>().to_uppercase(),
        province: String::new(),
        coordinates: Coordinates::new(lat, long),
        history: Default::default(),
        latest,
    }
}

/// Valid record at `(lat, long)` in `country`.
pub(crate) fn location_record(
    country: &str,
    lat: &str,
    long: &str,
    category: Category,
    latest: i64,
) -> LocationRecord {
    LocationRecord::new(raw_location(country, lat, long, latest), category).expect("fixture record is valid")
}

/// The Thailand record at `(15, 101)` used throughout the scenarios.
pub(crate) fn thailand(
    category: Category,
    latest: i64,
) -> LocationRecord {
    location_record("Thailand", "15", "101", category, latest)
}

pub(crate) fn records_path(country: &str) -> String {
    format!("countries/{country}/records")
}

pub(crate) fn change_event(
    kind: EventKind,
    record: LocationRecord,
) -> ChangeEvent {
    let path = records_path(record.country());
    ChangeEvent::new(kind, path, record)
}

/// Poll `condition` until it holds or two seconds of wall time pass.
pub(crate) async fn wait_until<F>(condition: F) -> bool
where F: Fn() -> bool {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    condition()
}

pub(crate) fn fast_retry(max_retries: usize) -> crate::BackoffPolicy {
    crate::BackoffPolicy {
        max_retries,
        timeout_ms: 100,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}
