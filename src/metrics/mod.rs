use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;


lazy_static! {
    pub static ref EVENTS_PROCESSED: IntCounterVec = IntCounterVec::new(
        Opts::new("events_processed", "Change events turned into pending deltas"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref EVENTS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("events_dropped", "Change events dropped without a delta"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref BATCHES_COMMITTED: IntCounter =
        IntCounter::new("batches_committed", "Batches applied by the store")
            .expect("metric can not be created");

    pub static ref BATCHES_DISCARDED: IntCounter =
        IntCounter::new("batches_discarded", "Batches discarded after a failed or timed out commit")
            .expect("metric can not be created");

    pub static ref SUBSCRIPTION_RECONNECTS: IntCounterVec = IntCounterVec::new(
        Opts::new("subscription_reconnects", "Change stream reconnect attempts"),
        &["query"]
    )
    .expect("metric can not be created");

    pub static ref PENDING_TARGETS: IntGauge =
        IntGauge::new("pending_targets", "Aggregates with undrained deltas")
            .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static INIT: Once = Once::new();

pub(crate) fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(EVENTS_PROCESSED.clone()))?;
    registry.register(Box::new(EVENTS_DROPPED.clone()))?;
    registry.register(Box::new(BATCHES_COMMITTED.clone()))?;
    registry.register(Box::new(BATCHES_DISCARDED.clone()))?;
    registry.register(Box::new(SUBSCRIPTION_RECONNECTS.clone()))?;
    registry.register(Box::new(PENDING_TARGETS.clone()))?;
    Ok(())
}

/// Register the engine collectors in [`REGISTRY`]. Only the first call has effect.
pub fn init_metrics() {
    INIT.call_once(|| {
        if let Err(e) = register_custom_metrics(&REGISTRY) {
            error!("could not register metrics: {}", e);
        }
    });
}

/// Render [`REGISTRY`] in the Prometheus text exposition format.
pub fn gather_text() -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode metrics: {}", e);
    }
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
