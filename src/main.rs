use std::fs;
use std::sync::Arc;

use delta_tally::gather_text;
use delta_tally::ingest_category;
use delta_tally::init_metrics;
use delta_tally::AggregationEngine;
use delta_tally::Category;
use delta_tally::EngineConfig;
use delta_tally::Error;
use delta_tally::JsonFileSource;
use delta_tally::LoggingConfig;
use delta_tally::MemAggregateStore;
use delta_tally::MemChangeStream;
use delta_tally::MemRecordStore;
use delta_tally::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = EngineConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&config.logging)?;
    init_metrics();
    info!("starting with {:?}", config);

    // Build Engine
    let stream = Arc::new(MemChangeStream::default());
    let records = MemRecordStore::new(stream.clone());
    let store = Arc::new(MemAggregateStore::new());
    let engine = AggregationEngine::new(&config, stream, store.clone());
    engine.start().await?;

    if let Some(seed_path) = &config.ingest.seed_path {
        match JsonFileSource::open(seed_path) {
            Ok(source) => {
                if let Err(e) = ingest_category(&source, &records, config.ingest.category).await {
                    error!("seed ingestion failed: {:?}", e);
                }
            }
            Err(e) => error!("could not load seed {}: {:?}", seed_path.display(), e),
        }
    }

    info!("Application started. Waiting for CTRL+C signal...");
    if let Err(e) = wait_for_shutdown_signal().await {
        error!("Failed to listen for shutdown signal: {:?}", e);
    }

    engine.shutdown().await?;

    for target in store.targets() {
        let view = store.view(&target);
        info!(
            %target,
            confirmed = view.total(Category::Confirmed),
            deaths = view.total(Category::Deaths),
            recovered = view.total(Category::Recovered),
            "final totals"
        );
    }
    debug!("metrics:\n{}", gather_text());

    println!("Exiting program.");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
    }

    info!("Shutdown server..");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `logging.level`. The returned guard must live until exit so buffered file
/// output is flushed.
fn init_observability(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .map_err(|e| Error::Fatal(format!("invalid logging.level {:?}: {}", logging.level, e)))?,
    };

    match &logging.log_dir {
        Some(log_dir) => {
            fs::create_dir_all(log_dir)?;
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, "delta-tally.log"));
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter);
            tracing_subscriber::registry().with(file_layer).init();
            Ok(Some(guard))
        }
        None => {
            let stdout_layer = tracing_subscriber::fmt::layer().with_filter(filter);
            tracing_subscriber::registry().with(stdout_layer).init();
            Ok(None)
        }
    }
}
