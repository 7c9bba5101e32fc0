//! Application bootstrap: settings, telemetry, store, supervisor, shutdown.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use arrhub_config::load_settings;
use arrhub_core::SnapshotStore;
use arrhub_events::EventBus;
use arrhub_telemetry::{LoggingConfig, Metrics, init_logging};

use crate::error::{AppError, AppResult};
use crate::store::FileStore;
use crate::supervisor::Supervisor;

/// Environment variable naming the settings file.
const SETTINGS_ENV: &str = "ARRHUB_SETTINGS";

/// Default settings file path.
const DEFAULT_SETTINGS_PATH: &str = "arrhub.yaml";

/// Environment variable naming the snapshot state file.
const STATE_ENV: &str = "ARRHUB_STATE";

/// Default snapshot state file path.
const DEFAULT_STATE_PATH: &str = "arrhub-state.json";

/// Bootstrap the hub and block until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an [`AppError`] when settings cannot be loaded, telemetry cannot
/// be installed, or the snapshot store cannot be opened.
pub async fn run_app() -> AppResult<()> {
    let settings_path =
        std::env::var(SETTINGS_ENV).unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_owned());
    let settings = load_settings(&settings_path)
        .map_err(|source| AppError::config("load_settings", source))?;

    init_logging(&LoggingConfig::default())
        .map_err(|source| AppError::telemetry("init_logging", source))?;
    info!(
        settings = %settings_path,
        backends = settings.backends.len(),
        "settings loaded"
    );

    let metrics = Metrics::new().map_err(|source| AppError::telemetry("init_metrics", source))?;

    let state_path = std::env::var(STATE_ENV).unwrap_or_else(|_| DEFAULT_STATE_PATH.to_owned());
    let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::open(&state_path).await?);

    let events = EventBus::new();
    let logger = spawn_event_logger(&events);

    let supervisor = Supervisor::new(store, events, metrics);
    supervisor.start(&settings).await;

    tokio::signal::ctrl_c()
        .await
        .map_err(|source| AppError::Io {
            operation: "wait_shutdown",
            source,
        })?;
    info!("shutdown signal received");

    supervisor.stop().await;
    logger.abort();
    Ok(())
}

/// Log every emitted event; this is where an external automation consumer
/// would subscribe instead.
fn spawn_event_logger(events: &EventBus) -> JoinHandle<()> {
    let mut stream = events.subscribe(None);
    tokio::spawn(async move {
        while let Some(envelope) = stream.next().await {
            info!(
                event = envelope.event.kind(),
                id = envelope.id,
                "automation event"
            );
        }
    })
}
