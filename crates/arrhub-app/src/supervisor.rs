//! Hub lifecycle supervision.
//!
//! Settings changes must never run a cycle against a half-updated registry,
//! so the supervisor replaces whole hub generations: stop the schedules,
//! build a fresh registry and hub from the new settings, start again. The
//! snapshot store, event bus, and metrics registry are shared across
//! generations so subscribers and dedup state survive reconfiguration.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use arrhub_client::ServiceClient;
use arrhub_config::HubSettings;
use arrhub_core::{ClientRegistry, Hub, PollingHandles, SnapshotStore};
use arrhub_events::EventBus;
use arrhub_telemetry::Metrics;

struct Generation {
    hub: Arc<Hub>,
    handles: PollingHandles,
}

/// Owns the running hub generation and its polling schedules.
pub struct Supervisor {
    store: Arc<dyn SnapshotStore>,
    events: EventBus,
    metrics: Metrics,
    current: Mutex<Option<Generation>>,
}

impl Supervisor {
    /// Construct a supervisor over shared infrastructure.
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>, events: EventBus, metrics: Metrics) -> Self {
        Self {
            store,
            events,
            metrics,
            current: Mutex::new(None),
        }
    }

    /// Build a hub from the settings and start its polling schedules.
    ///
    /// Any previously running generation keeps running; use
    /// [`Supervisor::reconfigure`] for replacement.
    pub async fn start(&self, settings: &HubSettings) -> Arc<Hub> {
        let registry = build_registry(settings);
        if registry.is_empty() {
            warn!("no backends enabled; hub will idle until reconfigured");
        }

        let hub = Arc::new(
            Hub::new(
                registry,
                Arc::clone(&self.store),
                self.events.clone(),
                self.metrics.clone(),
                settings.history_page_size,
            )
            .await,
        );
        let handles = hub.spawn_polling(settings);
        *self.current.lock().await = Some(Generation {
            hub: Arc::clone(&hub),
            handles,
        });
        hub
    }

    /// Stop the running generation, waiting for its schedules to wind down.
    pub async fn stop(&self) {
        if let Some(generation) = self.current.lock().await.take() {
            generation.handles.stop().await;
            info!("polling stopped");
        }
    }

    /// Tear down the current generation and start a new one from fresh
    /// settings.
    pub async fn reconfigure(&self, settings: &HubSettings) -> Arc<Hub> {
        info!("settings changed; rebuilding client registry");
        self.stop().await;
        self.start(settings).await
    }

    /// The currently running hub, if any.
    pub async fn hub(&self) -> Option<Arc<Hub>> {
        self.current
            .lock()
            .await
            .as_ref()
            .map(|generation| Arc::clone(&generation.hub))
    }
}

/// Build clients for every enabled backend entry.
///
/// A backend whose client cannot be constructed (bad URL) is logged and
/// skipped rather than failing the whole hub; it simply stays unregistered.
fn build_registry(settings: &HubSettings) -> ClientRegistry {
    let mut registry = ClientRegistry::new();
    for config in settings.enabled_backends() {
        match ServiceClient::from_config(config) {
            Ok(client) => {
                info!(backend = %config.kind, "backend client initialised");
                registry.insert(Arc::new(client));
            }
            Err(err) => {
                error!(backend = %config.kind, error = %err, "failed to initialise backend client");
            }
        }
    }
    registry
}
