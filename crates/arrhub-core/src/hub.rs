//! The polling hub: wires the aggregation engine, the diff detectors, and
//! the event bus, and drives the two periodic schedules.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrhub_config::HubSettings;
use arrhub_events::{BackendKind, Event, EventBus};
use arrhub_telemetry::Metrics;
use chrono::NaiveDate;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregate::Aggregator;
use crate::diff::{
    DedupLedger, HealthDiff, IndexerDiff, LEDGER_CAPACITY, QueueEmptyDetector, added_media_kind,
    classify_history, history_identity,
};
use crate::records::HistoryRecord;
use crate::registry::ClientRegistry;
use crate::service::BackendService;
use crate::snapshot::{SnapshotKey, SnapshotStore, read_snapshot, write_snapshot};
use crate::titles::{added_extractors, history_extractors, resolve_title};

/// Mutable edge-detection state, guarded as one unit so a forced refresh
/// and a periodic cycle never interleave their observations.
struct DiffState {
    queue_empty: QueueEmptyDetector,
    health: HealthDiff,
    indexers: IndexerDiff,
    finished: DedupLedger,
    added: DedupLedger,
    grabbed: DedupLedger,
}

impl DiffState {
    fn new() -> Self {
        Self {
            queue_empty: QueueEmptyDetector::new(),
            health: HealthDiff::new(),
            indexers: IndexerDiff::new(),
            finished: DedupLedger::new(),
            added: DedupLedger::new(),
            grabbed: DedupLedger::new(),
        }
    }
}

/// Aggregation hub over a fixed set of backend clients.
///
/// Reconfiguration replaces the whole hub: stop the polling handles, build a
/// new registry, construct a fresh hub. The snapshot store and event bus are
/// shared across generations so consumers and dedup state survive.
pub struct Hub {
    aggregator: Aggregator,
    store: Arc<dyn SnapshotStore>,
    diff: Mutex<DiffState>,
    events: EventBus,
    metrics: Metrics,
    history_page_size: u32,
}

impl Hub {
    /// Construct a hub and hydrate the diff state from persisted snapshots,
    /// so restarts neither replay already-fired history events nor treat
    /// every known-bad indexer as newly broken.
    pub async fn new(
        registry: ClientRegistry,
        store: Arc<dyn SnapshotStore>,
        events: EventBus,
        metrics: Metrics,
        history_page_size: u32,
    ) -> Self {
        let mut diff = DiffState::new();
        if let Some(entries) =
            read_snapshot::<Vec<String>>(&*store, SnapshotKey::FinishedLedger).await
        {
            diff.finished = DedupLedger::from_entries(entries, LEDGER_CAPACITY);
        }
        if let Some(entries) = read_snapshot::<Vec<String>>(&*store, SnapshotKey::AddedLedger).await
        {
            diff.added = DedupLedger::from_entries(entries, LEDGER_CAPACITY);
        }
        if let Some(entries) =
            read_snapshot::<Vec<String>>(&*store, SnapshotKey::GrabbedLedger).await
        {
            diff.grabbed = DedupLedger::from_entries(entries, LEDGER_CAPACITY);
        }
        if let Some(statuses) =
            read_snapshot::<BTreeMap<String, String>>(&*store, SnapshotKey::IndexerStatus).await
        {
            diff.indexers.hydrate(statuses);
        }

        Self {
            aggregator: Aggregator::new(registry, Arc::clone(&store), metrics.clone()),
            store,
            diff: Mutex::new(diff),
            events,
            metrics,
            history_page_size,
        }
    }

    pub(crate) const fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub(crate) fn store(&self) -> &dyn SnapshotStore {
        &*self.store
    }

    /// Run the short cycle: today's releases, queue, history-derived events.
    pub async fn run_short_cycle(&self, today: NaiveDate) {
        if self.aggregator.registry().is_empty() {
            debug!("no backends enabled; skipping short cycle");
            return;
        }

        let releases = self.aggregator.refresh_today_releases(today).await;
        let queue = self.aggregator.refresh_queue().await;
        self.observe_queue_total(queue.counts.total()).await;
        let history = self.aggregator.refresh_history(self.history_page_size).await;
        self.process_history(&history).await;

        let status = if self.aggregator.has_faults().await {
            "degraded"
        } else {
            "ok"
        };
        self.metrics.inc_poll_cycle("short", status);
        info!(
            releases = releases.counts.total(),
            queue = queue.counts.total(),
            status,
            "short cycle complete"
        );
    }

    /// Run the long cycle: health, missing, library, calendar window, and
    /// indexer status.
    pub async fn run_long_cycle(&self, today: NaiveDate) {
        if self.aggregator.registry().is_empty() {
            debug!("no backends enabled; skipping long cycle");
            return;
        }

        let current = self.aggregator.fetch_health().await;
        let summary_issues = {
            let mut diff = self.diff.lock().await;
            let mut fired = Vec::new();
            for (kind, issues) in current {
                fired.extend(diff.health.observe(kind, issues));
            }
            for issue in fired {
                self.publish(Event::HealthCheckFailed {
                    backend: issue.backend,
                    message: issue.message,
                    severity: issue.severity,
                });
            }
            diff.health.issues().clone()
        };
        self.aggregator.write_health_summary(&summary_issues).await;

        self.aggregator.refresh_missing().await;
        self.aggregator.refresh_library().await;
        self.aggregator.refresh_calendar_window(today).await;

        if let Some(client) = self.aggregator.registry().get(BackendKind::Indexers) {
            // Faults are recorded inside the engine; the periodic cycle has
            // nobody to propagate the error to.
            let _ = self.refresh_indexer_status(&client).await;
        }

        let status = if self.aggregator.has_faults().await {
            "degraded"
        } else {
            "ok"
        };
        self.metrics.inc_poll_cycle("long", status);
        info!(status, "long cycle complete");
    }

    /// Run both cycles back to back; used at startup and after reconfiguration.
    pub async fn run_full_refresh(&self, today: NaiveDate) {
        self.run_short_cycle(today).await;
        self.run_long_cycle(today).await;
    }

    /// Fetch the indexer list and emit ok-to-down transitions.
    pub(crate) async fn refresh_indexer_status(
        &self,
        client: &Arc<dyn BackendService>,
    ) -> crate::error::ServiceResult<()> {
        let records = self.aggregator.refresh_indexers(client).await?;
        let transitions = self.diff.lock().await.indexers.observe(&records);
        for transition in transitions {
            info!(indexer = %transition.name, "indexer left healthy state");
            self.publish(Event::IndexerIssue {
                indexer: transition.name,
                message: transition.message,
            });
        }
        Ok(())
    }

    /// Feed a fresh combined queue total to the queue-empty detector.
    pub(crate) async fn observe_queue_total(&self, total: u64) {
        let fired = self.diff.lock().await.queue_empty.observe(total);
        if fired {
            info!("queue drained to empty");
            self.publish(Event::QueueEmpty);
        }
    }

    /// Classify history batches, dedup against the ledgers, emit events,
    /// and persist the updated ledgers.
    async fn process_history(&self, batches: &[(BackendKind, Vec<HistoryRecord>)]) {
        let mut pending = Vec::new();
        {
            let mut diff = self.diff.lock().await;
            for (backend, records) in batches {
                for record in records {
                    let classes = classify_history(record);

                    if classes.grabbed {
                        let id = history_identity(*backend, record, Some("grab"));
                        if diff.grabbed.record(&id) {
                            pending.push(Event::ReleaseGrabbed {
                                backend: *backend,
                                title: resolve_title(
                                    history_extractors(*backend),
                                    &record.title_fields(),
                                ),
                            });
                        }
                    }

                    if classes.finished {
                        let id = history_identity(*backend, record, None);
                        if diff.finished.record(&id) {
                            pending.push(Event::DownloadFinished {
                                backend: *backend,
                                title: resolve_title(
                                    history_extractors(*backend),
                                    &record.title_fields(),
                                ),
                            });
                        }
                    }

                    if let Some(vocab_kind) = classes.added {
                        let id = history_identity(*backend, record, Some("added"));
                        if diff.added.record(&id) {
                            pending.push(Event::MediaAdded {
                                backend: *backend,
                                title: resolve_title(added_extractors(), &record.title_fields()),
                                media_kind: added_media_kind(record).unwrap_or(vocab_kind),
                            });
                        }
                    }
                }
            }

            write_snapshot(
                &*self.store,
                SnapshotKey::FinishedLedger,
                &diff.finished.entries(),
            )
            .await;
            write_snapshot(&*self.store, SnapshotKey::AddedLedger, &diff.added.entries())
                .await;
            write_snapshot(
                &*self.store,
                SnapshotKey::GrabbedLedger,
                &diff.grabbed.entries(),
            )
            .await;
        }

        for event in pending {
            self.publish(event);
        }
    }

    fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        debug!(event = event.kind(), "emitting event");
        self.events.publish(event);
    }

    /// Spawn the two periodic schedules.
    ///
    /// Both tick immediately, so startup and reconfiguration get fresh data
    /// without waiting a full period. With `manual_refresh_only` set, one
    /// full refresh runs and no intervals are installed.
    pub fn spawn_polling(self: &Arc<Self>, settings: &HubSettings) -> PollingHandles {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        if settings.manual_refresh_only {
            info!("manual refresh only; interval polling disabled");
            let hub = Arc::clone(self);
            tasks.push(tokio::spawn(async move {
                hub.run_full_refresh(today()).await;
            }));
            return PollingHandles {
                shutdown: shutdown_tx,
                tasks,
            };
        }

        let short_period = settings.short_cycle();
        let hub = Arc::clone(self);
        let mut rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(short_period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => hub.run_short_cycle(today()).await,
                    _ = rx.changed() => break,
                }
            }
        }));

        let long_period = settings.long_cycle();
        let hub = Arc::clone(self);
        let mut rx = shutdown_rx;
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(long_period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => hub.run_long_cycle(today()).await,
                    _ = rx.changed() => break,
                }
            }
        }));

        info!(
            short_secs = settings.short_cycle_secs,
            long_secs = settings.long_cycle_secs,
            "started polling"
        );
        PollingHandles {
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

/// Current day in the host's local timezone.
fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Handles for the running schedules.
///
/// Stopping is cooperative: the shutdown signal is observed between cycles,
/// so an in-flight cycle finishes (or times out per request) before the
/// task exits.
pub struct PollingHandles {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollingHandles {
    /// Signal shutdown and wait for both schedules to wind down.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "polling task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{HealthRecord, HistoryRecord, IndexerRecord, TitledRef};
    use crate::snapshot::MemoryStore;
    use crate::testing::StubBackend;
    use arrhub_events::MediaKind;

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date")
    }

    async fn hub_with(
        backends: Vec<Arc<StubBackend>>,
        store: Arc<MemoryStore>,
    ) -> (Arc<Hub>, EventBus) {
        let mut registry = ClientRegistry::new();
        for backend in backends {
            registry.insert(backend);
        }
        let events = EventBus::with_capacity(64);
        let metrics = Metrics::new().expect("metrics registry");
        let hub = Hub::new(registry, store, events.clone(), metrics, 20).await;
        (Arc::new(hub), events)
    }

    fn fired(events: &EventBus) -> Vec<Event> {
        events
            .replay(None)
            .into_iter()
            .map(|envelope| envelope.event)
            .collect()
    }

    fn history_record(id: i64, event_type: &str) -> HistoryRecord {
        HistoryRecord {
            id: Some(id),
            event_type: Some(event_type.to_owned()),
            date: Some("2026-08-06T08:00:00Z".to_owned()),
            source_title: Some(format!("release-{id}")),
            ..HistoryRecord::default()
        }
    }

    #[tokio::test]
    async fn queue_empty_event_fires_once_per_drain() {
        let movies = StubBackend::new(BackendKind::Movies).with_queue(2);
        let store = Arc::new(MemoryStore::new());
        let (hub, events) = hub_with(vec![movies.clone()], store).await;

        hub.run_short_cycle(sample_date()).await;
        movies.set_queue_len(0);
        hub.run_short_cycle(sample_date()).await;
        // Queue stays empty: no second event.
        hub.run_short_cycle(sample_date()).await;

        let empties = fired(&events)
            .iter()
            .filter(|event| matches!(event, Event::QueueEmpty))
            .count();
        assert_eq!(empties, 1);
    }

    #[tokio::test]
    async fn replayed_history_fires_each_event_once() {
        let series = StubBackend::new(BackendKind::Series).with_history(vec![
            history_record(1, "grabbed"),
            history_record(2, "downloadFolderImported"),
        ]);
        let store = Arc::new(MemoryStore::new());
        let (hub, events) = hub_with(vec![series], store).await;

        hub.run_short_cycle(sample_date()).await;
        // Identical history page on the next cycle: ledgers suppress both.
        hub.run_short_cycle(sample_date()).await;

        let all = fired(&events);
        let grabs = all
            .iter()
            .filter(|event| matches!(event, Event::ReleaseGrabbed { .. }))
            .count();
        let finishes = all
            .iter()
            .filter(|event| matches!(event, Event::DownloadFinished { .. }))
            .count();
        assert_eq!(grabs, 1);
        assert_eq!(finishes, 1);
    }

    #[tokio::test]
    async fn dedup_ledgers_survive_hub_restarts() {
        let store = Arc::new(MemoryStore::new());
        let backend = StubBackend::new(BackendKind::Movies)
            .with_history(vec![history_record(9, "downloadFolderImported")]);

        let (hub, events) = hub_with(vec![backend.clone()], store.clone()).await;
        hub.run_short_cycle(sample_date()).await;
        assert_eq!(
            fired(&events)
                .iter()
                .filter(|event| matches!(event, Event::DownloadFinished { .. }))
                .count(),
            1
        );

        // A fresh hub over the same store must not re-announce the entry.
        let (rebuilt, rebuilt_events) = hub_with(vec![backend], store).await;
        rebuilt.run_short_cycle(sample_date()).await;
        assert!(
            fired(&rebuilt_events)
                .iter()
                .all(|event| !matches!(event, Event::DownloadFinished { .. }))
        );
    }

    #[tokio::test]
    async fn media_added_carries_kind_and_title() {
        let mut record = history_record(4, "seriesAdded");
        record.series = Some(TitledRef {
            id: Some(7),
            title: Some("New Show".to_owned()),
        });
        let series = StubBackend::new(BackendKind::Series).with_history(vec![record]);
        let store = Arc::new(MemoryStore::new());
        let (hub, events) = hub_with(vec![series], store).await;

        hub.run_short_cycle(sample_date()).await;

        let added: Vec<Event> = fired(&events)
            .into_iter()
            .filter(|event| matches!(event, Event::MediaAdded { .. }))
            .collect();
        assert_eq!(added.len(), 1);
        match &added[0] {
            Event::MediaAdded {
                backend,
                title,
                media_kind,
            } => {
                assert_eq!(*backend, BackendKind::Series);
                assert_eq!(title, "New Show");
                assert_eq!(*media_kind, MediaKind::Series);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn persistent_health_issue_fires_once() {
        let movies = StubBackend::new(BackendKind::Movies).with_health(vec![HealthRecord {
            issue_type: Some("warning".to_owned()),
            message: Some("download client unreachable".to_owned()),
            ..HealthRecord::default()
        }]);
        let store = Arc::new(MemoryStore::new());
        let (hub, events) = hub_with(vec![movies], store).await;

        hub.run_long_cycle(sample_date()).await;
        hub.run_long_cycle(sample_date()).await;
        hub.run_long_cycle(sample_date()).await;

        let health_events = fired(&events)
            .iter()
            .filter(|event| matches!(event, Event::HealthCheckFailed { .. }))
            .count();
        assert_eq!(health_events, 1);
    }

    #[tokio::test]
    async fn indexer_drop_fires_through_long_cycle() {
        let indexers = StubBackend::new(BackendKind::Indexers).with_indexers(vec![IndexerRecord {
            name: "alpha".to_owned(),
            enable: None,
            status: Some("ok".to_owned()),
        }]);
        let store = Arc::new(MemoryStore::new());
        let (hub, events) = hub_with(vec![indexers.clone()], store).await;

        hub.run_long_cycle(sample_date()).await;
        indexers.set_indexers(vec![IndexerRecord {
            name: "alpha".to_owned(),
            enable: None,
            status: Some("failing".to_owned()),
        }]);
        hub.run_long_cycle(sample_date()).await;
        // Still failing: no re-fire.
        hub.run_long_cycle(sample_date()).await;

        let issues: Vec<Event> = fired(&events)
            .into_iter()
            .filter(|event| matches!(event, Event::IndexerIssue { .. }))
            .collect();
        assert_eq!(issues.len(), 1);
        match &issues[0] {
            Event::IndexerIssue { indexer, message } => {
                assert_eq!(indexer, "alpha");
                assert_eq!(message, "Indexer status: failing");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn polling_handles_stop_cleanly() {
        let movies = StubBackend::new(BackendKind::Movies).with_queue(1);
        let store = Arc::new(MemoryStore::new());
        let (hub, _) = hub_with(vec![movies], store).await;

        let settings = HubSettings {
            short_cycle_secs: 3_600,
            long_cycle_secs: 3_600,
            ..HubSettings::default()
        };
        let handles = hub.spawn_polling(&settings);
        handles.stop().await;
    }
}
