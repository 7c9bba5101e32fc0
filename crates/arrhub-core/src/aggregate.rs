//! The aggregation engine: one cycle per data kind across all backends.
//!
//! Per-backend calls within a cycle run concurrently and settle before the
//! unified structure is committed, so readers never observe a partial cycle.
//! A failing backend becomes a fault entry and an empty contribution; it
//! never delays or aborts the other backends.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrhub_events::{BackendKind, Severity};
use arrhub_telemetry::Metrics;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{ServiceError, ServiceResult};
use crate::model::{
    BackendCounts, BackendFault, BackendHealth, HealthIssue, HealthSummary, MAX_FAULT_ENTRIES,
    MAX_LIST_ITEMS, MAX_WINDOW_ITEMS, QueueItem, QueueSnapshot, ReleaseItem, ReleaseSnapshot,
    truncate_title,
};
use crate::records::{CalendarRecord, HistoryRecord, IndexerRecord, QueueRecord};
use crate::registry::ClientRegistry;
use crate::service::BackendService;
use crate::snapshot::{SnapshotKey, SnapshotStore, read_snapshot, write_snapshot};
use crate::titles::{calendar_extractors, queue_extractors, resolve_title};

/// Page size used when counting missing items.
const MISSING_PAGE_SIZE: u32 = 100;

/// Runs aggregation cycles and owns the per-backend fault registry.
pub struct Aggregator {
    registry: ClientRegistry,
    store: Arc<dyn SnapshotStore>,
    metrics: Metrics,
    faults: Mutex<BTreeMap<BackendKind, BackendFault>>,
}

impl Aggregator {
    /// Construct an engine over a fixed client registry.
    #[must_use]
    pub fn new(registry: ClientRegistry, store: Arc<dyn SnapshotStore>, metrics: Metrics) -> Self {
        Self {
            registry,
            store,
            metrics,
            faults: Mutex::new(BTreeMap::new()),
        }
    }

    /// The client registry this engine polls.
    #[must_use]
    pub const fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Current fault entries, ordered by backend.
    pub async fn faults(&self) -> Vec<BackendFault> {
        self.faults.lock().await.values().cloned().collect()
    }

    /// Whether any backend currently has a fault recorded.
    pub async fn has_faults(&self) -> bool {
        !self.faults.lock().await.is_empty()
    }

    async fn note_success(&self, kind: BackendKind) {
        self.faults.lock().await.remove(&kind);
    }

    async fn note_fault(&self, kind: BackendKind, error: &ServiceError) {
        let summary = error.summary();
        warn!(backend = %kind, error = %summary, "backend call failed");
        self.metrics.inc_backend_fault(kind.as_str());
        self.faults
            .lock()
            .await
            .insert(kind, BackendFault::new(kind, &summary));
    }

    async fn persist_faults(&self) {
        let faults: Vec<BackendFault> = self
            .faults
            .lock()
            .await
            .values()
            .take(MAX_FAULT_ENTRIES)
            .cloned()
            .collect();
        write_snapshot(&*self.store, SnapshotKey::BackendFaults, &faults).await;
    }

    /// Refresh today's releases across all media managers.
    pub async fn refresh_today_releases(&self, today: NaiveDate) -> ReleaseSnapshot {
        let (start, end) = day_window(today);
        let results = join_all(self.registry.media_managers().map(|(kind, client)| {
            async move { (kind, client.calendar(start, end).await) }
        }))
        .await;

        let mut snapshot = ReleaseSnapshot::default();
        for (kind, result) in results {
            match result {
                Ok(records) => {
                    self.note_success(kind).await;
                    snapshot.counts.set(kind, records.len() as u64);
                    snapshot
                        .items
                        .extend(records.iter().map(|record| release_item(kind, record, today)));
                }
                Err(err) => self.note_fault(kind, &err).await,
            }
        }
        snapshot.items.truncate(MAX_LIST_ITEMS);

        write_snapshot(&*self.store, SnapshotKey::TodayReleases, &snapshot.items).await;
        write_snapshot(&*self.store, SnapshotKey::ReleaseCounts, &snapshot.counts).await;
        self.persist_faults().await;
        self.metrics.set_today_releases(gauge(snapshot.counts.total()));
        snapshot
    }

    /// Refresh the wide calendar window (previous month through next month).
    pub async fn refresh_calendar_window(&self, today: NaiveDate) -> usize {
        let (start, end) = month_window(today);
        let results = join_all(self.registry.media_managers().map(|(kind, client)| {
            async move { (kind, client.calendar(start, end).await) }
        }))
        .await;

        let mut items = Vec::new();
        for (kind, result) in results {
            match result {
                Ok(records) => {
                    self.note_success(kind).await;
                    // Entries without a parseable release date are dropped;
                    // the calendar view is keyed by day.
                    items.extend(records.iter().filter_map(|record| {
                        let date = record
                            .release_date_value()
                            .and_then(parse_release_date)?;
                        Some(dated_release_item(kind, record, date))
                    }));
                }
                Err(err) => self.note_fault(kind, &err).await,
            }
        }
        items.truncate(MAX_WINDOW_ITEMS);

        let count = items.len();
        write_snapshot(&*self.store, SnapshotKey::CalendarWindow, &items).await;
        self.persist_faults().await;
        count
    }

    /// Refresh the merged queue and pause state across all media managers.
    pub async fn refresh_queue(&self) -> QueueSnapshot {
        let results = join_all(self.registry.media_managers().map(|(kind, client)| {
            async move {
                let outcome = match client.queue_status().await {
                    Ok(status) => client.queue().await.map(|records| (status, records)),
                    Err(err) => Err(err),
                };
                (kind, outcome)
            }
        }))
        .await;

        let mut snapshot = QueueSnapshot::default();
        for (kind, result) in results {
            match result {
                Ok((status, records)) => {
                    self.note_success(kind).await;
                    snapshot.counts.set(kind, records.len() as u64);
                    if status.is_paused {
                        snapshot.paused.push(kind);
                    }
                    snapshot
                        .items
                        .extend(records.iter().map(|record| queue_item(kind, record)));
                }
                Err(err) => self.note_fault(kind, &err).await,
            }
        }
        snapshot.items.truncate(MAX_LIST_ITEMS);

        write_snapshot(&*self.store, SnapshotKey::QueueItems, &snapshot.items).await;
        write_snapshot(&*self.store, SnapshotKey::QueueCounts, &snapshot.counts).await;
        write_snapshot(&*self.store, SnapshotKey::PausedBackends, &snapshot.paused).await;
        self.persist_faults().await;
        self.metrics.set_queue_depth(gauge(snapshot.counts.total()));
        snapshot
    }

    /// Refresh missing counts, excluding items not yet released.
    pub async fn refresh_missing(&self) -> BackendCounts {
        let results = join_all(self.registry.media_managers().map(|(kind, client)| {
            async move { (kind, client.missing(MISSING_PAGE_SIZE, false).await) }
        }))
        .await;

        let mut counts = BackendCounts::default();
        for (kind, result) in results {
            match result {
                Ok(page) => {
                    self.note_success(kind).await;
                    counts.set(kind, page.count);
                }
                Err(err) => self.note_fault(kind, &err).await,
            }
        }

        write_snapshot(&*self.store, SnapshotKey::MissingCounts, &counts).await;
        self.persist_faults().await;
        self.metrics.set_missing_items(gauge(counts.total()));
        counts
    }

    /// Refresh library sizes across all media managers.
    pub async fn refresh_library(&self) -> BackendCounts {
        let results = join_all(self.registry.media_managers().map(|(kind, client)| {
            async move { (kind, client.library_count().await) }
        }))
        .await;

        let mut counts = BackendCounts::default();
        for (kind, result) in results {
            match result {
                Ok(count) => {
                    self.note_success(kind).await;
                    counts.set(kind, count);
                }
                Err(err) => self.note_fault(kind, &err).await,
            }
        }

        write_snapshot(&*self.store, SnapshotKey::LibraryCounts, &counts).await;
        self.persist_faults().await;
        self.metrics.set_library_size(gauge(counts.total()));
        counts
    }

    /// Fetch current health issues per backend.
    ///
    /// Backends whose health fetch fails are absent from the result so the
    /// diff engine keeps their last known issue set; fetch failures here are
    /// logged but deliberately not recorded as faults, since the data cycles
    /// already capture backend reachability.
    pub async fn fetch_health(&self) -> BTreeMap<BackendKind, Vec<HealthIssue>> {
        let results = join_all(
            self.registry
                .iter()
                .map(|(kind, client)| async move { (kind, client.health().await) }),
        )
        .await;

        let mut current = BTreeMap::new();
        for (kind, result) in results {
            match result {
                Ok(records) => {
                    let issues = records
                        .iter()
                        .filter_map(|record| {
                            let severity = match record.issue_type.as_deref() {
                                Some("error") => Severity::Error,
                                Some("warning") => Severity::Warning,
                                _ => return None,
                            };
                            Some(HealthIssue {
                                backend: kind,
                                identity: record.identity(),
                                message: record
                                    .message
                                    .clone()
                                    .or_else(|| record.source.clone())
                                    .unwrap_or_else(|| "Health check issue".to_owned()),
                                severity,
                            })
                        })
                        .collect();
                    current.insert(kind, issues);
                }
                Err(err) => {
                    warn!(backend = %kind, error = %err.summary(), "health fetch failed");
                }
            }
        }
        current
    }

    /// Build and persist the condensed per-backend health summary.
    pub async fn write_health_summary(
        &self,
        issues: &BTreeMap<BackendKind, Vec<HealthIssue>>,
    ) -> HealthSummary {
        let faults = self.faults.lock().await.clone();
        let mut summary = HealthSummary::new();

        for kind in BackendKind::ALL {
            let state = if self.registry.get(kind).is_none() {
                BackendHealth::Disabled
            } else if let Some(fault) = faults.get(&kind) {
                BackendHealth::Error {
                    message: fault.message.clone(),
                }
            } else {
                let backend_issues = issues.get(&kind).map_or(&[][..], Vec::as_slice);
                if backend_issues
                    .iter()
                    .any(|issue| issue.severity == Severity::Error)
                {
                    BackendHealth::Error {
                        message: "backend reported an internal error".to_owned(),
                    }
                } else if backend_issues
                    .iter()
                    .any(|issue| issue.severity == Severity::Warning)
                {
                    BackendHealth::Warning {
                        message: "backend reported a warning".to_owned(),
                    }
                } else {
                    BackendHealth::Ok
                }
            };
            summary.insert(kind, state);
        }

        write_snapshot(&*self.store, SnapshotKey::HealthSummary, &summary).await;
        summary
    }

    /// Fetch the indexer list from the indexer manager and persist the
    /// resulting status map and count gauges.
    ///
    /// # Errors
    ///
    /// Propagates the service error after recording it as a fault, so
    /// targeted refresh commands surface the real failure.
    pub async fn refresh_indexers(
        &self,
        client: &Arc<dyn BackendService>,
    ) -> ServiceResult<Vec<IndexerRecord>> {
        let kind = client.kind();
        match client.indexers().await {
            Ok(records) => {
                self.note_success(kind).await;
                let total = records.len() as u64;
                let down = records.iter().filter(|record| record.is_down()).count() as u64;
                let statuses: BTreeMap<String, String> = records
                    .iter()
                    .map(|record| (record.name.clone(), record.status_label().to_owned()))
                    .collect();

                write_snapshot(&*self.store, SnapshotKey::IndexerStatus, &statuses).await;
                self.persist_faults().await;
                self.metrics.set_indexer_counts(gauge(total), gauge(down));
                Ok(records)
            }
            Err(err) => {
                self.note_fault(kind, &err).await;
                self.persist_faults().await;
                Err(err)
            }
        }
    }

    /// Fetch recent history per media manager, most recent first.
    pub async fn refresh_history(
        &self,
        page_size: u32,
    ) -> Vec<(BackendKind, Vec<HistoryRecord>)> {
        let results = join_all(self.registry.media_managers().map(|(kind, client)| {
            async move { (kind, client.history(page_size).await) }
        }))
        .await;

        let mut batches = Vec::new();
        for (kind, result) in results {
            match result {
                Ok(records) => {
                    self.note_success(kind).await;
                    batches.push((kind, records));
                }
                Err(err) => self.note_fault(kind, &err).await,
            }
        }
        self.persist_faults().await;
        batches
    }

    /// Targeted refresh for one media manager: recompute its releases and
    /// queue contribution and splice them into the stored snapshots without
    /// touching other backends' entries.
    ///
    /// Returns the new combined queue total.
    ///
    /// # Errors
    ///
    /// Propagates the first service error after recording it as a fault.
    pub async fn refresh_backend(
        &self,
        kind: BackendKind,
        client: &Arc<dyn BackendService>,
        today: NaiveDate,
    ) -> ServiceResult<u64> {
        let (start, end) = day_window(today);
        let (calendar, queue) = tokio::join!(client.calendar(start, end), client.queue());

        let (calendar, queue) = match (calendar, queue) {
            (Ok(calendar), Ok(queue)) => (calendar, queue),
            (Err(err), _) | (_, Err(err)) => {
                self.note_fault(kind, &err).await;
                self.persist_faults().await;
                return Err(err);
            }
        };

        let new_releases: Vec<ReleaseItem> = calendar
            .iter()
            .map(|record| release_item(kind, record, today))
            .collect();
        let mut releases: Vec<ReleaseItem> = read_snapshot(&*self.store, SnapshotKey::TodayReleases)
            .await
            .unwrap_or_default();
        releases.retain(|item| item.backend != kind);
        let mut release_counts: BackendCounts =
            read_snapshot(&*self.store, SnapshotKey::ReleaseCounts)
                .await
                .unwrap_or_default();
        release_counts.set(kind, new_releases.len() as u64);
        releases.extend(new_releases);
        releases.truncate(MAX_LIST_ITEMS);

        let new_queue: Vec<QueueItem> = queue
            .iter()
            .map(|record| queue_item(kind, record))
            .collect();
        let mut queue_items: Vec<QueueItem> = read_snapshot(&*self.store, SnapshotKey::QueueItems)
            .await
            .unwrap_or_default();
        queue_items.retain(|item| item.backend != kind);
        let mut queue_counts: BackendCounts =
            read_snapshot(&*self.store, SnapshotKey::QueueCounts)
                .await
                .unwrap_or_default();
        queue_counts.set(kind, new_queue.len() as u64);
        queue_items.extend(new_queue);
        queue_items.truncate(MAX_LIST_ITEMS);

        write_snapshot(&*self.store, SnapshotKey::TodayReleases, &releases).await;
        write_snapshot(&*self.store, SnapshotKey::ReleaseCounts, &release_counts).await;
        write_snapshot(&*self.store, SnapshotKey::QueueItems, &queue_items).await;
        write_snapshot(&*self.store, SnapshotKey::QueueCounts, &queue_counts).await;
        self.note_success(kind).await;
        self.persist_faults().await;

        self.metrics.set_today_releases(gauge(release_counts.total()));
        self.metrics.set_queue_depth(gauge(queue_counts.total()));
        Ok(queue_counts.total())
    }
}

/// `[today, tomorrow)` as UTC instants.
fn day_window(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = today.and_time(NaiveTime::MIN).and_utc();
    let end = (today + Days::new(1)).and_time(NaiveTime::MIN).and_utc();
    (start, end)
}

/// First day of the previous month through first day of the month after
/// next, as UTC instants.
fn month_window(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_of_month = today.with_day(1).unwrap_or(today);
    let start = first_of_month - Months::new(1);
    let end = first_of_month + Months::new(2);
    (
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    )
}

/// Parse the date prefix of an ISO-ish timestamp or date string.
fn parse_release_date(value: &str) -> Option<NaiveDate> {
    let prefix = value.get(0..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn release_item(kind: BackendKind, record: &CalendarRecord, fallback: NaiveDate) -> ReleaseItem {
    let date = record
        .release_date_value()
        .and_then(parse_release_date)
        .unwrap_or(fallback);
    dated_release_item(kind, record, date)
}

fn dated_release_item(kind: BackendKind, record: &CalendarRecord, date: NaiveDate) -> ReleaseItem {
    let title = truncate_title(&resolve_title(
        calendar_extractors(kind),
        &record.title_fields(),
    ));
    ReleaseItem {
        backend: kind,
        title,
        has_file: record.has_file,
        date,
        timestamp_ms: date.and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
    }
}

fn queue_item(kind: BackendKind, record: &QueueRecord) -> QueueItem {
    QueueItem {
        id: record.identity(),
        backend: kind,
        title: truncate_title(&resolve_title(
            queue_extractors(kind),
            &record.title_fields(),
        )),
        status: record.status_label().to_owned(),
        size_bytes: record.size_bytes(),
        time_left: record.time_left().map(str::to_owned),
    }
}

/// Clamp a count into gauge range.
fn gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
