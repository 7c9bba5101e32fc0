//! Configurable stub backend used by engine and dispatcher tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use arrhub_events::BackendKind;

use crate::error::{ServiceError, ServiceResult};
use crate::records::{
    CalendarRecord, HealthRecord, HistoryRecord, IndexerRecord, LookupRecord, MissingPage,
    QueueRecord, QueueStatusRecord, SystemStatus,
};
use crate::service::{BackendService, RemoveQueueOptions};

/// In-memory backend double with switchable failure mode and call recording.
pub(crate) struct StubBackend {
    kind: BackendKind,
    failing: AtomicBool,
    paused: AtomicBool,
    library: AtomicU64,
    calendar: Mutex<Vec<CalendarRecord>>,
    queue: Mutex<Vec<QueueRecord>>,
    history: Mutex<Vec<HistoryRecord>>,
    health: Mutex<Vec<HealthRecord>>,
    indexers: Mutex<Vec<IndexerRecord>>,
    missing: Mutex<MissingPage>,
    lookup: Mutex<Vec<LookupRecord>>,
    calls: Mutex<Vec<String>>,
}

impl StubBackend {
    pub(crate) fn new(kind: BackendKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            library: AtomicU64::new(0),
            calendar: Mutex::new(Vec::new()),
            queue: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            health: Mutex::new(Vec::new()),
            indexers: Mutex::new(Vec::new()),
            missing: Mutex::new(MissingPage::default()),
            lookup: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn with_queue(self: Arc<Self>, len: usize) -> Arc<Self> {
        self.set_queue_len(len);
        self
    }

    pub(crate) fn with_calendar_titles(self: Arc<Self>, titles: Vec<String>) -> Arc<Self> {
        let records = titles
            .into_iter()
            .map(|title| CalendarRecord {
                title: Some(title),
                ..CalendarRecord::default()
            })
            .collect();
        *self.calendar.lock().expect("calendar lock") = records;
        self
    }

    pub(crate) fn with_history(self: Arc<Self>, records: Vec<HistoryRecord>) -> Arc<Self> {
        self.set_history(records);
        self
    }

    pub(crate) fn with_health(self: Arc<Self>, records: Vec<HealthRecord>) -> Arc<Self> {
        self.set_health(records);
        self
    }

    pub(crate) fn with_indexers(self: Arc<Self>, records: Vec<IndexerRecord>) -> Arc<Self> {
        self.set_indexers(records);
        self
    }

    pub(crate) fn with_missing(self: Arc<Self>, count: u64, total: u64) -> Arc<Self> {
        *self.missing.lock().expect("missing lock") = MissingPage {
            count,
            total_records: total,
        };
        self
    }

    pub(crate) fn with_library(self: Arc<Self>, count: u64) -> Arc<Self> {
        self.library.store(count, Ordering::Relaxed);
        self
    }

    pub(crate) fn with_lookup(self: Arc<Self>, records: Vec<LookupRecord>) -> Arc<Self> {
        *self.lookup.lock().expect("lookup lock") = records;
        self
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub(crate) fn set_queue_len(&self, len: usize) {
        let records = (0..len)
            .map(|index| QueueRecord {
                id: Some(index as i64 + 1),
                title: Some(format!("{} download {index}", self.kind)),
                status: Some("downloading".to_owned()),
                ..QueueRecord::default()
            })
            .collect();
        *self.queue.lock().expect("queue lock") = records;
    }

    pub(crate) fn set_history(&self, records: Vec<HistoryRecord>) {
        *self.history.lock().expect("history lock") = records;
    }

    pub(crate) fn set_health(&self, records: Vec<HealthRecord>) {
        *self.health.lock().expect("health lock") = records;
    }

    pub(crate) fn set_indexers(&self, records: Vec<IndexerRecord>) {
        *self.indexers.lock().expect("indexers lock") = records;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn invoke(&self, operation: &'static str) -> ServiceResult<()> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(operation.to_owned());
        if self.failing.load(Ordering::Relaxed) {
            return Err(ServiceError::Transport {
                kind: self.kind,
                operation,
                message: "stub offline".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BackendService for StubBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn calendar(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> ServiceResult<Vec<CalendarRecord>> {
        self.invoke("calendar")?;
        Ok(self.calendar.lock().expect("calendar lock").clone())
    }

    async fn queue(&self) -> ServiceResult<Vec<QueueRecord>> {
        self.invoke("queue")?;
        Ok(self.queue.lock().expect("queue lock").clone())
    }

    async fn queue_status(&self) -> ServiceResult<QueueStatusRecord> {
        self.invoke("queue_status")?;
        Ok(QueueStatusRecord {
            is_paused: self.paused.load(Ordering::Relaxed),
        })
    }

    async fn remove_queue_item(
        &self,
        _id: &str,
        _options: RemoveQueueOptions,
    ) -> ServiceResult<()> {
        self.invoke("remove_queue_item")
    }

    async fn history(&self, _page_size: u32) -> ServiceResult<Vec<HistoryRecord>> {
        self.invoke("history")?;
        Ok(self.history.lock().expect("history lock").clone())
    }

    async fn pause_queue(&self) -> ServiceResult<()> {
        self.invoke("pause_queue")
    }

    async fn resume_queue(&self) -> ServiceResult<()> {
        self.invoke("resume_queue")
    }

    async fn search_missing(&self) -> ServiceResult<()> {
        self.invoke("search_missing")
    }

    async fn missing(&self, _page_size: u32, _include_future: bool) -> ServiceResult<MissingPage> {
        self.invoke("missing")?;
        Ok(*self.missing.lock().expect("missing lock"))
    }

    async fn library_count(&self) -> ServiceResult<u64> {
        self.invoke("library_count")?;
        Ok(self.library.load(Ordering::Relaxed))
    }

    async fn health(&self) -> ServiceResult<Vec<HealthRecord>> {
        self.invoke("health")?;
        Ok(self.health.lock().expect("health lock").clone())
    }

    async fn system_status(&self) -> ServiceResult<SystemStatus> {
        self.invoke("system_status")?;
        Ok(SystemStatus::default())
    }

    async fn indexers(&self) -> ServiceResult<Vec<IndexerRecord>> {
        self.invoke("indexers")?;
        Ok(self.indexers.lock().expect("indexers lock").clone())
    }

    async fn lookup(&self, _term: &str) -> ServiceResult<Vec<LookupRecord>> {
        self.invoke("lookup")?;
        Ok(self.lookup.lock().expect("lookup lock").clone())
    }

    async fn set_monitored(&self, _id: i64, _monitored: bool) -> ServiceResult<()> {
        self.invoke("set_monitored")
    }

    async fn run_command(&self, _name: &str) -> ServiceResult<()> {
        self.invoke("run_command")
    }
}
