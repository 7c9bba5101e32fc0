//! The backend service seam implemented by HTTP adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use arrhub_events::BackendKind;

use crate::error::ServiceResult;
use crate::records::{
    CalendarRecord, HealthRecord, HistoryRecord, IndexerRecord, LookupRecord, MissingPage,
    QueueRecord, QueueStatusRecord, SystemStatus,
};

/// Options for removing a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveQueueOptions {
    /// Also remove the download from the attached download client.
    pub remove_from_client: bool,
    /// Add the release to the backend's blocklist.
    pub blocklist: bool,
}

impl Default for RemoveQueueOptions {
    fn default() -> Self {
        Self {
            remove_from_client: true,
            blocklist: false,
        }
    }
}

/// Typed operations against one remote backend.
///
/// Implementations wrap every failure with backend kind and operation
/// context and never swallow errors; isolation policy is the aggregation
/// engine's job. Operations that a backend kind does not provide fail with
/// [`crate::ServiceError::Unsupported`].
#[async_trait]
pub trait BackendService: Send + Sync {
    /// Which backend this client talks to.
    fn kind(&self) -> BackendKind;

    /// Calendar entries whose release date falls within `[start, end)`.
    async fn calendar(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ServiceResult<Vec<CalendarRecord>>;

    /// All in-flight downloads.
    async fn queue(&self) -> ServiceResult<Vec<QueueRecord>>;

    /// Queue pause state.
    async fn queue_status(&self) -> ServiceResult<QueueStatusRecord>;

    /// Remove one queue item.
    async fn remove_queue_item(&self, id: &str, options: RemoveQueueOptions) -> ServiceResult<()>;

    /// Most-recent-first history entries, at most `page_size` of them.
    async fn history(&self, page_size: u32) -> ServiceResult<Vec<HistoryRecord>>;

    /// Pause the download queue.
    async fn pause_queue(&self) -> ServiceResult<()>;

    /// Resume the download queue.
    async fn resume_queue(&self) -> ServiceResult<()>;

    /// Trigger a search for missing items.
    async fn search_missing(&self) -> ServiceResult<()>;

    /// Missing/wanted items. With `include_future` unset, items whose
    /// release date is strictly after the start of the current day are
    /// filtered out of the count.
    async fn missing(&self, page_size: u32, include_future: bool) -> ServiceResult<MissingPage>;

    /// Total item count of the backend's primary collection.
    async fn library_count(&self) -> ServiceResult<u64>;

    /// Current health check results.
    async fn health(&self) -> ServiceResult<Vec<HealthRecord>>;

    /// Connectivity probe.
    async fn system_status(&self) -> ServiceResult<SystemStatus>;

    /// Indexer list; only the indexer manager provides this.
    async fn indexers(&self) -> ServiceResult<Vec<IndexerRecord>>;

    /// Search the backend's catalogue by term.
    async fn lookup(&self, term: &str) -> ServiceResult<Vec<LookupRecord>>;

    /// Set the monitored flag on one library item.
    async fn set_monitored(&self, id: i64, monitored: bool) -> ServiceResult<()>;

    /// Run a named backend command.
    async fn run_command(&self, name: &str) -> ServiceResult<()>;
}
