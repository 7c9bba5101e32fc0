//! Aggregation core for the arrhub polling hub.
//!
//! Layout: `service.rs` (the backend port), `records.rs` (wire-facing
//! records), `titles.rs` (title resolution tables), `model.rs` (unified
//! snapshot types), `snapshot.rs` (persistence port), `registry.rs` (client
//! registry), `aggregate.rs` (cycle engine), `diff.rs` (edge detection),
//! `hub.rs` (wiring and scheduling), `dispatch.rs` (commands), `views.rs`
//! (read-only queries).

pub mod aggregate;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod model;
pub mod records;
pub mod registry;
pub mod service;
pub mod snapshot;
#[cfg(test)]
pub(crate) mod testing;
pub mod titles;
pub mod views;

pub use aggregate::Aggregator;
pub use dispatch::CommandOutcome;
pub use error::{CommandError, CommandResult, ServiceError, ServiceResult};
pub use hub::{Hub, PollingHandles};
pub use model::{
    BackendCounts, BackendFault, BackendHealth, HealthIssue, HealthSummary, QueueItem,
    QueueSnapshot, ReleaseItem, ReleaseSnapshot, truncate_title,
};
pub use records::{
    CalendarRecord, HealthRecord, HistoryData, HistoryRecord, IndexerRecord, LookupRecord,
    MissingDates, MissingPage, MissingRecord, QueueRecord, QueueStatusRecord, SystemStatus,
};
pub use registry::ClientRegistry;
pub use service::{BackendService, RemoveQueueOptions};
pub use snapshot::{MemoryStore, SnapshotKey, SnapshotStore, read_snapshot, write_snapshot};
pub use views::{Agenda, CalendarView, QueueOverview};
