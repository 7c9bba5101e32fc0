//! Snapshot persistence port and the in-memory reference implementation.
//!
//! The hub treats persistence as an external key-value collaborator: each
//! key holds one complete, self-consistent JSON document written at the end
//! of an aggregation cycle. Store failures are logged and tolerated — a
//! flaky store degrades restart continuity, not polling.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::warn;

/// Logical keys the hub persists between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKey {
    /// Wide calendar window for the calendar view.
    CalendarWindow,
    /// Today's releases for the agenda view.
    TodayReleases,
    /// Per-backend release counts.
    ReleaseCounts,
    /// Per-backend missing counts.
    MissingCounts,
    /// Per-backend library counts.
    LibraryCounts,
    /// Merged queue items.
    QueueItems,
    /// Per-backend queue counts.
    QueueCounts,
    /// Backends whose queue is currently paused.
    PausedBackends,
    /// Per-backend condensed health.
    HealthSummary,
    /// Per-backend fault registry.
    BackendFaults,
    /// Status label per indexer name.
    IndexerStatus,
    /// Dedup ledger for download-finished events.
    FinishedLedger,
    /// Dedup ledger for media-added events.
    AddedLedger,
    /// Dedup ledger for release-grabbed events.
    GrabbedLedger,
}

impl SnapshotKey {
    /// Stable storage key string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CalendarWindow => "calendar_window",
            Self::TodayReleases => "today_releases",
            Self::ReleaseCounts => "release_counts",
            Self::MissingCounts => "missing_counts",
            Self::LibraryCounts => "library_counts",
            Self::QueueItems => "queue_items",
            Self::QueueCounts => "queue_counts",
            Self::PausedBackends => "paused_backends",
            Self::HealthSummary => "health_summary",
            Self::BackendFaults => "backend_faults",
            Self::IndexerStatus => "indexer_status",
            Self::FinishedLedger => "finished_ledger",
            Self::AddedLedger => "added_ledger",
            Self::GrabbedLedger => "grabbed_ledger",
        }
    }
}

/// Key-value persistence port for unified snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the raw document stored under `key`, if any.
    async fn get(&self, key: SnapshotKey) -> anyhow::Result<Option<serde_json::Value>>;

    /// Replace the document stored under `key`.
    async fn put(&self, key: SnapshotKey, value: serde_json::Value) -> anyhow::Result<()>;
}

/// Read and deserialize a snapshot value, tolerating store and shape errors.
pub async fn read_snapshot<T: DeserializeOwned>(
    store: &dyn SnapshotStore,
    key: SnapshotKey,
) -> Option<T> {
    match store.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(error = %err, key = key.as_str(), "stored snapshot has unexpected shape");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            warn!(error = %err, key = key.as_str(), "failed to read snapshot");
            None
        }
    }
}

/// Serialize and write a snapshot value, tolerating store errors.
pub async fn write_snapshot<T: Serialize>(store: &dyn SnapshotStore, key: SnapshotKey, value: &T) {
    let encoded = match serde_json::to_value(value) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!(error = %err, key = key.as_str(), "failed to encode snapshot");
            return;
        }
    };
    if let Err(err) = store.put(key, encoded).await {
        warn!(error = %err, key = key.as_str(), "failed to persist snapshot");
    }
}

/// Process-local store used in tests and as a fallback.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<SnapshotKey, serde_json::Value>>,
}

impl MemoryStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn get(&self, key: SnapshotKey) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.entries.read().await.get(&key).cloned())
    }

    async fn put(&self, key: SnapshotKey, value: serde_json::Value) -> anyhow::Result<()> {
        self.entries.write().await.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_round_trips_typed_values() {
        let store = MemoryStore::new();
        write_snapshot(&store, SnapshotKey::QueueCounts, &json!({"movies": 2})).await;

        let value: Option<serde_json::Value> =
            read_snapshot(&store, SnapshotKey::QueueCounts).await;
        assert_eq!(value, Some(json!({"movies": 2})));
    }

    #[tokio::test]
    async fn read_snapshot_tolerates_shape_mismatches() {
        let store = MemoryStore::new();
        write_snapshot(&store, SnapshotKey::QueueCounts, &json!("not a map")).await;

        let value: Option<std::collections::BTreeMap<String, u64>> =
            read_snapshot(&store, SnapshotKey::QueueCounts).await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn missing_keys_read_as_none() {
        let store = MemoryStore::new();
        let value: Option<serde_json::Value> =
            read_snapshot(&store, SnapshotKey::HealthSummary).await;
        assert!(value.is_none());
    }
}
