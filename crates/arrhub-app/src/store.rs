//! JSON-file-backed snapshot store.
//!
//! One document on disk holding every snapshot key. Writes go through a
//! temporary file and an atomic rename, so a crash mid-write leaves the
//! previous complete state behind rather than a torn file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::Mutex;

use arrhub_core::{SnapshotKey, SnapshotStore};

use crate::error::{AppError, AppResult};

/// Snapshot store persisting to a single JSON file.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<HashMap<String, serde_json::Value>>,
}

impl FileStore {
    /// Open a store, loading existing state when the file is present.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] when an existing file cannot be read or
    /// parsed; a missing file is simply an empty store.
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .with_context(|| format!("malformed store file {}", path.display()))
                .map_err(|source| AppError::store("open", path.clone(), source))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(AppError::store("open", path, anyhow::Error::new(err)));
            }
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    async fn flush(&self, state: &HashMap<String, serde_json::Value>) -> anyhow::Result<()> {
        let encoded = serde_json::to_vec_pretty(state).context("failed to encode store state")?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, encoded)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn get(&self, key: SnapshotKey) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.state.lock().await.get(key.as_str()).cloned())
    }

    async fn put(&self, key: SnapshotKey, value: serde_json::Value) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.insert(key.as_str().to_owned(), value);
        self.flush(&state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn values_survive_reopening_the_store() -> AppResult<()> {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("state.json");

        let store = FileStore::open(&path).await?;
        store
            .put(SnapshotKey::QueueCounts, json!({"movies": 2}))
            .await
            .expect("put");

        let reopened = FileStore::open(&path).await?;
        let value = reopened
            .get(SnapshotKey::QueueCounts)
            .await
            .expect("get");
        assert_eq!(value, Some(json!({"movies": 2})));
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_opens_empty() -> AppResult<()> {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::open(dir.path().join("absent.json")).await?;
        let value = store.get(SnapshotKey::QueueItems).await.expect("get");
        assert!(value.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_file_is_a_typed_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{ not json").await.expect("write");

        let err = FileStore::open(&path).await.err().expect("open must fail");
        assert!(matches!(err, AppError::Store { .. }));
    }
}
