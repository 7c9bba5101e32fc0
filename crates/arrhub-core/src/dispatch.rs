//! Validated command pass-throughs.
//!
//! Every command resolves its target client, invokes the remote operation,
//! and then forces a fresh aggregation cycle for the affected data so the
//! caller observes consistent post-command state. Remote failures propagate
//! unchanged; the per-backend fault downgrade is an aggregation-cycle
//! policy, not a command policy.

use std::sync::Arc;

use arrhub_events::BackendKind;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CommandError, CommandResult};
use crate::hub::Hub;
use crate::service::{BackendService, RemoveQueueOptions};

/// Per-backend result of a fan-out command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    /// Backend the command targeted.
    pub backend: BackendKind,
    /// Failure summary, absent on success.
    pub error: Option<String>,
}

impl CommandOutcome {
    fn ok(backend: BackendKind) -> Self {
        Self {
            backend,
            error: None,
        }
    }

    fn failed(backend: BackendKind, error: String) -> Self {
        Self {
            backend,
            error: Some(error),
        }
    }

    /// Whether the command succeeded for this backend.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.error.is_none()
    }
}

impl Hub {
    fn resolve(&self, kind: BackendKind) -> CommandResult<Arc<dyn BackendService>> {
        self.aggregator()
            .registry()
            .get(kind)
            .ok_or(CommandError::UnconfiguredBackend { kind })
    }

    async fn refresh_queue_now(&self) {
        let queue = self.aggregator().refresh_queue().await;
        self.observe_queue_total(queue.counts.total()).await;
    }

    /// Pause downloads on every configured media manager, best effort.
    pub async fn pause_all(&self) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::new();
        for (kind, client) in self.aggregator().registry().media_managers() {
            match client.pause_queue().await {
                Ok(()) => {
                    info!(backend = %kind, "paused downloads");
                    outcomes.push(CommandOutcome::ok(kind));
                }
                Err(err) => {
                    warn!(backend = %kind, error = %err.summary(), "pause failed");
                    outcomes.push(CommandOutcome::failed(kind, err.summary()));
                }
            }
        }
        self.refresh_queue_now().await;
        outcomes
    }

    /// Resume downloads on every configured media manager, best effort.
    pub async fn resume_all(&self) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::new();
        for (kind, client) in self.aggregator().registry().media_managers() {
            match client.resume_queue().await {
                Ok(()) => {
                    info!(backend = %kind, "resumed downloads");
                    outcomes.push(CommandOutcome::ok(kind));
                }
                Err(err) => {
                    warn!(backend = %kind, error = %err.summary(), "resume failed");
                    outcomes.push(CommandOutcome::failed(kind, err.summary()));
                }
            }
        }
        self.refresh_queue_now().await;
        outcomes
    }

    /// Pause downloads on one backend.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnconfiguredBackend`] when no client is registered;
    /// remote failures propagate unchanged.
    pub async fn pause_one(&self, kind: BackendKind) -> CommandResult<()> {
        let client = self.resolve(kind)?;
        client.pause_queue().await?;
        self.refresh_queue_now().await;
        Ok(())
    }

    /// Resume downloads on one backend.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnconfiguredBackend`] when no client is registered;
    /// remote failures propagate unchanged.
    pub async fn resume_one(&self, kind: BackendKind) -> CommandResult<()> {
        let client = self.resolve(kind)?;
        client.resume_queue().await?;
        self.refresh_queue_now().await;
        Ok(())
    }

    /// Trigger a missing-item search on one backend, then refresh the
    /// missing counts.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnconfiguredBackend`] when no client is registered;
    /// remote failures propagate unchanged.
    pub async fn search_missing_one(&self, kind: BackendKind) -> CommandResult<()> {
        let client = self.resolve(kind)?;
        client.search_missing().await?;
        self.aggregator().refresh_missing().await;
        Ok(())
    }

    /// Look up an item by title and set its monitored flag.
    ///
    /// When the search returns several matches the first one wins; that is
    /// the documented policy for ambiguous titles.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotFound`] for zero matches,
    /// [`CommandError::MissingItemId`] when the match carries no id, and
    /// remote failures unchanged.
    pub async fn toggle_monitored_one(
        &self,
        kind: BackendKind,
        title: &str,
        monitored: bool,
    ) -> CommandResult<()> {
        let client = self.resolve(kind)?;
        let matches = client.lookup(title).await?;
        let Some(first) = matches.first() else {
            return Err(CommandError::NotFound {
                kind,
                title: title.to_owned(),
            });
        };
        let id = first.item_id().ok_or_else(|| CommandError::MissingItemId {
            kind,
            title: title.to_owned(),
        })?;
        client.set_monitored(id, monitored).await?;
        info!(backend = %kind, title, monitored, "monitored flag updated");
        Ok(())
    }

    /// Remove one queue item, optionally blocklisting the release, then
    /// refresh the queue snapshot.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnconfiguredBackend`] when no client is registered;
    /// remote failures propagate unchanged.
    pub async fn remove_queue_item(
        &self,
        kind: BackendKind,
        id: &str,
        blocklist: bool,
    ) -> CommandResult<()> {
        let client = self.resolve(kind)?;
        client
            .remove_queue_item(
                id,
                RemoveQueueOptions {
                    remove_from_client: true,
                    blocklist,
                },
            )
            .await?;
        self.refresh_queue_now().await;
        Ok(())
    }

    /// Targeted refresh of one backend's snapshot contribution; no remote
    /// command is issued.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnconfiguredBackend`] when no client is registered;
    /// fetch failures propagate unchanged.
    pub async fn refresh_one(&self, kind: BackendKind, today: NaiveDate) -> CommandResult<()> {
        let client = self.resolve(kind)?;
        if kind == BackendKind::Indexers {
            self.refresh_indexer_status(&client).await?;
        } else {
            let total = self
                .aggregator()
                .refresh_backend(kind, &client, today)
                .await?;
            self.observe_queue_total(total).await;
        }
        Ok(())
    }

    /// Run a named command on one backend, verbatim.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnconfiguredBackend`] when no client is registered;
    /// remote failures propagate unchanged.
    pub async fn run_backend_command(&self, kind: BackendKind, name: &str) -> CommandResult<()> {
        let client = self.resolve(kind)?;
        client.run_command(name).await?;
        info!(backend = %kind, command = name, "backend command executed");
        Ok(())
    }
}
