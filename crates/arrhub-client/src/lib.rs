//! HTTP adapter implementing the backend service port.
//!
//! One [`ServiceClient`] per configured backend: it normalizes the request
//! root from the configured URL, selects the wire-format generation by
//! backend kind, attaches the API-key header, enforces a hard timeout, and
//! masks the key out of every error it produces. Callers get typed records
//! or a typed [`ServiceError`]; nothing is swallowed here.

mod payload;
mod routes;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use arrhub_config::BackendConfig;
use arrhub_core::records::{
    CalendarRecord, HealthRecord, HistoryRecord, IndexerRecord, LookupRecord, MissingPage,
    MissingRecord, QueueRecord, QueueStatusRecord, SystemStatus,
};
use arrhub_core::{BackendService, RemoveQueueOptions, ServiceError, ServiceResult};
use arrhub_events::BackendKind;

use crate::payload::{Collection, Paged, count_past_releases};
use crate::routes::{
    ApiVersion, CommandPlan, item_path, lookup_path, missing_search_command, pause_plan,
    resume_plan,
};

/// Hard per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// API-key header understood by all backend generations.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Replacement for the API key in sanitized error text.
const MASKED: &str = "[masked]";

/// HTTP client for one remote backend.
#[derive(Debug)]
pub struct ServiceClient {
    kind: BackendKind,
    http: reqwest::Client,
    root: String,
    api_key: String,
    version: ApiVersion,
}

impl ServiceClient {
    /// Build a client from a backend configuration entry.
    ///
    /// The request root is `scheme://host:port/prefix` with the port taken
    /// from the URL when embedded, otherwise from the configuration, and
    /// any trailing slash stripped off the path prefix.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidBaseUrl`] when the configured URL cannot be
    /// parsed or lacks a host; [`ServiceError::Transport`] when the HTTP
    /// client cannot be constructed.
    pub fn from_config(config: &BackendConfig) -> ServiceResult<Self> {
        let kind = config.kind;
        let parsed =
            Url::parse(config.base_url.trim()).map_err(|_| ServiceError::InvalidBaseUrl {
                value: config.base_url.clone(),
            })?;
        let host = parsed.host_str().ok_or_else(|| ServiceError::InvalidBaseUrl {
            value: config.base_url.clone(),
        })?;

        let port = parsed.port().unwrap_or_else(|| config.effective_port());
        let prefix = parsed.path().trim_end_matches('/');
        let root = format!("{}://{host}:{port}{prefix}", parsed.scheme());

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ServiceError::Transport {
                kind,
                operation: "client_init",
                message: err.to_string(),
            })?;

        Ok(Self {
            kind,
            http,
            root,
            api_key: config.api_key.clone(),
            version: ApiVersion::for_kind(kind),
        })
    }

    /// Replace the API key in text destined for errors or logs.
    fn mask(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            text.to_owned()
        } else {
            text.replace(&self.api_key, MASKED)
        }
    }

    fn transport(&self, operation: &'static str, err: &reqwest::Error) -> ServiceError {
        ServiceError::Transport {
            kind: self.kind,
            operation,
            message: self.mask(&err.to_string()),
        }
    }

    fn require_media(&self, operation: &'static str) -> ServiceResult<()> {
        if self.kind.is_media_manager() {
            Ok(())
        } else {
            Err(ServiceError::Unsupported {
                kind: self.kind,
                operation,
            })
        }
    }

    /// Issue one request; v1-generation backends get a single retry on 5xx.
    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ServiceResult<String> {
        let url = format!("{}/api/{}{}", self.root, self.version.as_str(), path);
        let mut attempt = 0_u8;
        loop {
            attempt += 1;
            let mut request = self
                .http
                .request(method.clone(), &url)
                .header(API_KEY_HEADER, &self.api_key);
            if let Some(body) = &body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|err| self.transport(operation, &err))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| self.transport(operation, &err))?;

            if status.is_success() {
                return Ok(text);
            }
            if status.is_server_error() && self.version.retries_server_errors() && attempt == 1 {
                debug!(backend = %self.kind, operation, status = status.as_u16(), "retrying after server error");
                continue;
            }
            return Err(ServiceError::Remote {
                kind: self.kind,
                operation,
                status: status.as_u16(),
                body: self.mask(&text),
            });
        }
    }

    /// GET and decode; an empty body decodes to the type's default value.
    async fn get_json<T: DeserializeOwned + Default>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> ServiceResult<T> {
        let text = self.send(operation, Method::GET, path, None).await?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&text).map_err(|err| ServiceError::Transport {
            kind: self.kind,
            operation,
            message: self.mask(&format!("unexpected response body: {err}")),
        })
    }

    async fn command(&self, operation: &'static str, name: &str) -> ServiceResult<()> {
        self.send(
            operation,
            Method::POST,
            "/command",
            Some(serde_json::json!({ "name": name })),
        )
        .await
        .map(|_| ())
    }

    /// Run a command plan: primary first, fallback on a 400 rejection.
    async fn command_with_fallback(
        &self,
        operation: &'static str,
        plan: CommandPlan,
    ) -> ServiceResult<()> {
        let result = self.command(operation, plan.primary).await;
        match (result, plan.fallback) {
            (Err(ServiceError::Remote { status: 400, .. }), Some(fallback)) => {
                debug!(backend = %self.kind, operation, fallback, "primary command rejected; trying fallback");
                self.command(operation, fallback).await
            }
            (result, _) => result,
        }
    }
}

#[async_trait]
impl BackendService for ServiceClient {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn calendar(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ServiceResult<Vec<CalendarRecord>> {
        self.require_media("calendar")?;
        let path = format!(
            "/calendar?start={}&end={}",
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        self.get_json("calendar", &path).await
    }

    async fn queue(&self) -> ServiceResult<Vec<QueueRecord>> {
        self.require_media("queue")?;
        let page: Paged<QueueRecord> = self.get_json("queue", "/queue").await?;
        Ok(page.into_records())
    }

    async fn queue_status(&self) -> ServiceResult<QueueStatusRecord> {
        self.require_media("queue_status")?;
        self.get_json("queue_status", "/queue/status").await
    }

    async fn remove_queue_item(&self, id: &str, options: RemoveQueueOptions) -> ServiceResult<()> {
        self.require_media("remove_queue_item")?;
        let path = format!(
            "/queue/{id}?removeFromClient={}&blocklist={}",
            options.remove_from_client, options.blocklist,
        );
        self.send("remove_queue_item", Method::DELETE, &path, None)
            .await
            .map(|_| ())
    }

    async fn history(&self, page_size: u32) -> ServiceResult<Vec<HistoryRecord>> {
        self.require_media("history")?;
        let path =
            format!("/history?pageSize={page_size}&sortKey=date&sortDirection=descending");
        let page: Paged<HistoryRecord> = self.get_json("history", &path).await?;
        Ok(page.into_records())
    }

    async fn pause_queue(&self) -> ServiceResult<()> {
        self.require_media("pause_queue")?;
        self.command_with_fallback("pause_queue", pause_plan(self.kind))
            .await
    }

    async fn resume_queue(&self) -> ServiceResult<()> {
        self.require_media("resume_queue")?;
        self.command_with_fallback("resume_queue", resume_plan(self.kind))
            .await
    }

    async fn search_missing(&self) -> ServiceResult<()> {
        self.require_media("search_missing")?;
        self.command("search_missing", missing_search_command(self.kind))
            .await
    }

    async fn missing(&self, page_size: u32, include_future: bool) -> ServiceResult<MissingPage> {
        self.require_media("missing")?;
        let path = format!("/wanted/missing?pageSize={page_size}");
        let page: Paged<MissingRecord> = self.get_json("missing", &path).await?;
        let total_records = page.total_records().unwrap_or(page.len() as u64);

        let count = if include_future {
            total_records
        } else {
            let today = Local::now().date_naive();
            count_past_releases(self.kind, &page.into_records(), today)
        };
        Ok(MissingPage {
            count,
            total_records,
        })
    }

    async fn library_count(&self) -> ServiceResult<u64> {
        self.require_media("library_count")?;
        let collection: Collection = self
            .get_json("library_count", item_path(self.kind))
            .await?;
        Ok(collection.count())
    }

    async fn health(&self) -> ServiceResult<Vec<HealthRecord>> {
        self.get_json("health", "/health").await
    }

    async fn system_status(&self) -> ServiceResult<SystemStatus> {
        self.get_json("system_status", "/system/status").await
    }

    async fn indexers(&self) -> ServiceResult<Vec<IndexerRecord>> {
        if self.kind != BackendKind::Indexers {
            return Err(ServiceError::Unsupported {
                kind: self.kind,
                operation: "indexers",
            });
        }
        self.get_json("indexers", "/indexer").await
    }

    async fn lookup(&self, term: &str) -> ServiceResult<Vec<LookupRecord>> {
        self.require_media("lookup")?;
        let encoded: String = url::form_urlencoded::byte_serialize(term.as_bytes()).collect();
        let path = format!("{}?term={encoded}", lookup_path(self.kind));
        self.get_json("lookup", &path).await
    }

    async fn set_monitored(&self, id: i64, monitored: bool) -> ServiceResult<()> {
        self.require_media("set_monitored")?;
        let path = format!("{}/{id}", item_path(self.kind));

        // Read-modify-write: the update endpoint expects the full item back.
        let mut item: serde_json::Value = self.get_json("set_monitored", &path).await?;
        let Some(fields) = item.as_object_mut() else {
            return Err(ServiceError::Transport {
                kind: self.kind,
                operation: "set_monitored",
                message: "item response was not an object".to_owned(),
            });
        };
        fields.insert("monitored".to_owned(), serde_json::Value::Bool(monitored));

        self.send("set_monitored", Method::PUT, &path, Some(item))
            .await
            .map(|_| ())
    }

    async fn run_command(&self, name: &str) -> ServiceResult<()> {
        self.command("run_command", name).await
    }
}
