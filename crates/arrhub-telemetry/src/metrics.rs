//! Prometheus-backed metrics registry for the polling hub.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Gauges mirror the unified snapshot counters so dashboards can scrape
//!   the same numbers the query views expose.

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across the hub services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    poll_cycles_total: IntCounterVec,
    backend_faults_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    queue_depth: IntGauge,
    today_releases: IntGauge,
    missing_items: IntGauge,
    library_size: IntGauge,
    indexers_total: IntGauge,
    indexers_down: IntGauge,
}

/// Snapshot of the gauges for health reporting and tests.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Combined in-flight download count across backends.
    pub queue_depth: i64,
    /// Releases scheduled for the current day.
    pub today_releases: i64,
    /// Missing items whose release date has passed.
    pub missing_items: i64,
    /// Combined library item count across backends.
    pub library_size: i64,
    /// Indexers known to the indexer manager.
    pub indexers_total: i64,
    /// Indexers currently disabled or unhealthy.
    pub indexers_down: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let poll_cycles_total = IntCounterVec::new(
            Opts::new("poll_cycles_total", "Aggregation cycles run by outcome"),
            &["cycle", "status"],
        )?;
        let backend_faults_total = IntCounterVec::new(
            Opts::new("backend_faults_total", "Backend call failures by backend"),
            &["backend"],
        )?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new("events_emitted_total", "Domain events emitted by type"),
            &["type"],
        )?;
        let queue_depth =
            IntGauge::with_opts(Opts::new("queue_depth", "In-flight downloads across backends"))?;
        let today_releases = IntGauge::with_opts(Opts::new(
            "today_releases",
            "Releases scheduled for the current day",
        ))?;
        let missing_items = IntGauge::with_opts(Opts::new(
            "missing_items",
            "Missing items with a past release date",
        ))?;
        let library_size = IntGauge::with_opts(Opts::new(
            "library_size",
            "Combined library item count across backends",
        ))?;
        let indexers_total =
            IntGauge::with_opts(Opts::new("indexers_total", "Indexers known to the hub"))?;
        let indexers_down = IntGauge::with_opts(Opts::new(
            "indexers_down",
            "Indexers currently disabled or unhealthy",
        ))?;

        registry.register(Box::new(poll_cycles_total.clone()))?;
        registry.register(Box::new(backend_faults_total.clone()))?;
        registry.register(Box::new(events_emitted_total.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;
        registry.register(Box::new(today_releases.clone()))?;
        registry.register(Box::new(missing_items.clone()))?;
        registry.register(Box::new(library_size.clone()))?;
        registry.register(Box::new(indexers_total.clone()))?;
        registry.register(Box::new(indexers_down.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                poll_cycles_total,
                backend_faults_total,
                events_emitted_total,
                queue_depth,
                today_releases,
                missing_items,
                library_size,
                indexers_total,
                indexers_down,
            }),
        })
    }

    /// Increment the cycle counter for the given cycle name and outcome.
    pub fn inc_poll_cycle(&self, cycle: &str, status: &str) {
        self.inner
            .poll_cycles_total
            .with_label_values(&[cycle, status])
            .inc();
    }

    /// Increment the fault counter for the given backend label.
    pub fn inc_backend_fault(&self, backend: &str) {
        self.inner
            .backend_faults_total
            .with_label_values(&[backend])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Set the combined queue depth gauge.
    pub fn set_queue_depth(&self, depth: i64) {
        self.inner.queue_depth.set(depth);
    }

    /// Set the today's-releases gauge.
    pub fn set_today_releases(&self, count: i64) {
        self.inner.today_releases.set(count);
    }

    /// Set the missing-items gauge.
    pub fn set_missing_items(&self, count: i64) {
        self.inner.missing_items.set(count);
    }

    /// Set the combined library size gauge.
    pub fn set_library_size(&self, count: i64) {
        self.inner.library_size.set(count);
    }

    /// Set the indexer totals gauges.
    pub fn set_indexer_counts(&self, total: i64, down: i64) {
        self.inner.indexers_total.set(total);
        self.inner.indexers_down.set(down);
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_depth: self.inner.queue_depth.get(),
            today_releases: self.inner.today_releases.get(),
            missing_items: self.inner.missing_items.get(),
            library_size: self.inner.library_size.get(),
            indexers_total: self.inner.indexers_total.get(),
            indexers_down: self.inner.indexers_down.get(),
        }
    }
}
