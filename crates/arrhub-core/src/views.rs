//! Read-only query views over the stored snapshots.
//!
//! These accessors never touch the network: they read whatever the last
//! committed aggregation cycle produced, which is exactly what a dashboard
//! should show while polling runs in the background.

use arrhub_events::BackendKind;
use chrono::{Months, NaiveDate};
use serde::Serialize;

use crate::hub::Hub;
use crate::model::{BackendCounts, BackendFault, HealthSummary, QueueItem, ReleaseItem};
use crate::snapshot::{SnapshotKey, read_snapshot};

/// Window selection for the calendar view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarView {
    /// Today only.
    Day,
    /// Seven days starting today.
    Week,
    /// One month starting today.
    Month,
}

impl CalendarView {
    fn end(self, start: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => start + chrono::Days::new(1),
            Self::Week => start + chrono::Days::new(7),
            Self::Month => start + Months::new(1),
        }
    }
}

/// Queue state plus the fault registry, as one consistent read.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueOverview {
    pub items: Vec<QueueItem>,
    pub counts: BackendCounts,
    pub paused: Vec<BackendKind>,
    pub faults: Vec<BackendFault>,
}

/// Today's releases with per-backend release and missing counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Agenda {
    pub releases: Vec<ReleaseItem>,
    pub release_counts: BackendCounts,
    pub missing_counts: BackendCounts,
    pub faults: Vec<BackendFault>,
}

impl Hub {
    /// Calendar releases falling within `[today, today + view)`.
    pub async fn calendar_events(&self, view: CalendarView, today: NaiveDate) -> Vec<ReleaseItem> {
        let window: Vec<ReleaseItem> = read_snapshot(self.store(), SnapshotKey::CalendarWindow)
            .await
            .unwrap_or_default();
        let end = view.end(today);
        window
            .into_iter()
            .filter(|item| item.date >= today && item.date < end)
            .collect()
    }

    /// Condensed per-backend health, as committed by the last long cycle.
    pub async fn health_summary(&self) -> HealthSummary {
        read_snapshot(self.store(), SnapshotKey::HealthSummary)
            .await
            .unwrap_or_default()
    }

    /// Combined library size across backends.
    pub async fn library_size(&self) -> u64 {
        read_snapshot::<BackendCounts>(self.store(), SnapshotKey::LibraryCounts)
            .await
            .unwrap_or_default()
            .total()
    }

    /// Merged queue, per-backend counts, pause state, and faults.
    pub async fn queue_overview(&self) -> QueueOverview {
        QueueOverview {
            items: read_snapshot(self.store(), SnapshotKey::QueueItems)
                .await
                .unwrap_or_default(),
            counts: read_snapshot(self.store(), SnapshotKey::QueueCounts)
                .await
                .unwrap_or_default(),
            paused: read_snapshot(self.store(), SnapshotKey::PausedBackends)
                .await
                .unwrap_or_default(),
            faults: read_snapshot(self.store(), SnapshotKey::BackendFaults)
                .await
                .unwrap_or_default(),
        }
    }

    /// Today's agenda: releases plus release and missing breakdowns.
    pub async fn agenda(&self) -> Agenda {
        Agenda {
            releases: read_snapshot(self.store(), SnapshotKey::TodayReleases)
                .await
                .unwrap_or_default(),
            release_counts: read_snapshot(self.store(), SnapshotKey::ReleaseCounts)
                .await
                .unwrap_or_default(),
            missing_counts: read_snapshot(self.store(), SnapshotKey::MissingCounts)
                .await
                .unwrap_or_default(),
            faults: read_snapshot(self.store(), SnapshotKey::BackendFaults)
                .await
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClientRegistry;
    use crate::snapshot::MemoryStore;
    use crate::testing::StubBackend;
    use arrhub_events::EventBus;
    use arrhub_telemetry::Metrics;
    use std::sync::Arc;

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date")
    }

    async fn hub_with(backends: Vec<Arc<StubBackend>>) -> Arc<Hub> {
        let mut registry = ClientRegistry::new();
        for backend in backends {
            registry.insert(backend);
        }
        let store = Arc::new(MemoryStore::new());
        let metrics = Metrics::new().expect("metrics registry");
        Arc::new(Hub::new(registry, store, EventBus::new(), metrics, 20).await)
    }

    #[tokio::test]
    async fn views_read_back_committed_cycles() {
        let movies = StubBackend::new(BackendKind::Movies)
            .with_queue(2)
            .with_calendar_titles(vec!["Feature".to_owned()])
            .with_missing(4, 6)
            .with_library(120);
        let hub = hub_with(vec![movies]).await;

        hub.run_full_refresh(sample_date()).await;

        let overview = hub.queue_overview().await;
        assert_eq!(overview.counts.total(), 2);
        assert_eq!(overview.items.len(), 2);
        assert!(overview.faults.is_empty());

        let agenda = hub.agenda().await;
        assert_eq!(agenda.releases.len(), 1);
        assert_eq!(agenda.release_counts.get(BackendKind::Movies), 1);
        assert_eq!(agenda.missing_counts.total(), 4);

        assert_eq!(hub.library_size().await, 120);

        let summary = hub.health_summary().await;
        assert!(summary.contains_key(&BackendKind::Movies));
    }

    #[tokio::test]
    async fn calendar_view_windows_filter_by_date() {
        let movies = StubBackend::new(BackendKind::Movies);
        let hub = hub_with(vec![movies]).await;

        // Seed the wide window directly: one release today, one in five
        // days, one in three weeks.
        let today = sample_date();
        let items: Vec<ReleaseItem> = [0_u64, 5, 21]
            .into_iter()
            .map(|offset| {
                let date = today + chrono::Days::new(offset);
                ReleaseItem {
                    backend: BackendKind::Movies,
                    title: format!("release +{offset}d"),
                    has_file: false,
                    date,
                    timestamp_ms: 0,
                }
            })
            .collect();
        crate::snapshot::write_snapshot(hub.store(), SnapshotKey::CalendarWindow, &items).await;

        assert_eq!(hub.calendar_events(CalendarView::Day, today).await.len(), 1);
        assert_eq!(hub.calendar_events(CalendarView::Week, today).await.len(), 2);
        assert_eq!(
            hub.calendar_events(CalendarView::Month, today).await.len(),
            3
        );
    }

    #[tokio::test]
    async fn paused_backends_surface_in_overview() {
        let music = StubBackend::new(BackendKind::Music).with_queue(1);
        music.set_paused(true);
        let hub = hub_with(vec![music]).await;

        hub.run_short_cycle(sample_date()).await;
        let overview = hub.queue_overview().await;
        assert_eq!(overview.paused, vec![BackendKind::Music]);
    }
}
