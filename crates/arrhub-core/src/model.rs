//! Unified snapshot types shared by the aggregation engine and query views.

use std::collections::BTreeMap;

use arrhub_events::{BackendKind, Severity};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Visible character budget for stored titles, ellipsis included.
pub const MAX_TITLE_CHARS: usize = 40;

/// Bound applied to merged release and queue lists.
pub const MAX_LIST_ITEMS: usize = 100;

/// Bound applied to the wide calendar window.
pub const MAX_WINDOW_ITEMS: usize = 500;

/// Character cap for stored fault messages.
pub const MAX_FAULT_MESSAGE_CHARS: usize = 100;

/// Bound on the persisted fault registry.
pub const MAX_FAULT_ENTRIES: usize = 20;

/// Truncate a title to [`MAX_TITLE_CHARS`] visible characters.
///
/// Longer titles keep their first 37 characters and gain an ellipsis, so the
/// result is exactly 40 characters; shorter titles pass through unchanged.
#[must_use]
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_owned();
    }
    let mut truncated: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Cap a fault message to [`MAX_FAULT_MESSAGE_CHARS`] characters.
#[must_use]
pub fn cap_fault_message(message: &str) -> String {
    message.chars().take(MAX_FAULT_MESSAGE_CHARS).collect()
}

/// One calendar release in a unified snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseItem {
    pub backend: BackendKind,
    pub title: String,
    pub has_file: bool,
    pub date: NaiveDate,
    pub timestamp_ms: i64,
}

/// One in-flight download in a unified snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub backend: BackendKind,
    pub title: String,
    pub status: String,
    pub size_bytes: Option<u64>,
    pub time_left: Option<String>,
}

/// Per-backend counts with a derived total.
///
/// The total is always the sum of the per-backend entries, so a summary can
/// never drift from its own breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCounts {
    per_backend: BTreeMap<BackendKind, u64>,
}

impl BackendCounts {
    /// Record the count contributed by one backend.
    pub fn set(&mut self, kind: BackendKind, count: u64) {
        self.per_backend.insert(kind, count);
    }

    /// The count for one backend; absent backends contribute zero.
    #[must_use]
    pub fn get(&self, kind: BackendKind) -> u64 {
        self.per_backend.get(&kind).copied().unwrap_or(0)
    }

    /// Sum across all recorded backends.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.per_backend.values().sum()
    }

    /// Iterate over the recorded `(backend, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (BackendKind, u64)> + '_ {
        self.per_backend.iter().map(|(kind, count)| (*kind, *count))
    }
}

/// Unified release snapshot for one aggregation cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseSnapshot {
    pub items: Vec<ReleaseItem>,
    pub counts: BackendCounts,
}

/// Unified queue snapshot for one aggregation cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub items: Vec<QueueItem>,
    pub counts: BackendCounts,
    pub paused: Vec<BackendKind>,
}

/// One health issue currently reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub backend: BackendKind,
    /// Identity used for cycle-over-cycle comparison: the wire id when
    /// present, otherwise the message text. A backend that rewords an
    /// ongoing message-identified issue will re-fire it; that is the
    /// documented behaviour, not a defect to paper over.
    pub identity: String,
    pub message: String,
    pub severity: Severity,
}

/// Condensed per-backend health shown by the dashboard views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackendHealth {
    /// Backend reachable with no significant issues.
    Ok,
    /// Backend reachable but reporting warnings.
    Warning { message: String },
    /// Backend unreachable or reporting errors.
    Error { message: String },
    /// No client registered for this backend.
    Disabled,
}

/// Health summary across every known backend kind.
pub type HealthSummary = BTreeMap<BackendKind, BackendHealth>;

/// A backend call failure recorded by the aggregation engine.
///
/// Faults exclude the backend from the current cycle's totals without
/// blocking other backends; any later success on the same backend clears
/// the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendFault {
    pub backend: BackendKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl BackendFault {
    /// Build a fault entry, capping the message length.
    #[must_use]
    pub fn new(backend: BackendKind, message: &str) -> Self {
        Self {
            backend,
            message: cap_fault_message(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_caps_at_forty_characters() {
        let long: String = "x".repeat(50);
        let truncated = truncate_title(&long);
        assert_eq!(truncated.chars().count(), 40);
        assert!(truncated.ends_with("..."));

        let exact: String = "y".repeat(40);
        assert_eq!(truncate_title(&exact), exact);

        let short = "short title";
        assert_eq!(truncate_title(short), short);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let long: String = "ü".repeat(50);
        let truncated = truncate_title(&long);
        assert_eq!(truncated.chars().count(), 40);
    }

    #[test]
    fn backend_counts_total_matches_breakdown() {
        let mut counts = BackendCounts::default();
        counts.set(BackendKind::Movies, 3);
        counts.set(BackendKind::Series, 5);
        counts.set(BackendKind::Music, 0);

        assert_eq!(counts.total(), 8);
        assert_eq!(
            counts.iter().map(|(_, count)| count).sum::<u64>(),
            counts.total()
        );
        assert_eq!(counts.get(BackendKind::Indexers), 0);
    }

    #[test]
    fn fault_messages_are_capped() {
        let long: String = "e".repeat(150);
        let fault = BackendFault::new(BackendKind::Music, &long);
        assert_eq!(fault.message.chars().count(), MAX_FAULT_MESSAGE_CHARS);
    }
}
