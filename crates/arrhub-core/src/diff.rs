//! Edge detection between consecutive aggregation cycles.
//!
//! Each detector is an independent little state machine: it compares the
//! current cycle's observation against what it saw last cycle and reports
//! only the transitions. Steady state never re-fires. The detectors hold no
//! subscribers and publish nothing themselves; the hub turns their output
//! into bus events.

use std::collections::{BTreeMap, HashSet, VecDeque};

use arrhub_events::{BackendKind, MediaKind};

use crate::model::HealthIssue;
use crate::records::{HistoryRecord, IndexerRecord};

/// Bound on each event dedup ledger.
pub const LEDGER_CAPACITY: usize = 100;

/// Detects the combined queue draining to zero.
///
/// Fires exactly on the `previous > 0 && current == 0` transition; an
/// already-empty queue stays silent, as does a queue that remains empty.
#[derive(Debug, Default)]
pub struct QueueEmptyDetector {
    previous: u64,
}

impl QueueEmptyDetector {
    /// Construct with an empty-queue baseline, so the first observation
    /// never fires.
    #[must_use]
    pub const fn new() -> Self {
        Self { previous: 0 }
    }

    /// Record the current total; returns whether the queue just drained.
    pub const fn observe(&mut self, current: u64) -> bool {
        let fired = self.previous > 0 && current == 0;
        self.previous = current;
        fired
    }
}

/// Detects health issues that were absent last cycle, per backend.
#[derive(Debug, Default)]
pub struct HealthDiff {
    issues: BTreeMap<BackendKind, Vec<HealthIssue>>,
}

impl HealthDiff {
    /// Construct with no known issues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one backend's current issues; returns the newly appeared ones.
    ///
    /// Identities present in both cycles stay silent; an identity that
    /// disappears and later returns fires again. Backends whose health fetch
    /// failed must not be observed at all — their last known set is kept.
    pub fn observe(&mut self, backend: BackendKind, current: Vec<HealthIssue>) -> Vec<HealthIssue> {
        let previous: HashSet<&str> = self
            .issues
            .get(&backend)
            .map(|issues| issues.iter().map(|issue| issue.identity.as_str()).collect())
            .unwrap_or_default();

        let appeared: Vec<HealthIssue> = current
            .iter()
            .filter(|issue| !previous.contains(issue.identity.as_str()))
            .cloned()
            .collect();

        self.issues.insert(backend, current);
        appeared
    }

    /// Last observed issues across all backends, for summary building.
    #[must_use]
    pub const fn issues(&self) -> &BTreeMap<BackendKind, Vec<HealthIssue>> {
        &self.issues
    }
}

/// An indexer that just left the healthy state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerTransition {
    /// Indexer display name.
    pub name: String,
    /// Operator-facing description of the new state.
    pub message: String,
}

/// Detects per-indexer transitions out of the healthy state.
#[derive(Debug, Default)]
pub struct IndexerDiff {
    statuses: BTreeMap<String, String>,
}

impl IndexerDiff {
    /// Construct with no known indexers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the known statuses, typically from a persisted snapshot.
    pub fn hydrate(&mut self, statuses: BTreeMap<String, String>) {
        self.statuses = statuses;
    }

    /// Record the current indexer list; returns ok-to-not-ok transitions.
    ///
    /// Indexers first seen in an unhealthy state stay silent, as do
    /// unhealthy-to-unhealthy changes.
    pub fn observe(&mut self, indexers: &[IndexerRecord]) -> Vec<IndexerTransition> {
        let mut transitions = Vec::new();
        let mut current = BTreeMap::new();

        for indexer in indexers {
            let status = indexer.status_label().to_owned();
            let was_ok = self.statuses.get(&indexer.name).is_some_and(|s| s == "ok");
            if status != "ok" && was_ok {
                let message = if status == "disabled" {
                    "Indexer is disabled".to_owned()
                } else {
                    format!("Indexer status: {status}")
                };
                transitions.push(IndexerTransition {
                    name: indexer.name.clone(),
                    message,
                });
            }
            current.insert(indexer.name.clone(), status);
        }

        self.statuses = current;
        transitions
    }

    /// Current status label per indexer name.
    #[must_use]
    pub const fn statuses(&self) -> &BTreeMap<String, String> {
        &self.statuses
    }
}

/// Bounded FIFO set of already-fired event identifiers.
///
/// Persisted across restarts so a fresh process does not replay events for
/// history entries it has already announced.
#[derive(Debug, Default)]
pub struct DedupLedger {
    entries: VecDeque<String>,
    capacity: usize,
}

impl DedupLedger {
    /// Construct an empty ledger with the standard capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(LEDGER_CAPACITY)
    }

    /// Construct an empty ledger with an explicit capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild a ledger from persisted entries, keeping only the newest
    /// `capacity` of them.
    #[must_use]
    pub fn from_entries(entries: Vec<String>, capacity: usize) -> Self {
        let mut ledger = Self::with_capacity(capacity);
        for entry in entries {
            ledger.entries.push_back(entry);
            if ledger.entries.len() > capacity {
                ledger.entries.pop_front();
            }
        }
        ledger
    }

    /// Record an identifier; returns `true` when it was not yet present.
    ///
    /// Recording a new identifier evicts the oldest entry once the ledger
    /// is full.
    pub fn record(&mut self, id: &str) -> bool {
        if self.entries.iter().any(|entry| entry == id) {
            return false;
        }
        self.entries.push_back(id.to_owned());
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        true
    }

    /// Entries in insertion order, for persistence.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    /// Number of remembered identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger holds no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Event classes a single history entry can belong to.
///
/// A grabbed entry whose download client already reports completion counts
/// as both grabbed and finished, so the classes are independent flags
/// rather than an enum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryClassification {
    /// Entry announces a grabbed release.
    pub grabbed: bool,
    /// Entry announces a completed, imported download.
    pub finished: bool,
    /// Entry announces a new library item, with its media kind.
    pub added: Option<MediaKind>,
}

/// Classify one history entry by its event-type vocabulary.
#[must_use]
pub fn classify_history(record: &HistoryRecord) -> HistoryClassification {
    let event_type = record.event_type.as_deref().unwrap_or("");
    let lowered = event_type.to_ascii_lowercase();
    let data = record.data.as_ref();

    let grabbed = lowered == "grabbed"
        || data.is_some_and(|data| data.reason.as_deref() == Some("grabbed"));

    let finished = lowered == "downloadfolderimported"
        || (lowered == "grabbed"
            && data.is_some_and(|data| data.download_client.as_deref() == Some("completed")));

    let added = if lowered.contains("movieadded") {
        Some(MediaKind::Movie)
    } else if lowered.contains("seriesadded") {
        Some(MediaKind::Series)
    } else if lowered.contains("artistadded") {
        Some(MediaKind::Artist)
    } else if lowered.contains("albumadded") {
        Some(MediaKind::Album)
    } else {
        None
    };

    HistoryClassification {
        grabbed,
        finished,
        added,
    }
}

/// Media kind attached to a library-addition entry, derived from which
/// nested reference the record carries. `None` when the record carries no
/// nested reference; callers fall back to the event-type vocabulary.
#[must_use]
pub fn added_media_kind(record: &HistoryRecord) -> Option<MediaKind> {
    if record.movie.is_some() {
        Some(MediaKind::Movie)
    } else if record.series.is_some() {
        Some(MediaKind::Series)
    } else if record.artist.is_some() {
        Some(MediaKind::Artist)
    } else if record.album.is_some() {
        Some(MediaKind::Album)
    } else {
        None
    }
}

/// Dedup identity for a history-derived event.
///
/// Keyed by backend, the entry's id (falling back to its event type), and
/// its date, with an optional event-class tag so the three ledgers never
/// collide.
#[must_use]
pub fn history_identity(
    backend: BackendKind,
    record: &HistoryRecord,
    tag: Option<&str>,
) -> String {
    let entry_id = record.id.map_or_else(
        || record.event_type.clone().unwrap_or_default(),
        |id| id.to_string(),
    );
    let date = record.date.as_deref().unwrap_or("");
    match tag {
        Some(tag) => format!("{backend}_{tag}_{entry_id}_{date}"),
        None => format!("{backend}_{entry_id}_{date}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrhub_events::Severity;
    use crate::records::HistoryData;

    fn issue(backend: BackendKind, identity: &str) -> HealthIssue {
        HealthIssue {
            backend,
            identity: identity.to_owned(),
            message: format!("message for {identity}"),
            severity: Severity::Warning,
        }
    }

    #[test]
    fn queue_empty_fires_only_on_drain_transitions() {
        let mut detector = QueueEmptyDetector::new();
        let observations = [3_u64, 0, 0, 5, 0];
        let fired: Vec<bool> = observations
            .iter()
            .map(|&count| detector.observe(count))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, true]);
    }

    #[test]
    fn queue_empty_stays_silent_when_starting_empty() {
        let mut detector = QueueEmptyDetector::new();
        assert!(!detector.observe(0));
        assert!(!detector.observe(0));
    }

    #[test]
    fn health_diff_fires_once_per_persistent_issue() {
        let mut diff = HealthDiff::new();
        let backend = BackendKind::Movies;

        let first = diff.observe(backend, vec![issue(backend, "X")]);
        assert_eq!(first.len(), 1);

        // Cycles 2 and 3: same identity, no re-fire.
        assert!(diff.observe(backend, vec![issue(backend, "X")]).is_empty());
        assert!(diff.observe(backend, vec![issue(backend, "X")]).is_empty());
    }

    #[test]
    fn health_diff_refires_after_disappearance() {
        let mut diff = HealthDiff::new();
        let backend = BackendKind::Series;

        assert_eq!(diff.observe(backend, vec![issue(backend, "X")]).len(), 1);
        assert!(diff.observe(backend, vec![]).is_empty());
        assert_eq!(diff.observe(backend, vec![issue(backend, "X")]).len(), 1);
    }

    #[test]
    fn health_diff_tracks_backends_independently() {
        let mut diff = HealthDiff::new();
        assert_eq!(
            diff.observe(BackendKind::Movies, vec![issue(BackendKind::Movies, "X")])
                .len(),
            1
        );
        assert_eq!(
            diff.observe(BackendKind::Series, vec![issue(BackendKind::Series, "X")])
                .len(),
            1
        );
    }

    fn indexer(name: &str, status: Option<&str>) -> IndexerRecord {
        IndexerRecord {
            name: name.to_owned(),
            enable: None,
            status: status.map(str::to_owned),
        }
    }

    #[test]
    fn indexer_diff_fires_only_on_ok_to_down() {
        let mut diff = IndexerDiff::new();

        // First sighting healthy: nothing.
        assert!(diff.observe(&[indexer("alpha", None)]).is_empty());
        // ok -> ok: nothing.
        assert!(diff.observe(&[indexer("alpha", Some("ok"))]).is_empty());
        // ok -> down: fires once.
        let fired = diff.observe(&[indexer("alpha", Some("failing"))]);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].message, "Indexer status: failing");
        // down -> down: nothing.
        assert!(diff.observe(&[indexer("alpha", Some("failing"))]).is_empty());
        // down -> ok -> down: fires once more.
        assert!(diff.observe(&[indexer("alpha", Some("ok"))]).is_empty());
        assert_eq!(diff.observe(&[indexer("alpha", Some("failing"))]).len(), 1);
    }

    #[test]
    fn indexer_diff_ignores_newcomers_already_down() {
        let mut diff = IndexerDiff::new();
        assert!(diff.observe(&[indexer("beta", Some("disabled"))]).is_empty());
    }

    #[test]
    fn indexer_disabled_message_is_specific() {
        let mut diff = IndexerDiff::new();
        diff.observe(&[indexer("gamma", Some("ok"))]);
        let fired = diff.observe(&[indexer("gamma", Some("disabled"))]);
        assert_eq!(fired[0].message, "Indexer is disabled");
    }

    #[test]
    fn dedup_ledger_evicts_oldest_beyond_capacity() {
        let mut ledger = DedupLedger::with_capacity(3);
        assert!(ledger.record("a"));
        assert!(ledger.record("b"));
        assert!(ledger.record("c"));
        assert!(!ledger.record("b"));

        assert!(ledger.record("d"));
        assert_eq!(ledger.len(), 3);
        // "a" was evicted, so it can fire again.
        assert!(ledger.record("a"));
    }

    #[test]
    fn dedup_ledger_round_trips_through_entries() {
        let mut ledger = DedupLedger::with_capacity(10);
        ledger.record("one");
        ledger.record("two");

        let mut restored = DedupLedger::from_entries(ledger.entries(), 10);
        assert!(!restored.record("one"));
        assert!(!restored.record("two"));
        assert!(restored.record("three"));
    }

    fn history(event_type: &str) -> HistoryRecord {
        HistoryRecord {
            id: Some(11),
            event_type: Some(event_type.to_owned()),
            date: Some("2026-08-01T10:00:00Z".to_owned()),
            ..HistoryRecord::default()
        }
    }

    #[test]
    fn classification_recognises_grab_and_import_vocabulary() {
        assert!(classify_history(&history("grabbed")).grabbed);
        assert!(classify_history(&history("Grabbed")).grabbed);
        assert!(classify_history(&history("downloadFolderImported")).finished);
        assert!(classify_history(&history("DownloadFolderImported")).finished);
        assert!(!classify_history(&history("deleted")).grabbed);
    }

    #[test]
    fn grabbed_with_completed_client_counts_as_finished_too() {
        let mut record = history("grabbed");
        record.data = Some(HistoryData {
            download_client: Some("completed".to_owned()),
            reason: None,
        });
        let classes = classify_history(&record);
        assert!(classes.grabbed);
        assert!(classes.finished);
    }

    #[test]
    fn classification_maps_added_vocabulary_to_media_kinds() {
        assert_eq!(
            classify_history(&history("movieAdded")).added,
            Some(MediaKind::Movie)
        );
        assert_eq!(
            classify_history(&history("seriesAdded")).added,
            Some(MediaKind::Series)
        );
        assert_eq!(
            classify_history(&history("artistAdded")).added,
            Some(MediaKind::Artist)
        );
        assert_eq!(
            classify_history(&history("albumAdded")).added,
            Some(MediaKind::Album)
        );
        assert_eq!(classify_history(&history("grabbed")).added, None);
    }

    #[test]
    fn history_identity_composes_backend_id_and_date() {
        let record = history("grabbed");
        assert_eq!(
            history_identity(BackendKind::Music, &record, None),
            "music_11_2026-08-01T10:00:00Z"
        );
        assert_eq!(
            history_identity(BackendKind::Music, &record, Some("grab")),
            "music_grab_11_2026-08-01T10:00:00Z"
        );

        let mut without_id = history("grabbed");
        without_id.id = None;
        assert_eq!(
            history_identity(BackendKind::Movies, &without_id, None),
            "movies_grabbed_2026-08-01T10:00:00Z"
        );
    }
}
