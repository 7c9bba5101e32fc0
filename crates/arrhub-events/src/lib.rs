//! Event vocabulary and bus for the arrhub platform.
//!
//! The bus carries edge-triggered notifications produced by the snapshot diff
//! engine: automation consumers subscribe here instead of polling the hub.
//! Internally it uses `tokio::broadcast` with a bounded replay ring so a
//! consumer that reconnects can catch up on recently fired events; when the
//! ring overflows, the oldest envelopes are dropped.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};

/// Identifier assigned to each event emitted by the hub.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// The kinds of remote backend the hub can aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Movie collection manager.
    Movies,
    /// Series/episode collection manager.
    Series,
    /// Music collection manager.
    Music,
    /// Indexer manager (no library, queue, or calendar of its own).
    Indexers,
}

impl BackendKind {
    /// Every supported backend kind, in aggregation order.
    pub const ALL: [Self; 4] = [Self::Movies, Self::Series, Self::Music, Self::Indexers];

    /// Stable lowercase label used in snapshots, logs, and event payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::Series => "series",
            Self::Music => "music",
            Self::Indexers => "indexers",
        }
    }

    /// Whether this backend manages a media library.
    ///
    /// Media managers expose calendar, queue, history, missing, and library
    /// endpoints; the indexer manager exposes only indexer status.
    #[must_use]
    pub const fn is_media_manager(self) -> bool {
        !matches!(self, Self::Indexers)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to backend health issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Degraded but functional.
    Warning,
    /// Backend reported a failure condition.
    Error,
}

impl Severity {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media classification for library-addition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Series,
    Artist,
    Album,
}

impl MediaKind {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
            Self::Artist => "artist",
            Self::Album => "album",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge-triggered events surfaced to automation consumers.
///
/// Each variant fires once per detected state transition; steady state never
/// re-fires. De-duplication across process restarts is handled upstream by
/// the diff engine's ledgers, not by the bus.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A download completed and was imported by a backend.
    DownloadFinished {
        backend: BackendKind,
        title: String,
    },
    /// The combined queue across all backends drained to zero.
    QueueEmpty,
    /// A backend reported a health issue that was absent last cycle.
    HealthCheckFailed {
        backend: BackendKind,
        message: String,
        severity: Severity,
    },
    /// A new library item appeared in a backend.
    MediaAdded {
        backend: BackendKind,
        title: String,
        media_kind: MediaKind,
    },
    /// A backend grabbed a release for download.
    ReleaseGrabbed {
        backend: BackendKind,
        title: String,
    },
    /// An indexer transitioned from healthy to unhealthy.
    IndexerIssue {
        indexer: String,
        message: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for subscribers and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Event::DownloadFinished { .. } => "download_finished",
            Event::QueueEmpty => "queue_empty",
            Event::HealthCheckFailed { .. } => "health_check_failed",
            Event::MediaAdded { .. } => "media_added",
            Event::ReleaseGrabbed { .. } => "release_grabbed",
            Event::IndexerIssue { .. } => "indexer_issue",
        }
    }
}

/// Metadata wrapper around events: sequential id plus emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    ring: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided capacity.
    ///
    /// The broadcast channel shares the capacity of the replay ring so both
    /// structures drop the same events under overflow.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default replay ring size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish an event, assigning it the next sequential identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay ring mutex has been poisoned.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut ring = self.ring.lock().expect("event ring mutex poisoned");
            if ring.len() == self.replay_capacity {
                ring.pop_front();
            }
            ring.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe, replaying any buffered events newer than `since_id`.
    ///
    /// # Panics
    ///
    /// Panics if the replay ring mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let ring = self.ring.lock().expect("event ring mutex poisoned");
            for item in ring.iter() {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// The most recently assigned identifier, if any events were published.
    ///
    /// # Panics
    ///
    /// Panics if the replay ring mutex has been poisoned.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let ring = self.ring.lock().expect("event ring mutex poisoned");
        ring.back().map(|event| event.id)
    }

    /// Buffered envelopes newer than `since_id`, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the replay ring mutex has been poisoned.
    #[must_use]
    pub fn replay(&self, since_id: Option<EventId>) -> Vec<EventEnvelope> {
        let since = since_id.unwrap_or(0);
        let ring = self.ring.lock().expect("event ring mutex poisoned");
        ring.iter()
            .filter(|item| item.id > since)
            .cloned()
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream yielding replayed envelopes first, then live broadcasts.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, draining the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grab_event(n: usize) -> Event {
        Event::ReleaseGrabbed {
            backend: BackendKind::Movies,
            title: format!("title-{n}"),
        }
    }

    #[test]
    fn backend_kind_labels_are_stable() {
        assert_eq!(BackendKind::Movies.as_str(), "movies");
        assert_eq!(BackendKind::Indexers.to_string(), "indexers");
        assert!(BackendKind::Music.is_media_manager());
        assert!(!BackendKind::Indexers.is_media_manager());
    }

    #[test]
    fn event_kind_matches_variant() {
        assert_eq!(Event::QueueEmpty.kind(), "queue_empty");
        let health = Event::HealthCheckFailed {
            backend: BackendKind::Series,
            message: "disk space low".into(),
            severity: Severity::Warning,
        };
        assert_eq!(health.kind(), "health_check_failed");
    }

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(grab_event(i));
        }
        assert_eq!(last_id, 5);

        let mut stream = bus.subscribe(Some(2));
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(event) = stream.next().await {
                received.push(event);
            }
        }

        assert_eq!(received.len(), 3);
        assert_eq!(received.first().map(|e| e.id), Some(3));
        assert_eq!(received.last().map(|e| e.id), Some(5));
    }

    #[tokio::test]
    async fn replay_ring_drops_oldest_on_overflow() {
        let bus = EventBus::with_capacity(4);
        for i in 0..6 {
            bus.publish(grab_event(i));
        }

        // Ids 1 and 2 were evicted; replay starts at 3.
        let mut stream = bus.subscribe(Some(0));
        let first = stream.next().await.map(|e| e.id);
        assert_eq!(first, Some(3));
        assert_eq!(bus.last_event_id(), Some(6));

        let replayed = bus.replay(None);
        assert_eq!(replayed.len(), 4);
        assert_eq!(bus.replay(Some(5)).len(), 1);
    }

    #[tokio::test]
    async fn live_subscription_sees_later_events() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe(None);

        bus.publish(Event::QueueEmpty);
        let envelope = stream.next().await.expect("live event");
        assert_eq!(envelope.event, Event::QueueEmpty);
    }
}
