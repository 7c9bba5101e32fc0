//! Wire-facing records returned by backend service implementations.
//!
//! The remote APIs are duck-typed: the same endpoint nests its title under a
//! different key per media kind, and several fields come and go between
//! backend generations. These records keep every known variant optional and
//! let the resolution tables in [`crate::titles`] pick the right one.

use serde::{Deserialize, Serialize};

use crate::titles::TitleFields;

/// Nested reference carrying a plain `title`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TitledRef {
    pub id: Option<i64>,
    pub title: Option<String>,
}

/// Nested artist reference; artists carry `artistName` instead of `title`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtistRef {
    pub id: Option<i64>,
    pub artist_name: Option<String>,
}

/// One calendar entry as returned by a backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarRecord {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub series: Option<TitledRef>,
    pub movie: Option<TitledRef>,
    pub album: Option<TitledRef>,
    pub artist: Option<ArtistRef>,
    pub source_title: Option<String>,
    pub has_file: bool,
    pub air_date: Option<String>,
    pub release_date: Option<String>,
    pub release_date_utc: Option<String>,
    pub in_cinemas: Option<String>,
    pub physical_release: Option<String>,
    pub digital_release: Option<String>,
}

impl CalendarRecord {
    /// First populated release-date field, in the order the backends agree on.
    #[must_use]
    pub fn release_date_value(&self) -> Option<&str> {
        [
            &self.air_date,
            &self.release_date,
            &self.release_date_utc,
            &self.in_cinemas,
            &self.physical_release,
            &self.digital_release,
        ]
        .into_iter()
        .find_map(|field| field.as_deref())
        .filter(|value| !value.is_empty())
    }

    /// Flatten into the shared title-resolution view.
    #[must_use]
    pub fn title_fields(&self) -> TitleFields<'_> {
        TitleFields {
            title: self.title.as_deref(),
            series_title: self.series.as_ref().and_then(|r| r.title.as_deref()),
            movie_title: self.movie.as_ref().and_then(|r| r.title.as_deref()),
            album_title: self.album.as_ref().and_then(|r| r.title.as_deref()),
            artist_name: self.artist.as_ref().and_then(|r| r.artist_name.as_deref()),
            source_title: self.source_title.as_deref(),
            ..TitleFields::default()
        }
    }
}

/// One in-flight download as returned by a backend queue endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueRecord {
    pub id: Option<i64>,
    pub queue_id: Option<i64>,
    pub download_id: Option<String>,
    pub tracked_download_id: Option<String>,
    pub title: Option<String>,
    pub series: Option<TitledRef>,
    pub movie: Option<TitledRef>,
    pub artist: Option<ArtistRef>,
    pub source_title: Option<String>,
    pub status: Option<String>,
    pub tracked_download_status: Option<String>,
    pub size: Option<f64>,
    pub sizeleft: Option<f64>,
    pub timeleft: Option<String>,
    pub estimated_completion_time: Option<String>,
}

impl QueueRecord {
    /// Stable identity for removal commands: first populated identifier.
    #[must_use]
    pub fn identity(&self) -> String {
        if let Some(id) = self.id {
            return id.to_string();
        }
        if let Some(id) = self.queue_id {
            return id.to_string();
        }
        self.download_id
            .clone()
            .or_else(|| self.tracked_download_id.clone())
            .unwrap_or_default()
    }

    /// Free-text status, falling back through the tracked-download field.
    #[must_use]
    pub fn status_label(&self) -> &str {
        self.status
            .as_deref()
            .or(self.tracked_download_status.as_deref())
            .unwrap_or("queued")
    }

    /// Remaining or total size in bytes, whichever the backend reported.
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        self.size
            .or(self.sizeleft)
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value.round() as u64)
    }

    /// Remaining-time text, falling back to the completion estimate.
    #[must_use]
    pub fn time_left(&self) -> Option<&str> {
        self.timeleft
            .as_deref()
            .or(self.estimated_completion_time.as_deref())
    }

    /// Flatten into the shared title-resolution view.
    #[must_use]
    pub fn title_fields(&self) -> TitleFields<'_> {
        TitleFields {
            title: self.title.as_deref(),
            series_title: self.series.as_ref().and_then(|r| r.title.as_deref()),
            movie_title: self.movie.as_ref().and_then(|r| r.title.as_deref()),
            artist_name: self.artist.as_ref().and_then(|r| r.artist_name.as_deref()),
            source_title: self.source_title.as_deref(),
            ..TitleFields::default()
        }
    }
}

/// Pause state reported by the queue status endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueStatusRecord {
    pub is_paused: bool,
}

/// One history entry as returned by a backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryRecord {
    pub id: Option<i64>,
    pub event_type: Option<String>,
    pub date: Option<String>,
    pub title: Option<String>,
    pub source_title: Option<String>,
    pub series: Option<TitledRef>,
    pub episode: Option<TitledRef>,
    pub movie: Option<TitledRef>,
    pub artist: Option<ArtistRef>,
    pub album: Option<TitledRef>,
    pub data: Option<HistoryData>,
}

/// Kind-specific metadata attached to history entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryData {
    pub download_client: Option<String>,
    pub reason: Option<String>,
}

impl HistoryRecord {
    /// Flatten into the shared title-resolution view.
    #[must_use]
    pub fn title_fields(&self) -> TitleFields<'_> {
        TitleFields {
            title: self.title.as_deref(),
            series_title: self.series.as_ref().and_then(|r| r.title.as_deref()),
            episode_title: self.episode.as_ref().and_then(|r| r.title.as_deref()),
            movie_title: self.movie.as_ref().and_then(|r| r.title.as_deref()),
            album_title: self.album.as_ref().and_then(|r| r.title.as_deref()),
            artist_name: self.artist.as_ref().and_then(|r| r.artist_name.as_deref()),
            source_title: self.source_title.as_deref(),
        }
    }
}

/// One health entry as returned by a backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthRecord {
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
}

impl HealthRecord {
    /// Identity used for cycle-over-cycle comparison: id when present,
    /// otherwise the message text.
    #[must_use]
    pub fn identity(&self) -> String {
        if let Some(id) = self.id {
            return id.to_string();
        }
        self.message
            .clone()
            .or_else(|| self.source.clone())
            .unwrap_or_default()
    }
}

/// Release-date fields a missing item may carry, across all media kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissingDates {
    pub release_date: Option<String>,
    pub in_cinemas_date: Option<String>,
    pub digital_release_date: Option<String>,
    pub air_date: Option<String>,
    pub air_date_utc: Option<String>,
}

/// One wanted/missing entry as returned by a backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissingRecord {
    pub id: Option<i64>,
    pub movie: Option<MissingDates>,
    pub episode: Option<MissingDates>,
    pub album: Option<MissingDates>,
}

/// Filtered missing count plus the raw server-side total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPage {
    /// Items whose release date is today or earlier (or everything, when
    /// future items were requested).
    pub count: u64,
    /// Unfiltered total reported by the backend.
    pub total_records: u64,
}

/// One indexer entry as returned by the indexer manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexerRecord {
    pub name: String,
    pub enable: Option<bool>,
    pub status: Option<String>,
}

impl IndexerRecord {
    /// Healthy-state label; absence of a status means healthy.
    #[must_use]
    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("ok")
    }

    /// Whether this indexer counts as down: explicitly disabled or any
    /// non-healthy status.
    #[must_use]
    pub fn is_down(&self) -> bool {
        self.enable == Some(false) || self.status_label() != "ok"
    }
}

/// One lookup result from a title search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupRecord {
    pub id: Option<i64>,
    pub movie_id: Option<i64>,
    pub series_id: Option<i64>,
    pub artist_id: Option<i64>,
    pub title: Option<String>,
}

impl LookupRecord {
    /// First populated identifier usable for item updates.
    #[must_use]
    pub const fn item_id(&self) -> Option<i64> {
        match (self.id, self.movie_id, self.series_id, self.artist_id) {
            (Some(id), ..) => Some(id),
            (None, Some(id), ..) => Some(id),
            (None, None, Some(id), _) => Some(id),
            (None, None, None, maybe) => maybe,
        }
    }
}

/// Connectivity probe response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemStatus {
    pub app_name: Option<String>,
    pub version: Option<String>,
}
