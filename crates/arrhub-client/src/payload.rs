//! Wire-shape tolerance and client-side filtering helpers.
//!
//! List endpoints answer either with a bare JSON array or with a paged
//! `{records: [...], totalRecords: n}` envelope depending on the backend
//! generation; both shapes decode through [`Paged`].

use arrhub_events::BackendKind;
use chrono::NaiveDate;
use serde::Deserialize;

use arrhub_core::records::MissingRecord;

/// Array-or-envelope tolerant wrapper for list endpoints.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Paged<T> {
    Page {
        #[serde(default = "Vec::new")]
        records: Vec<T>,
        #[serde(rename = "totalRecords")]
        total_records: Option<u64>,
    },
    List(Vec<T>),
}

impl<T> Paged<T> {
    /// The contained records, whichever shape arrived.
    pub(crate) fn into_records(self) -> Vec<T> {
        match self {
            Self::Page { records, .. } => records,
            Self::List(records) => records,
        }
    }

    /// Server-side total when the envelope carried one.
    pub(crate) const fn total_records(&self) -> Option<u64> {
        match self {
            Self::Page { total_records, .. } => *total_records,
            Self::List(_) => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Page { records, .. } => records.len(),
            Self::List(records) => records.len(),
        }
    }
}

impl<T> Default for Paged<T> {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// Array-or-envelope tolerant wrapper for the primary collection endpoint,
/// where only the count matters.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Collection {
    List(Vec<serde_json::Value>),
    Page {
        #[serde(rename = "totalRecords")]
        total_records: Option<u64>,
        #[serde(default = "Vec::new")]
        records: Vec<serde_json::Value>,
    },
}

impl Collection {
    /// Item count, whichever shape arrived.
    pub(crate) fn count(&self) -> u64 {
        match self {
            Self::List(items) => items.len() as u64,
            Self::Page {
                total_records,
                records,
            } => total_records.unwrap_or(records.len() as u64),
        }
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// Count missing items whose release date is `today` or earlier.
///
/// Items without a resolvable release date are excluded: an undated item
/// cannot be overdue.
pub(crate) fn count_past_releases(
    kind: BackendKind,
    records: &[MissingRecord],
    today: NaiveDate,
) -> u64 {
    records
        .iter()
        .filter(|record| {
            missing_release_date(kind, record).is_some_and(|date| date <= today)
        })
        .count() as u64
}

/// The kind-specific release date of a missing item.
fn missing_release_date(kind: BackendKind, record: &MissingRecord) -> Option<NaiveDate> {
    let value = match kind {
        BackendKind::Movies => {
            let dates = record.movie.as_ref()?;
            dates
                .release_date
                .as_deref()
                .or(dates.in_cinemas_date.as_deref())
                .or(dates.digital_release_date.as_deref())
        }
        BackendKind::Series => {
            let dates = record.episode.as_ref()?;
            dates.air_date.as_deref().or(dates.air_date_utc.as_deref())
        }
        BackendKind::Music => record.album.as_ref()?.release_date.as_deref(),
        BackendKind::Indexers => None,
    };
    value.and_then(parse_date_prefix)
}

/// Parse the `YYYY-MM-DD` prefix of a date or timestamp string.
pub(crate) fn parse_date_prefix(value: &str) -> Option<NaiveDate> {
    let prefix = value.get(0..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
