//! Table-driven title resolution across heterogeneous backend records.
//!
//! Each media kind nests its display title under a different wire field. The
//! tables below are ordered extractor lists tried in sequence; the first
//! non-empty result wins, with a fixed placeholder as the final fallback.

use arrhub_events::BackendKind;

/// Placeholder used when no extractor produces a title.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Flattened view over the title-bearing fields of any backend record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleFields<'a> {
    pub title: Option<&'a str>,
    pub series_title: Option<&'a str>,
    pub episode_title: Option<&'a str>,
    pub movie_title: Option<&'a str>,
    pub album_title: Option<&'a str>,
    pub artist_name: Option<&'a str>,
    pub source_title: Option<&'a str>,
}

/// One attempt at producing a title from a record view.
pub type Extractor = fn(&TitleFields<'_>) -> Option<String>;

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn direct(fields: &TitleFields<'_>) -> Option<String> {
    non_empty(fields.title)
}

fn series(fields: &TitleFields<'_>) -> Option<String> {
    non_empty(fields.series_title)
}

fn movie(fields: &TitleFields<'_>) -> Option<String> {
    non_empty(fields.movie_title)
}

fn album(fields: &TitleFields<'_>) -> Option<String> {
    non_empty(fields.album_title)
}

fn artist(fields: &TitleFields<'_>) -> Option<String> {
    non_empty(fields.artist_name)
}

fn source(fields: &TitleFields<'_>) -> Option<String> {
    non_empty(fields.source_title)
}

/// "Series - Episode" composite; the episode part is optional.
fn series_episode(fields: &TitleFields<'_>) -> Option<String> {
    let series = non_empty(fields.series_title)?;
    match non_empty(fields.episode_title) {
        Some(episode) => Some(format!("{series} - {episode}")),
        None => Some(series),
    }
}

/// "Artist - Album" composite; the album part is optional.
fn artist_album(fields: &TitleFields<'_>) -> Option<String> {
    let artist = non_empty(fields.artist_name)?;
    match non_empty(fields.album_title) {
        Some(album) => Some(format!("{artist} - {album}")),
        None => Some(artist),
    }
}

/// Extractor order for calendar entries of the given backend kind.
#[must_use]
pub fn calendar_extractors(kind: BackendKind) -> &'static [Extractor] {
    match kind {
        BackendKind::Movies => &[direct, movie, source],
        BackendKind::Series => &[direct, series, source],
        BackendKind::Music => &[direct, album, artist, source],
        BackendKind::Indexers => &[direct, source],
    }
}

/// Extractor order for queue entries of the given backend kind.
#[must_use]
pub fn queue_extractors(kind: BackendKind) -> &'static [Extractor] {
    match kind {
        BackendKind::Movies => &[direct, movie, source],
        BackendKind::Series => &[direct, series, source],
        BackendKind::Music => &[direct, artist, source],
        BackendKind::Indexers => &[direct, source],
    }
}

/// Extractor order for history entries of the given backend kind.
///
/// Unlike calendar resolution, nested composites win over the entry's own
/// `title`: history titles describe the release file, not the media item.
#[must_use]
pub fn history_extractors(kind: BackendKind) -> &'static [Extractor] {
    match kind {
        BackendKind::Movies => &[movie, source, direct],
        BackendKind::Series => &[series_episode, source, direct],
        BackendKind::Music => &[artist_album, source, direct],
        BackendKind::Indexers => &[source, direct],
    }
}

/// Extractor order for library-addition events, kind-independent.
#[must_use]
pub fn added_extractors() -> &'static [Extractor] {
    &[movie, series, artist, album, source, direct]
}

/// Try each extractor in order; fall back to [`UNKNOWN_TITLE`].
#[must_use]
pub fn resolve_title(extractors: &[Extractor], fields: &TitleFields<'_>) -> String {
    extractors
        .iter()
        .find_map(|extract| extract(fields))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_owned())
}
