//! Per-kind wire routing: API generations, endpoint paths, and command
//! vocabulary.
//!
//! Two wire-format generations exist side by side; the kind decides which
//! one a client speaks, so version checks never leak into call sites.

use arrhub_events::BackendKind;

/// Wire-format generation spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiVersion {
    V1,
    V3,
}

impl ApiVersion {
    /// The generation a backend kind speaks.
    pub(crate) const fn for_kind(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Music | BackendKind::Indexers => Self::V1,
            BackendKind::Movies | BackendKind::Series => Self::V3,
        }
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V3 => "v3",
        }
    }

    /// Whether this generation gets one controlled retry on 5xx responses.
    pub(crate) const fn retries_server_errors(self) -> bool {
        matches!(self, Self::V1)
    }
}

/// Primary command name plus an optional fallback tried when the backend
/// rejects the primary with a 400.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CommandPlan {
    pub(crate) primary: &'static str,
    pub(crate) fallback: Option<&'static str>,
}

/// Pause command per kind. The music manager prefers the download-client
/// variant but older releases only accept the plain command.
pub(crate) const fn pause_plan(kind: BackendKind) -> CommandPlan {
    match kind {
        BackendKind::Music => CommandPlan {
            primary: "PauseDownloadClient",
            fallback: Some("Pause"),
        },
        _ => CommandPlan {
            primary: "Pause",
            fallback: None,
        },
    }
}

/// Resume command per kind, mirroring [`pause_plan`].
pub(crate) const fn resume_plan(kind: BackendKind) -> CommandPlan {
    match kind {
        BackendKind::Music => CommandPlan {
            primary: "ResumeDownloadClient",
            fallback: Some("Resume"),
        },
        _ => CommandPlan {
            primary: "Resume",
            fallback: None,
        },
    }
}

/// Missing-search command per kind.
pub(crate) const fn missing_search_command(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Series => "MissingEpisodeSearch",
        BackendKind::Music => "MissingAlbumSearch",
        BackendKind::Movies | BackendKind::Indexers => "MissingMoviesSearch",
    }
}

/// Lookup-by-term endpoint per kind.
pub(crate) const fn lookup_path(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Series => "/series/lookup",
        BackendKind::Music => "/artist/lookup",
        BackendKind::Movies | BackendKind::Indexers => "/movie/lookup",
    }
}

/// Primary collection endpoint per kind, also used for item-by-id access.
pub(crate) const fn item_path(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Series => "/series",
        BackendKind::Music => "/artist",
        BackendKind::Movies | BackendKind::Indexers => "/movie",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_selects_api_generation() {
        assert_eq!(ApiVersion::for_kind(BackendKind::Movies), ApiVersion::V3);
        assert_eq!(ApiVersion::for_kind(BackendKind::Series), ApiVersion::V3);
        assert_eq!(ApiVersion::for_kind(BackendKind::Music), ApiVersion::V1);
        assert_eq!(ApiVersion::for_kind(BackendKind::Indexers), ApiVersion::V1);
    }

    #[test]
    fn only_the_music_manager_has_pause_fallbacks() {
        assert_eq!(pause_plan(BackendKind::Music).fallback, Some("Pause"));
        assert!(pause_plan(BackendKind::Movies).fallback.is_none());
        assert_eq!(resume_plan(BackendKind::Music).primary, "ResumeDownloadClient");
    }

    #[test]
    fn only_v1_retries_server_errors() {
        assert!(ApiVersion::V1.retries_server_errors());
        assert!(!ApiVersion::V3.retries_server_errors());
    }
}
