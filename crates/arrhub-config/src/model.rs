//! Settings types for the hub and its backends.
//!
//! # Design
//! - Pure data carriers deserialized from the settings file.
//! - Defaults match the conventional ports and cadences of the supported
//!   backends so a minimal file only needs URLs and API keys.

use std::time::Duration;

use arrhub_events::BackendKind;
use serde::{Deserialize, Serialize};

/// Default short polling cadence: releases, queue, history-derived events.
pub(crate) const DEFAULT_SHORT_CYCLE_SECS: u64 = 300;

/// Default long polling cadence: health, missing, library, indexer status.
pub(crate) const DEFAULT_LONG_CYCLE_SECS: u64 = 900;

/// Default number of history entries scanned per backend per cycle.
pub(crate) const DEFAULT_HISTORY_PAGE_SIZE: u32 = 20;

/// Conventional default port for a backend kind.
#[must_use]
pub const fn default_port(kind: BackendKind) -> u16 {
    match kind {
        BackendKind::Movies => 7878,
        BackendKind::Series => 8989,
        BackendKind::Music => 8686,
        BackendKind::Indexers => 9696,
    }
}

/// Connection settings for one remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Which backend this entry configures.
    pub kind: BackendKind,
    /// Base URL, scheme and host required; may embed a port or path prefix.
    pub base_url: String,
    /// Explicit port; ignored when the base URL embeds one. `None` falls
    /// back to the kind's conventional port.
    #[serde(default)]
    pub port: Option<u16>,
    /// API key sent with every request. Never logged.
    pub api_key: String,
    /// Disabled backends are skipped by every polling loop.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl BackendConfig {
    /// The port to use when the base URL does not embed one.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| default_port(self.kind))
    }
}

/// Top-level hub settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubSettings {
    /// Backend connection entries. At most one per kind.
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
    /// Short cycle cadence in seconds.
    #[serde(default = "default_short_cycle")]
    pub short_cycle_secs: u64,
    /// Long cycle cadence in seconds.
    #[serde(default = "default_long_cycle")]
    pub long_cycle_secs: u64,
    /// When set, interval polling is skipped entirely; cycles run only on
    /// explicit refresh commands.
    #[serde(default)]
    pub manual_refresh_only: bool,
    /// History entries fetched per backend when scanning for events.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
}

impl HubSettings {
    /// Short cycle cadence as a [`Duration`].
    #[must_use]
    pub const fn short_cycle(&self) -> Duration {
        Duration::from_secs(self.short_cycle_secs)
    }

    /// Long cycle cadence as a [`Duration`].
    #[must_use]
    pub const fn long_cycle(&self) -> Duration {
        Duration::from_secs(self.long_cycle_secs)
    }

    /// Iterate over the enabled backend entries.
    pub fn enabled_backends(&self) -> impl Iterator<Item = &BackendConfig> {
        self.backends.iter().filter(|backend| backend.enabled)
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            backends: Vec::new(),
            short_cycle_secs: DEFAULT_SHORT_CYCLE_SECS,
            long_cycle_secs: DEFAULT_LONG_CYCLE_SECS,
            manual_refresh_only: false,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_short_cycle() -> u64 {
    DEFAULT_SHORT_CYCLE_SECS
}

const fn default_long_cycle() -> u64 {
    DEFAULT_LONG_CYCLE_SECS
}

const fn default_history_page_size() -> u32 {
    DEFAULT_HISTORY_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let yaml = r"
backends:
  - kind: movies
    base_url: http://movies.local
    api_key: secret
";
        let settings: HubSettings = serde_yaml::from_str(yaml).expect("valid settings");
        assert_eq!(settings.short_cycle(), Duration::from_secs(300));
        assert_eq!(settings.long_cycle(), Duration::from_secs(900));
        assert!(!settings.manual_refresh_only);
        assert_eq!(settings.history_page_size, 20);

        let backend = &settings.backends[0];
        assert!(backend.enabled);
        assert_eq!(backend.effective_port(), 7878);
    }

    #[test]
    fn explicit_port_wins_over_convention() {
        let backend = BackendConfig {
            kind: BackendKind::Series,
            base_url: "http://series.local".into(),
            port: Some(9090),
            api_key: "secret".into(),
            enabled: true,
        };
        assert_eq!(backend.effective_port(), 9090);
    }

    #[test]
    fn enabled_backends_skips_disabled_entries() {
        let settings = HubSettings {
            backends: vec![
                BackendConfig {
                    kind: BackendKind::Movies,
                    base_url: "http://movies.local".into(),
                    port: None,
                    api_key: "secret".into(),
                    enabled: false,
                },
                BackendConfig {
                    kind: BackendKind::Indexers,
                    base_url: "http://indexers.local".into(),
                    port: None,
                    api_key: "secret".into(),
                    enabled: true,
                },
            ],
            ..HubSettings::default()
        };

        let enabled: Vec<_> = settings.enabled_backends().map(|b| b.kind).collect();
        assert_eq!(enabled, vec![BackendKind::Indexers]);
    }
}
