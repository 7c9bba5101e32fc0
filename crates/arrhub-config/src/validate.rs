//! Structural validation for hub settings.

use std::collections::HashSet;

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{BackendConfig, HubSettings};

/// Validate a settings document before it is used to build clients.
///
/// Disabled backend entries are checked for duplicates but not for
/// connectivity fields, so a half-filled entry can be kept around disabled.
///
/// # Errors
///
/// Returns the first [`ConfigError`] encountered.
pub fn validate_settings(settings: &HubSettings) -> ConfigResult<()> {
    if settings.short_cycle_secs == 0 {
        return Err(ConfigError::invalid_field(
            "hub",
            "short_cycle_secs",
            "must be positive",
        ));
    }
    if settings.long_cycle_secs == 0 {
        return Err(ConfigError::invalid_field(
            "hub",
            "long_cycle_secs",
            "must be positive",
        ));
    }
    if settings.history_page_size == 0 {
        return Err(ConfigError::invalid_field(
            "hub",
            "history_page_size",
            "must be positive",
        ));
    }

    let mut seen = HashSet::new();
    for backend in &settings.backends {
        if !seen.insert(backend.kind) {
            return Err(ConfigError::DuplicateBackend { kind: backend.kind });
        }
        if backend.enabled {
            validate_backend(backend)?;
        }
    }

    Ok(())
}

fn validate_backend(backend: &BackendConfig) -> ConfigResult<()> {
    let section = format!("backends.{}", backend.kind);

    if backend.api_key.trim().is_empty() {
        return Err(ConfigError::invalid_field(
            section,
            "api_key",
            "must not be empty",
        ));
    }

    let parsed = Url::parse(backend.base_url.trim()).map_err(|err| {
        ConfigError::invalid_field(section.clone(), "base_url", err.to_string())
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::invalid_field(
                section,
                "base_url",
                format!("unsupported scheme '{other}'"),
            ));
        }
    }

    if parsed.host_str().is_none() {
        return Err(ConfigError::invalid_field(
            section,
            "base_url",
            "missing host",
        ));
    }

    Ok(())
}
