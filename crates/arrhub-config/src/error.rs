//! Error types for settings loading and validation.

use std::io;
use std::path::PathBuf;

use arrhub_events::BackendKind;
use thiserror::Error;

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Structured errors emitted while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings file")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// The settings file was not valid YAML for the expected schema.
    #[error("failed to parse settings file")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying deserialization failure.
        #[source]
        source: serde_yaml::Error,
    },
    /// A field contained an invalid value.
    #[error("invalid value for '{field}' in '{section}': {message}")]
    InvalidField {
        /// Section that failed validation.
        section: String,
        /// Field that failed validation.
        field: String,
        /// Human-readable error description.
        message: String,
    },
    /// Two entries configure the same backend kind.
    #[error("backend '{kind}' is configured more than once")]
    DuplicateBackend {
        /// The duplicated kind.
        kind: BackendKind,
    },
}

impl ConfigError {
    pub(crate) fn invalid_field(
        section: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            section: section.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}
