//! Settings file loading.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::model::HubSettings;
use crate::validate::validate_settings;

/// Load and validate hub settings from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] when the file cannot be read,
/// [`ConfigError::Parse`] for malformed documents, and validation errors for
/// structurally invalid settings.
pub fn load_settings(path: impl AsRef<Path>) -> ConfigResult<HubSettings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let settings: HubSettings =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    validate_settings(&settings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_valid_settings_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "backends:\n  - kind: series\n    base_url: http://series.local\n    api_key: abc\nshort_cycle_secs: 60"
        )
        .expect("write settings");

        let settings = load_settings(file.path()).expect("settings should load");
        assert_eq!(settings.backends.len(), 1);
        assert_eq!(settings.short_cycle_secs, 60);
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = load_settings("/nonexistent/arrhub.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_document_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "backends: {{ not valid").expect("write settings");

        let err = load_settings(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
