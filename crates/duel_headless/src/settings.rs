//! Match settings files.
//!
//! Settings are plain JSON renderings of [`MatchConfig`]. Every field is
//! optional and falls back to its built-in default, so a file only needs
//! to name what it changes:
//!
//! ```json
//! { "timeout": 30.0, "dash": { "crit_multiplier": 1.0 } }
//! ```
//!
//! Files are parsed and validated before any match starts; an explicitly
//! given path that cannot be read or parsed is an error, never a silent
//! fallback.

use std::fs;
use std::path::Path;

use duel_core::config::MatchConfig;
use duel_core::error::DuelError;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from reading or validating a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("failed to read settings file '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid settings JSON.
    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        /// Path that failed.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The parsed settings violate a configuration invariant.
    #[error(transparent)]
    Invalid(#[from] DuelError),
}

/// Load match settings, falling back to the built-in defaults when no
/// path is given.
pub fn load_settings(path: Option<&Path>) -> Result<MatchConfig, SettingsError> {
    let Some(path) = path else {
        debug!("no settings file given, using defaults");
        return Ok(MatchConfig::default());
    };

    let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: MatchConfig =
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    config.validate()?;

    info!(path = %path.display(), "loaded match settings");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_settings(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_no_path_gives_defaults() {
        let config = load_settings(None).unwrap();
        assert_eq!(config, MatchConfig::default());
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let (_dir, path) = write_settings(r#"{ "timeout": 30.0, "arena": { "width": 800.0 } }"#);
        let config = load_settings(Some(&path)).unwrap();
        assert_eq!(config.timeout.0, 30.0);
        assert_eq!(config.arena.width, 800.0);
        assert_eq!(config.arena.height, 1920.0);
        assert_eq!(config.dash.speed, 800.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/settings.json"))).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let (_dir, path) = write_settings("{ not json");
        let err = load_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation_naming_the_field() {
        let (_dir, path) = write_settings(r#"{ "dash": { "crit_multiplier": 5.0 } }"#);
        let err = load_settings(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("crit_multiplier"));
    }
}
