//! Codec configuration
//!
//! One `CodecConfig` is built at startup and passed to every serializer and
//! sorter that needs it. There is no process-wide default instance.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event};

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "QUARRY_CONFIG_INVALID"
    }
}

/// Limits and sorter settings shared by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Deepest record/array nesting a tagged decode accepts (default: 128)
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Largest string, binary or count prefix accepted on read (default: 1 GiB)
    #[serde(default = "default_max_length_prefix")]
    pub max_length_prefix: u64,

    /// Initial sorter buffer capacity in bytes (default: 64 KiB)
    #[serde(default = "default_sort_buffer_initial_capacity")]
    pub sort_buffer_initial_capacity: usize,

    /// Hard cap on the sorter buffer (default: 2 GiB)
    #[serde(default = "default_sort_buffer_max_bytes")]
    pub sort_buffer_max_bytes: u64,

    /// Emit structured log lines from the sorter (default: true)
    #[serde(default = "default_log_events")]
    pub log_events: bool,
}

fn default_max_nesting_depth() -> usize {
    128
}

fn default_max_length_prefix() -> u64 {
    1 << 30
}

fn default_sort_buffer_initial_capacity() -> usize {
    64 * 1024
}

fn default_sort_buffer_max_bytes() -> u64 {
    2 << 30
}

fn default_log_events() -> bool {
    true
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: default_max_nesting_depth(),
            max_length_prefix: default_max_length_prefix(),
            sort_buffer_initial_capacity: default_sort_buffer_initial_capacity(),
            sort_buffer_max_bytes: default_sort_buffer_max_bytes(),
            log_events: default_log_events(),
        }
    }
}

impl CodecConfig {
    /// Loads and validates a JSON configuration file. Missing keys take
    /// their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;
        if config.log_events {
            let path = path.display().to_string();
            log_event_with_fields(Event::ConfigLoaded, &[("path", path.as_str())]);
        }
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: CodecConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Same settings with logging turned off.
    pub fn quiet(self) -> Self {
        Self {
            log_events: false,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Invalid("max_nesting_depth must be > 0".into()));
        }
        if self.max_length_prefix == 0 {
            return Err(ConfigError::Invalid("max_length_prefix must be > 0".into()));
        }
        if self.sort_buffer_max_bytes == 0 {
            return Err(ConfigError::Invalid("sort_buffer_max_bytes must be > 0".into()));
        }
        if self.sort_buffer_initial_capacity as u64 > self.sort_buffer_max_bytes {
            return Err(ConfigError::Invalid(format!(
                "sort_buffer_initial_capacity ({}) exceeds sort_buffer_max_bytes ({})",
                self.sort_buffer_initial_capacity, self.sort_buffer_max_bytes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.max_nesting_depth, 128);
        assert_eq!(config.max_length_prefix, 1 << 30);
        assert_eq!(config.sort_buffer_initial_capacity, 65_536);
        assert_eq!(config.sort_buffer_max_bytes, 2 * 1024 * 1024 * 1024);
        assert!(config.log_events);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = CodecConfig::from_json_str(r#"{"max_nesting_depth": 8}"#).unwrap();
        assert_eq!(config.max_nesting_depth, 8);
        assert_eq!(config.max_length_prefix, 1 << 30);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = CodecConfig::from_json_str(r#"{"max_nesting_depth": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CodecConfig::from_json_str(
            r#"{"sort_buffer_initial_capacity": 100, "sort_buffer_max_bytes": 10}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_bad_json() {
        let err = CodecConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(err.code(), "QUARRY_CONFIG_INVALID");
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codec.json");
        fs::write(
            &path,
            r#"{"log_events": false, "sort_buffer_initial_capacity": 1024, "sort_buffer_max_bytes": 4096}"#,
        )
        .unwrap();

        let config = CodecConfig::from_json_file(&path).unwrap();
        assert!(!config.log_events);
        assert_eq!(config.sort_buffer_max_bytes, 4096);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = CodecConfig::from_json_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
