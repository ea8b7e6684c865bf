//! Configuration module for Mirrorlake.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults. The persistence backend is
//! selected here once at startup and never probed per call.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for Mirrorlake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

/// Which persistence backend holds the cached mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Embedded SQLite database (desktop/native case).
    Sqlite,
    /// Key-value/JSON store (browser-local case, also used headless).
    Store,
}

/// Cache and persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Persistence backend, chosen once at startup.
    pub backend: CacheBackend,
    /// Whether reads go through the cache at all. When `false` the query
    /// layer bypasses the cache entirely and always fetches remotely.
    pub enabled: bool,
    /// Path to the SQLite database file (`backend = sqlite`).
    pub db_path: PathBuf,
    /// Path to the JSON store file (`backend = store`).
    pub store_path: PathBuf,
}

/// Search debouncing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Debounce window for per-bucket object search, in milliseconds.
    pub object_debounce_ms: u64,
    /// Debounce window for cross-bucket/global search, in milliseconds.
    pub global_debounce_ms: u64,
    /// Queries shorter than this return empty without touching storage.
    pub min_query_len: usize,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/mirrorlake/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("mirrorlake")
            .join("config.yaml")
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("mirrorlake")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Sqlite,
            enabled: true,
            db_path: data_dir().join("mirrorlake.db"),
            store_path: data_dir().join("mirrorlake-store.json"),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            object_debounce_ms: 500,
            global_debounce_ms: 300,
            min_query_len: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"search.min_query_len"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.search.object_debounce_ms == 0 {
            errors.push(ValidationError {
                field: "search.object_debounce_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.search.global_debounce_ms == 0 {
            errors.push(ValidationError {
                field: "search.global_debounce_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.search.min_query_len == 0 {
            errors.push(ValidationError {
                field: "search.min_query_len".into(),
                message: "must be at least 1".into(),
            });
        }
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!("must be one of {}", VALID_LOG_LEVELS.join(", ")),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.cache.backend, CacheBackend::Sqlite);
        assert!(config.cache.enabled);
        assert_eq!(config.search.object_debounce_ms, 500);
        assert_eq!(config.search.global_debounce_ms, 300);
        assert_eq!(config.search.min_query_len, 2);
    }

    #[test]
    fn test_load_yaml() {
        let yaml = r#"
cache:
  backend: store
  enabled: false
  db_path: /tmp/mirror.db
  store_path: /tmp/mirror.json
search:
  object_debounce_ms: 250
  global_debounce_ms: 150
  min_query_len: 3
logging:
  level: debug
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Store);
        assert!(!config.cache.enabled);
        assert_eq!(config.search.object_debounce_ms, 250);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(config.search.min_query_len, 2);
    }

    #[test]
    fn test_validate_flags_bad_values() {
        let mut config = Config::default();
        config.search.object_debounce_ms = 0;
        config.logging.level = "loud".to_string();

        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "search.object_debounce_ms");
        assert_eq!(errors[1].field, "logging.level");
    }
}
