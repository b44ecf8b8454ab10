//! Configuration file parser for `feedpoll.toml`.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::scheduler::{SchedulerConfig, SelectionPolicy};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file, or `:memory:`.
    pub database_path: String,

    /// Address the HTTP API binds to.
    pub listen_addr: String,

    /// Default `limit` for `GET /posts`.
    pub page_size: u32,

    pub poll: PollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "./db.db".to_string(),
            listen_addr: "0.0.0.0:5000".to_string(),
            page_size: 10,
            poll: PollConfig::default(),
        }
    }
}

/// The `[poll]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub min_interval_secs: u64,
    pub pacing_secs: u64,
    pub rate_limit_cooldown_secs: u64,
    pub request_timeout_secs: u64,
    pub selection: SelectionPolicy,
    /// Also wait `pacing_secs` after feeds skipped as not due.
    pub pace_skipped: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 900,
            pacing_secs: 60,
            rate_limit_cooldown_secs: 60,
            request_timeout_secs: 10,
            selection: SelectionPolicy::First,
            pace_skipped: false,
        }
    }
}

impl PollConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            min_interval: Duration::from_secs(self.min_interval_secs),
            pacing: Duration::from_secs(self.pacing_secs),
            rate_limit_cooldown: Duration::from_secs(self.rate_limit_cooldown_secs),
            selection: self.selection,
            pace_skipped: self.pace_skipped,
            ..SchedulerConfig::default()
        }
    }
}

const KNOWN_KEYS: &[&str] = &["database_path", "listen_addr", "page_size", "poll"];

const KNOWN_POLL_KEYS: &[&str] = &[
    "min_interval_secs",
    "pacing_secs",
    "rate_limit_cooldown_secs",
    "request_timeout_secs",
    "selection",
    "pace_skipped",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            database = %config.database_path,
            listen = %config.listen_addr,
            "Loaded configuration"
        );
        Ok(config)
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for key in raw.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
        }
    }
    if let Some(toml::Value::Table(poll)) = raw.get("poll") {
        for key in poll.keys() {
            if !KNOWN_POLL_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %format!("poll.{}", key), "Unknown key in config file, ignoring");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("feedpoll_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("feedpoll.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database_path, "./db.db");
        assert_eq!(config.listen_addr, "0.0.0.0:5000");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.poll.min_interval_secs, 900);
        assert_eq!(config.poll.pacing_secs, 60);
        assert_eq!(config.poll.rate_limit_cooldown_secs, 60);
        assert_eq!(config.poll.request_timeout_secs, 10);
        assert_eq!(config.poll.selection, SelectionPolicy::First);
        assert!(!config.poll.pace_skipped);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedpoll_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.database_path, "./db.db");
    }

    #[test]
    fn test_empty_file_returns_default() {
        let path = write_config("empty", "   \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.page_size, 10);
        cleanup(&path);
    }

    #[test]
    fn test_partial_poll_table_uses_defaults_for_missing() {
        let path = write_config(
            "partial",
            "database_path = \"/var/lib/feedpoll.db\"\n[poll]\npacing_secs = 5\n",
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database_path, "/var/lib/feedpoll.db");
        assert_eq!(config.listen_addr, "0.0.0.0:5000");
        assert_eq!(config.poll.pacing_secs, 5);
        assert_eq!(config.poll.min_interval_secs, 900);

        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
database_path = ":memory:"
listen_addr = "127.0.0.1:8080"
page_size = 25

[poll]
min_interval_secs = 300
pacing_secs = 2
rate_limit_cooldown_secs = 120
request_timeout_secs = 30
selection = "all_unseen"
pace_skipped = true
"#;
        let path = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.poll.request_timeout(), Duration::from_secs(30));

        let scheduler = config.poll.scheduler_config();
        assert_eq!(scheduler.min_interval, Duration::from_secs(300));
        assert_eq!(scheduler.pacing, Duration::from_secs(2));
        assert_eq!(scheduler.rate_limit_cooldown, Duration::from_secs(120));
        assert_eq!(scheduler.selection, SelectionPolicy::AllUnseen);
        assert!(scheduler.pace_skipped);

        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config(
            "unknown",
            "page_size = 5\nrefresh = 1\n[poll]\npacing = 3\n",
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.poll.pacing_secs, 60);

        cleanup(&path);
    }

    #[test]
    fn test_unknown_selection_rejected() {
        let path = write_config("bad_selection", "[poll]\nselection = \"newest\"\n");
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Parse(_)
        ));
        cleanup(&path);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        cleanup(&path);
    }

    #[test]
    fn test_scheduler_config_keeps_idle_pause_default() {
        let scheduler = PollConfig::default().scheduler_config();
        assert_eq!(scheduler.idle_pause, SchedulerConfig::default().idle_pause);
        assert_eq!(scheduler.min_interval, Duration::from_secs(900));
    }
}
