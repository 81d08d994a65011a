//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use mg_tracker::TrackerConfig;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Directory the device bridge writes usage snapshots into.
    pub usage_dir: PathBuf,
    /// Game-metadata search API key.
    pub rawg_api_key: Option<String>,
    pub rawg_base_url: String,
    /// Community mapping feed; unset disables the community layer.
    pub community_mappings_url: Option<String>,
    pub poll_interval_secs: u64,
    pub refresh_interval_secs: u64,
    pub min_delta_minutes: f64,
    pub max_retries: u32,
    pub auto_append: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("usage_dir", &self.usage_dir)
            .field("rawg_api_key", &self.rawg_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("rawg_base_url", &self.rawg_base_url)
            .field("community_mappings_url", &self.community_mappings_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .field("min_delta_minutes", &self.min_delta_minutes)
            .field("max_retries", &self.max_retries)
            .field("auto_append", &self.auto_append)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let tracker = TrackerConfig::default();
        Self {
            database_path: data_dir.join("mg.db"),
            usage_dir: data_dir.join("usage"),
            rawg_api_key: None,
            rawg_base_url: mg_remote::DEFAULT_BASE_URL.to_string(),
            community_mappings_url: None,
            poll_interval_secs: mg_tracker::DEFAULT_POLL_INTERVAL.as_secs(),
            refresh_interval_secs: 60,
            min_delta_minutes: tracker.min_delta_minutes,
            max_retries: tracker.max_retries,
            auto_append: tracker.auto_append,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // MG_DATABASE_PATH, MG_RAWG_API_KEY, ...
        figment = figment.merge(Env::prefixed("MG_"));

        figment.extract()
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            min_delta_minutes: self.min_delta_minutes,
            max_retries: self.max_retries,
            auto_append: self.auto_append,
            ..TrackerConfig::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// Returns the platform-specific config directory for mg.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mindful-gamer"))
}

/// Returns the platform-specific data directory for mg.
///
/// On Linux: `~/.local/share/mindful-gamer`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("mindful-gamer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_data_dir() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("mg.db"));
        assert_eq!(config.usage_dir, data_dir.join("usage"));
        assert_eq!(config.max_retries, 3);
        assert!(config.auto_append);
    }

    #[test]
    fn file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "database_path = \"/tmp/other.db\"\nauto_append = false\nmin_delta_minutes = 2.5\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
        assert!(!config.auto_append);
        let tracker = config.tracker_config();
        assert!((tracker.min_delta_minutes - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = Config {
            rawg_api_key: Some("secret-key".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
