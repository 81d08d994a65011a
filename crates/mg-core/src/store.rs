//! Storage seams: the session log and the key-value state blob.
//!
//! The reconciler owns the watermark and pending sessions; settings, library and
//! mappings are written by whoever edits them and read back as snapshots.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::types::LibraryGame;

/// Key of the configuration blob read by detached background syncs.
pub const BACKGROUND_CONFIG_KEY: &str = "mindful-gamer-background-config";
/// Key of the daily sync watermark.
pub const WATERMARK_KEY: &str = "mindful-gamer-daily-synced";
/// Key of sessions detected but not yet promoted to the log.
pub const PENDING_SESSIONS_KEY: &str = "mindful-gamer-pending-auto-sessions";
/// Key of mappings learned from fuzzy matching.
pub const LEARNED_MAPPINGS_KEY: &str = "mindful-gamer-learned-mappings";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// A stored value could not be encoded or decoded.
    #[error("invalid stored value for {key}: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings and library snapshot shared with background execution contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundConfig {
    #[serde(default = "default_enabled")]
    pub auto_tracking_enabled: bool,
    #[serde(default)]
    pub user_mappings: BTreeMap<String, String>,
    /// Minimal projection of the library: id, name and package only.
    #[serde(default)]
    pub user_library_games: Vec<LibraryGame>,
    #[serde(default)]
    pub ignored_packages: BTreeSet<String>,
}

const fn default_enabled() -> bool {
    true
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            auto_tracking_enabled: true,
            user_mappings: BTreeMap::new(),
            user_library_games: Vec::new(),
            ignored_packages: BTreeSet::new(),
        }
    }
}

/// Append-only log of play sessions.
pub trait SessionLog: Send {
    /// Records a session of `duration_minutes` for `game_name`.
    fn add_session(&mut self, game_name: &str, duration_minutes: f64) -> Result<(), StoreError>;

    /// Deletes every recorded session for `game_name`, returning how many went.
    fn remove_sessions_for_game(&mut self, game_name: &str) -> Result<usize, StoreError>;
}

/// String key-value persistence.
pub trait KeyValueStore: Send {
    fn get_value(&mut self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_value(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Reads a JSON value, falling back to its default when the key is unset.
pub fn load_json<T, S>(store: &mut S, key: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    match store.get_value(key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Codec {
            key: key.to_string(),
            source,
        }),
        None => Ok(T::default()),
    }
}

/// Writes a value as JSON.
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Codec {
        key: key.to_string(),
        source,
    })?;
    store.set_value(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use crate::watermark::DailySyncWatermark;

    #[test]
    fn missing_key_loads_default() {
        let mut store = MemoryStore::new();
        let config: BackgroundConfig = load_json(&mut store, BACKGROUND_CONFIG_KEY).unwrap();
        assert!(config.auto_tracking_enabled);
        assert!(config.user_mappings.is_empty());
    }

    #[test]
    fn background_config_reads_camel_case_blob() {
        let mut store = MemoryStore::new();
        store
            .set_value(
                BACKGROUND_CONFIG_KEY,
                r#"{"userMappings":{"com.a":"A"},"userLibraryGames":[{"id":"1","name":"B","packageName":"com.b"}],"ignoredPackages":["com.c"]}"#,
            )
            .unwrap();
        let config: BackgroundConfig = load_json(&mut store, BACKGROUND_CONFIG_KEY).unwrap();
        assert!(config.auto_tracking_enabled);
        assert_eq!(config.user_mappings.get("com.a").map(String::as_str), Some("A"));
        assert_eq!(config.user_library_games[0].package(), Some("com.b"));
        assert!(config.ignored_packages.contains("com.c"));
    }

    #[test]
    fn corrupt_value_reports_key() {
        let mut store = MemoryStore::new();
        store.set_value(WATERMARK_KEY, "not-json").unwrap();
        let err = load_json::<DailySyncWatermark, _>(&mut store, WATERMARK_KEY).unwrap_err();
        assert!(err.to_string().contains(WATERMARK_KEY));
    }

    #[test]
    fn failed_write_surfaces_error() {
        let mut store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let result = save_json(&mut store, WATERMARK_KEY, &DailySyncWatermark::default());
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }
}
