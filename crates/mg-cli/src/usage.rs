//! Usage source backed by a JSON snapshot written by the device bridge.
//!
//! The bridge drops `usage.json` into the configured usage directory:
//!
//! ```json
//! {
//!   "permission": "granted",
//!   "stats": [{"packageName": "com.mojang.minecraftpe", "totalTimeInForeground": 420000, "lastTimeUsed": 1772364600000}],
//!   "events": [],
//!   "apps": {"com.mojang.minecraftpe": {"displayName": "Minecraft", "category": 0}},
//!   "foreground": {"packageName": "com.mojang.minecraftpe", "timestamp": 1772364600000}
//! }
//! ```
//!
//! Durations and timestamps are milliseconds, as the platform reports them.
//! Categories use the platform's numeric codes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mg_core::{
    AppCategory, AppInfo, ForegroundApp, PermissionStatus, UsageError, UsageSource, UsageStat,
};
use serde::Deserialize;

pub const SNAPSHOT_FILE: &str = "usage.json";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    permission: PermissionStatus,
    #[serde(default)]
    stats: Vec<RawStat>,
    #[serde(default)]
    events: Vec<RawStat>,
    #[serde(default)]
    apps: HashMap<String, RawApp>,
    #[serde(default)]
    foreground: Option<RawForeground>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStat {
    package_name: String,
    #[serde(default)]
    app_name: Option<String>,
    total_time_in_foreground: u64,
    last_time_used: i64,
}

impl RawStat {
    fn into_stat(self) -> UsageStat {
        let mut stat = UsageStat::from_millis(
            self.package_name,
            self.total_time_in_foreground,
            self.last_time_used,
        );
        stat.app_name = self.app_name;
        stat
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawApp {
    display_name: String,
    #[serde(default = "other_category")]
    category: i32,
}

const fn other_category() -> i32 {
    -1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawForeground {
    package_name: String,
    timestamp: i64,
}

/// Reads usage from `<usage_dir>/usage.json` on every query.
#[derive(Debug, Clone)]
pub struct SnapshotUsageSource {
    path: PathBuf,
}

impl SnapshotUsageSource {
    /// Returns a source when the usage directory exists.
    pub fn discover(usage_dir: &Path) -> Option<Self> {
        if !usage_dir.is_dir() {
            tracing::debug!(dir = %usage_dir.display(), "usage directory missing");
            return None;
        }
        Some(Self {
            path: usage_dir.join(SNAPSHOT_FILE),
        })
    }

    fn read(&self) -> Result<Option<Snapshot>, UsageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(UsageError::Query(format!(
                    "failed to read {}: {err}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| UsageError::Malformed(format!("{}: {err}", self.path.display())))
    }

    fn stats_since(
        stats: Vec<RawStat>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<UsageStat> {
        stats
            .into_iter()
            .map(RawStat::into_stat)
            .filter(|stat| stat.last_time_used >= start && stat.last_time_used <= end)
            .collect()
    }
}

impl UsageSource for SnapshotUsageSource {
    async fn permission(&self) -> PermissionStatus {
        match self.read() {
            Ok(Some(snapshot)) => snapshot.permission,
            Ok(None) => PermissionStatus::Unavailable,
            Err(err) => {
                tracing::warn!(error = %err, "usage snapshot unreadable");
                PermissionStatus::Unavailable
            }
        }
    }

    async fn query_usage_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageStat>, UsageError> {
        let snapshot = self.read()?.unwrap_or_default();
        Ok(Self::stats_since(snapshot.stats, start, end))
    }

    async fn query_event_usage(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageStat>, UsageError> {
        let snapshot = self.read()?.unwrap_or_default();
        Ok(Self::stats_since(snapshot.events, start, end))
    }

    async fn current_foreground_app(&self) -> Result<Option<ForegroundApp>, UsageError> {
        let snapshot = self.read()?.unwrap_or_default();
        Ok(snapshot.foreground.map(|app| ForegroundApp {
            package_name: app.package_name,
            timestamp: DateTime::from_timestamp_millis(app.timestamp).unwrap_or_default(),
        }))
    }

    async fn app_display_names(
        &self,
        package_names: &[String],
    ) -> Result<HashMap<String, AppInfo>, UsageError> {
        let mut snapshot = self.read()?.unwrap_or_default();
        Ok(package_names
            .iter()
            .filter_map(|name| {
                snapshot.apps.remove(name).map(|app| {
                    let info = AppInfo {
                        display_name: app.display_name,
                        category: AppCategory::from_android_code(app.category),
                    };
                    (name.clone(), info)
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn write_snapshot(dir: &Path, json: &str) {
        std::fs::write(dir.join(SNAPSHOT_FILE), json).unwrap();
    }

    #[test]
    fn missing_directory_is_no_capability() {
        let temp = tempfile::tempdir().unwrap();
        assert!(SnapshotUsageSource::discover(&temp.path().join("nope")).is_none());
    }

    #[tokio::test]
    async fn missing_snapshot_reports_unavailable() {
        let temp = tempfile::tempdir().unwrap();
        let source = SnapshotUsageSource::discover(temp.path()).unwrap();
        assert_eq!(source.permission().await, PermissionStatus::Unavailable);
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert!(source.query_usage_stats(start, Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_stats_in_minutes_within_window() {
        let temp = tempfile::tempdir().unwrap();
        // 2026-03-01T11:30:00Z and 2026-02-28T11:30:00Z
        write_snapshot(
            temp.path(),
            r#"{
                "permission": "granted",
                "stats": [
                    {"packageName": "com.mojang.minecraftpe", "totalTimeInForeground": 420000, "lastTimeUsed": 1772364600000},
                    {"packageName": "com.old.game", "totalTimeInForeground": 60000, "lastTimeUsed": 1772278200000}
                ],
                "apps": {"com.mojang.minecraftpe": {"displayName": "Minecraft", "category": 0}}
            }"#,
        );
        let source = SnapshotUsageSource::discover(temp.path()).unwrap();
        assert_eq!(source.permission().await, PermissionStatus::Granted);

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let stats = source.query_usage_stats(start, end).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert!((stats[0].total_time_in_foreground - 7.0).abs() < f64::EPSILON);

        let apps = source
            .app_display_names(&["com.mojang.minecraftpe".to_string(), "com.other".to_string()])
            .await
            .unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps["com.mojang.minecraftpe"].category, AppCategory::Game);
    }

    #[tokio::test]
    async fn malformed_snapshot_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        write_snapshot(temp.path(), "{ not json");
        let source = SnapshotUsageSource::discover(temp.path()).unwrap();
        let err = source
            .query_usage_stats(Utc::now(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, UsageError::Malformed(_)));
        assert_eq!(source.permission().await, PermissionStatus::Unavailable);
    }
}
