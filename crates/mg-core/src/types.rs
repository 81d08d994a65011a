//! Shared data model for usage reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds per minute, used when converting adapter figures.
pub const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Per-app foreground usage reported by the OS for a queried window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStat {
    pub package_name: String,
    /// Label reported alongside the stat, when the platform provides one.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Cumulative foreground time in minutes.
    pub total_time_in_foreground: f64,
    pub last_time_used: DateTime<Utc>,
}

impl UsageStat {
    /// Builds a stat from the millisecond figures the platform reports.
    pub fn from_millis(
        package_name: impl Into<String>,
        foreground_ms: u64,
        last_used_ms: i64,
    ) -> Self {
        #[expect(
            clippy::cast_precision_loss,
            reason = "a day of foreground time is far below f64 precision limits"
        )]
        let minutes = foreground_ms as f64 / MILLIS_PER_MINUTE;
        Self {
            package_name: package_name.into(),
            app_name: None,
            total_time_in_foreground: minutes,
            last_time_used: DateTime::from_timestamp_millis(last_used_ms).unwrap_or_default(),
        }
    }
}

/// App category as reported by the package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppCategory {
    Game,
    #[default]
    Other,
}

impl AppCategory {
    /// Maps Android's `ApplicationInfo.category` code (0 is `CATEGORY_GAME`).
    #[must_use]
    pub const fn from_android_code(code: i32) -> Self {
        if code == 0 { Self::Game } else { Self::Other }
    }
}

/// Display metadata for an installed app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub display_name: String,
    #[serde(default)]
    pub category: AppCategory,
}

/// The app currently in the foreground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForegroundApp {
    pub package_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Usage-stats permission as seen by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    #[default]
    Unavailable,
}

impl PermissionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A game in the user's library, reduced to the fields detection needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryGame {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

impl LibraryGame {
    /// Returns the trimmed package name, ignoring blank values.
    pub fn package(&self) -> Option<&str> {
        self.package_name
            .as_deref()
            .map(str::trim)
            .filter(|pkg| !pkg.is_empty())
    }
}

/// How an auto-tracked session came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    #[default]
    Auto,
    Manual,
}

impl SessionSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for SessionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("invalid session source: {s}")),
        }
    }
}

/// A session derived from OS usage data.
///
/// Immutable after creation apart from `synced`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTrackedSession {
    pub id: String,
    pub package_name: String,
    pub game_name: String,
    /// Duration in minutes.
    pub duration: f64,
    pub detected_at: DateTime<Utc>,
    pub synced: bool,
    #[serde(default)]
    pub source: SessionSource,
}

impl AutoTrackedSession {
    /// Session id derived from the package, its last-used timestamp and the
    /// cumulative foreground time the session brings the package up to.
    ///
    /// Cumulative time only grows within a day, so two deltas for one package
    /// never share an id even when `last_time_used` did not move.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "a day of foreground time in milliseconds fits in i64"
    )]
    pub fn make_id(
        package_name: &str,
        detected_at: DateTime<Utc>,
        cumulative_minutes: f64,
    ) -> String {
        let cumulative_ms = (cumulative_minutes * MILLIS_PER_MINUTE).round() as i64;
        format!(
            "auto-{package_name}-{}-{cumulative_ms}",
            detected_at.timestamp_millis()
        )
    }
}

/// Merges `incoming` into `existing`, skipping sessions whose id is already present.
pub fn merge_sessions_without_duplicates(
    existing: &mut Vec<AutoTrackedSession>,
    incoming: impl IntoIterator<Item = AutoTrackedSession>,
) -> usize {
    let mut added = 0;
    for session in incoming {
        if existing.iter().any(|s| s.id == session.id) {
            continue;
        }
        existing.push(session);
        added += 1;
    }
    added
}

/// A package with game-like usage that no mapping resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmappedGame {
    pub package_name: String,
    pub display_name: Option<String>,
    /// Foreground minutes in the queried window.
    pub total_time_in_foreground: f64,
    pub last_time_used: DateTime<Utc>,
}

/// A game seen in the foreground that is not in the user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UntrackedGame {
    pub package_name: String,
    pub display_name: String,
    pub first_seen: DateTime<Utc>,
    pub is_currently_playing: bool,
}

/// Live "currently playing" indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ForegroundStatus {
    pub is_playing: bool,
    pub package_name: Option<String>,
    pub game_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> AutoTrackedSession {
        AutoTrackedSession {
            id: id.to_string(),
            package_name: "com.example.game".to_string(),
            game_name: "Example".to_string(),
            duration: 3.0,
            detected_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            synced: false,
            source: SessionSource::Auto,
        }
    }

    #[test]
    fn from_millis_converts_to_minutes() {
        let stat = UsageStat::from_millis("com.mojang.minecraftpe", 420_000, 1_700_000_000_000);
        assert!((stat.total_time_in_foreground - 7.0).abs() < f64::EPSILON);
        assert_eq!(stat.last_time_used.timestamp(), 1_700_000_000);
    }

    #[test]
    fn android_category_zero_is_game() {
        assert_eq!(AppCategory::from_android_code(0), AppCategory::Game);
        assert_eq!(AppCategory::from_android_code(7), AppCategory::Other);
    }

    #[test]
    fn library_game_ignores_blank_package() {
        let game = LibraryGame {
            id: "1".to_string(),
            name: "Blank".to_string(),
            package_name: Some("   ".to_string()),
        };
        assert_eq!(game.package(), None);
    }

    #[test]
    fn session_id_uses_millis() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(
            AutoTrackedSession::make_id("com.roblox.client", at, 7.5),
            "auto-com.roblox.client-1700000000123-450000"
        );
        assert_ne!(
            AutoTrackedSession::make_id("com.roblox.client", at, 7.5),
            AutoTrackedSession::make_id("com.roblox.client", at, 12.0)
        );
    }

    #[test]
    fn merge_skips_known_ids() {
        let mut existing = vec![session("a"), session("b")];
        let added =
            merge_sessions_without_duplicates(&mut existing, vec![session("b"), session("c")]);
        assert_eq!(added, 1);
        let ids: Vec<_> = existing.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn session_source_round_trips_through_str() {
        assert_eq!("manual".parse::<SessionSource>().unwrap(), SessionSource::Manual);
        assert!("bogus".parse::<SessionSource>().is_err());
    }
}
