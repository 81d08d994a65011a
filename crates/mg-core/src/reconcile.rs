//! Pure steps of a reconciliation cycle: candidate detection and delta planning.
//!
//! Everything here is a function of its inputs; the stateful side (fetching,
//! emitting, persisting) lives in the tracker crate.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::resolver::{PackageMap, format_package_name, looks_like_game};
use crate::types::{AppCategory, AppInfo, UnmappedGame, UsageStat};
use crate::watermark::DailySyncWatermark;

/// Smallest delta, in minutes, worth emitting as a session.
pub const MIN_SESSION_DELTA_MINUTES: f64 = 1.0;

/// Cumulative usage below this many minutes is never considered.
pub const MIN_CANDIDATE_MINUTES: f64 = 1.0;

/// A package with today's usage that resolved to a game.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub package_name: String,
    pub game_name: String,
    pub cumulative_minutes: f64,
    pub last_time_used: DateTime<Utc>,
}

/// Fresh usage to append to the session log.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDelta {
    pub package_name: String,
    pub game_name: String,
    pub delta_minutes: f64,
    /// Value the watermark moves to once the delta is recorded.
    pub cumulative_minutes: f64,
    pub detected_at: DateTime<Utc>,
}

/// Read-only context shared by the detection helpers.
#[derive(Debug, Clone, Copy)]
pub struct Detection<'a> {
    pub map: &'a PackageMap,
    pub ignored: &'a BTreeSet<String>,
    pub apps: &'a HashMap<String, AppInfo>,
}

impl Detection<'_> {
    fn is_category_game(&self, package_name: &str) -> bool {
        self.apps
            .get(package_name)
            .is_some_and(|info| info.category == AppCategory::Game)
    }

    /// Whether the package counts as a game at all.
    pub fn is_game(&self, package_name: &str) -> bool {
        self.map.contains(package_name)
            || self.is_category_game(package_name)
            || looks_like_game(package_name)
    }

    /// Name for a package: mapping, then platform label, then formatted package name.
    pub fn game_name(&self, package_name: &str, app_name: Option<&str>) -> String {
        if let Some(name) = self.map.get(package_name) {
            return name.to_string();
        }
        if let Some(label) = app_name.filter(|label| !label.trim().is_empty()) {
            return label.to_string();
        }
        if let Some(info) = self.apps.get(package_name) {
            if !info.display_name.trim().is_empty() {
                return info.display_name.clone();
            }
        }
        format_package_name(package_name)
    }

    /// Usage stats that are games worth reconciling, most recently used first.
    pub fn candidates(&self, stats: &[UsageStat]) -> Vec<Candidate> {
        let mut selected: Vec<&UsageStat> = stats
            .iter()
            .filter(|stat| !self.ignored.contains(&stat.package_name))
            .filter(|stat| stat.total_time_in_foreground >= MIN_CANDIDATE_MINUTES)
            .filter(|stat| self.is_game(&stat.package_name))
            .collect();
        selected.sort_by(|a, b| b.last_time_used.cmp(&a.last_time_used));

        selected
            .into_iter()
            .map(|stat| Candidate {
                package_name: stat.package_name.clone(),
                game_name: self.game_name(&stat.package_name, stat.app_name.as_deref()),
                cumulative_minutes: stat.total_time_in_foreground,
                last_time_used: stat.last_time_used,
            })
            .collect()
    }

    /// Game-like packages with real usage that no mapping layer resolves.
    pub fn unmapped(&self, stats: &[UsageStat]) -> Vec<UnmappedGame> {
        let mut unmapped: Vec<UnmappedGame> = stats
            .iter()
            .filter(|stat| stat.total_time_in_foreground > MIN_CANDIDATE_MINUTES)
            .filter(|stat| !self.ignored.contains(&stat.package_name))
            .filter(|stat| !self.map.contains(&stat.package_name))
            .filter(|stat| {
                self.is_category_game(&stat.package_name) || looks_like_game(&stat.package_name)
            })
            .map(|stat| UnmappedGame {
                package_name: stat.package_name.clone(),
                display_name: self
                    .apps
                    .get(&stat.package_name)
                    .map(|info| info.display_name.clone())
                    .or_else(|| stat.app_name.clone()),
                total_time_in_foreground: stat.total_time_in_foreground,
                last_time_used: stat.last_time_used,
            })
            .collect();
        unmapped.sort_by(|a, b| {
            b.total_time_in_foreground
                .total_cmp(&a.total_time_in_foreground)
        });
        unmapped
    }
}

/// Combines aggregate stats with event-derived stats.
///
/// Aggregate figures win for packages both sources report; packages only the
/// event log saw are appended.
pub fn merge_hybrid(aggregate: Vec<UsageStat>, events: Vec<UsageStat>) -> Vec<UsageStat> {
    let mut merged = aggregate;
    for stat in events {
        match merged
            .iter()
            .find(|existing| existing.package_name == stat.package_name)
        {
            Some(existing) => {
                let drift =
                    (existing.total_time_in_foreground - stat.total_time_in_foreground).abs();
                if drift >= MIN_SESSION_DELTA_MINUTES {
                    tracing::debug!(
                        package = %stat.package_name,
                        aggregate = existing.total_time_in_foreground,
                        events = stat.total_time_in_foreground,
                        "usage sources disagree"
                    );
                }
            }
            None => merged.push(stat),
        }
    }
    merged
}

/// Computes per-package deltas against the watermark.
///
/// Deltas below `min_delta` are left out; the watermark does not move for them,
/// so the usage is picked up once it grows past the threshold.
pub fn plan_deltas(
    watermark: &DailySyncWatermark,
    candidates: &[Candidate],
    min_delta: f64,
) -> Vec<SessionDelta> {
    candidates
        .iter()
        .filter_map(|candidate| {
            let delta = watermark.delta(&candidate.package_name, candidate.cumulative_minutes);
            (delta >= min_delta).then(|| SessionDelta {
                package_name: candidate.package_name.clone(),
                game_name: candidate.game_name.clone(),
                delta_minutes: delta,
                cumulative_minutes: candidate.cumulative_minutes,
                detected_at: candidate.last_time_used,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::resolver::resolve;

    fn stat(pkg: &str, minutes: f64, last_used_secs: i64) -> UsageStat {
        UsageStat {
            package_name: pkg.to_string(),
            app_name: None,
            total_time_in_foreground: minutes,
            last_time_used: DateTime::from_timestamp(last_used_secs, 0).unwrap(),
        }
    }

    fn candidate(pkg: &str, name: &str, minutes: f64) -> Candidate {
        Candidate {
            package_name: pkg.to_string(),
            game_name: name.to_string(),
            cumulative_minutes: minutes,
            last_time_used: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn candidates_filter_and_sort() {
        let map = resolve(&BTreeMap::new(), &[]);
        let ignored = BTreeSet::from(["com.supercell.clashofclans".to_string()]);
        let apps = HashMap::from([(
            "com.indie.tapper".to_string(),
            AppInfo {
                display_name: "Tapper".to_string(),
                category: AppCategory::Game,
            },
        )]);
        let detection = Detection {
            map: &map,
            ignored: &ignored,
            apps: &apps,
        };
        let stats = vec![
            stat("com.mojang.minecraftpe", 7.0, 100),
            stat("com.supercell.clashofclans", 30.0, 300),
            stat("com.android.chrome", 50.0, 400),
            stat("com.indie.tapper", 4.0, 200),
            stat("com.roblox.client", 0.5, 500),
            stat("com.studio.games.runner", 2.0, 50),
        ];

        let found = detection.candidates(&stats);
        let names: Vec<_> = found.iter().map(|c| c.game_name.as_str()).collect();
        assert_eq!(names, vec!["Tapper", "Minecraft", "Runner"]);
    }

    #[test]
    fn unmapped_lists_game_like_packages_without_mapping() {
        let map = resolve(&BTreeMap::new(), &[]);
        let ignored = BTreeSet::from(["com.studio.games.ignored".to_string()]);
        let apps = HashMap::from([(
            "com.indie.tapper".to_string(),
            AppInfo {
                display_name: "Tapper".to_string(),
                category: AppCategory::Game,
            },
        )]);
        let detection = Detection {
            map: &map,
            ignored: &ignored,
            apps: &apps,
        };
        let stats = vec![
            stat("com.indie.tapper", 4.0, 1),
            stat("com.studio.games.runner", 9.0, 1),
            stat("com.studio.games.ignored", 20.0, 1),
            stat("com.studio.games.brief", 1.0, 1),
            stat("com.mojang.minecraftpe", 60.0, 1),
        ];

        let unmapped = detection.unmapped(&stats);
        let pkgs: Vec<_> = unmapped.iter().map(|u| u.package_name.as_str()).collect();
        assert_eq!(pkgs, vec!["com.studio.games.runner", "com.indie.tapper"]);
        assert_eq!(unmapped[1].display_name.as_deref(), Some("Tapper"));
    }

    #[test]
    fn first_sync_of_day_emits_full_usage() {
        let wm = DailySyncWatermark::default();
        let deltas = plan_deltas(
            &wm,
            &[candidate("com.mojang.minecraftpe", "Minecraft", 7.0)],
            MIN_SESSION_DELTA_MINUTES,
        );
        assert_eq!(deltas.len(), 1);
        assert!((deltas[0].delta_minutes - 7.0).abs() < f64::EPSILON);
        assert_eq!(deltas[0].game_name, "Minecraft");
    }

    #[test]
    fn unchanged_usage_emits_nothing() {
        let mut wm = DailySyncWatermark::default();
        wm.advance("com.mojang.minecraftpe", 7.0);
        let deltas = plan_deltas(
            &wm,
            &[candidate("com.mojang.minecraftpe", "Minecraft", 7.0)],
            MIN_SESSION_DELTA_MINUTES,
        );
        assert!(deltas.is_empty());
    }

    #[test]
    fn growth_emits_only_increment() {
        let mut wm = DailySyncWatermark::default();
        wm.advance("com.mojang.minecraftpe", 7.0);
        let deltas = plan_deltas(
            &wm,
            &[candidate("com.mojang.minecraftpe", "Minecraft", 12.0)],
            MIN_SESSION_DELTA_MINUTES,
        );
        assert!((deltas[0].delta_minutes - 5.0).abs() < f64::EPSILON);
        assert!((deltas[0].cumulative_minutes - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sub_minute_delta_is_not_emitted() {
        let mut wm = DailySyncWatermark::default();
        wm.advance("com.mojang.minecraftpe", 7.0);
        let deltas = plan_deltas(
            &wm,
            &[candidate("com.mojang.minecraftpe", "Minecraft", 7.9)],
            MIN_SESSION_DELTA_MINUTES,
        );
        assert!(deltas.is_empty());
    }

    #[test]
    fn hybrid_merge_prefers_aggregate() {
        let merged = merge_hybrid(
            vec![stat("a", 10.0, 1)],
            vec![stat("a", 14.0, 1), stat("b", 3.0, 1)],
        );
        assert_eq!(merged.len(), 2);
        assert!((merged[0].total_time_in_foreground - 10.0).abs() < f64::EPSILON);
        assert_eq!(merged[1].package_name, "b");
    }
}
