//! Per-package "already emitted" watermark, reset at day boundaries.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative minutes already turned into sessions today, per package.
///
/// Entries never decrease within a calendar day. The whole map is cleared the
/// first time a sync happens on a different local date than `last_sync_date`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySyncWatermark {
    #[serde(default)]
    pub synced: BTreeMap<String, f64>,
    #[serde(default)]
    pub last_sync_date: Option<DateTime<Utc>>,
}

impl DailySyncWatermark {
    /// Minutes already emitted for `package_name` today.
    pub fn emitted(&self, package_name: &str) -> f64 {
        self.synced.get(package_name).copied().unwrap_or(0.0)
    }

    /// Fresh usage beyond the watermark. Never negative.
    pub fn delta(&self, package_name: &str, cumulative_minutes: f64) -> f64 {
        (cumulative_minutes - self.emitted(package_name)).max(0.0)
    }

    /// Whether the stored sync date falls on a different local day than `now`.
    pub fn needs_rollover(&self, now: DateTime<FixedOffset>) -> bool {
        self.last_sync_date.is_none_or(|last| {
            local_date(last, now.offset()) != now.date_naive()
        })
    }

    /// Clears the map when `now` is on a new local day. Returns `true` if cleared.
    pub fn roll_over(&mut self, now: DateTime<FixedOffset>) -> bool {
        if !self.needs_rollover(now) {
            return false;
        }
        let had_entries = !self.synced.is_empty();
        self.synced.clear();
        if had_entries {
            tracing::debug!(today = %now.date_naive(), "watermark cleared for new day");
        }
        true
    }

    /// Raises the watermark for `package_name` to `cumulative_minutes`.
    ///
    /// Lower values are ignored so the entry stays monotonic.
    pub fn advance(&mut self, package_name: &str, cumulative_minutes: f64) {
        let entry = self.synced.entry(package_name.to_string()).or_insert(0.0);
        if cumulative_minutes > *entry {
            *entry = cumulative_minutes;
        }
    }

    pub fn mark_synced_at(&mut self, now: DateTime<FixedOffset>) {
        self.last_sync_date = Some(now.with_timezone(&Utc));
    }
}

fn local_date(at: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    at.with_timezone(offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn missing_sync_date_forces_rollover() {
        let wm = DailySyncWatermark::default();
        assert!(wm.needs_rollover(at(2026, 3, 1, 9)));
    }

    #[test]
    fn same_day_keeps_entries() {
        let mut wm = DailySyncWatermark::default();
        wm.advance("pkg", 7.0);
        wm.mark_synced_at(at(2026, 3, 1, 9));
        assert!(!wm.roll_over(at(2026, 3, 1, 23)));
        assert!((wm.emitted("pkg") - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_day_clears_entries() {
        let mut wm = DailySyncWatermark::default();
        wm.advance("pkg", 7.0);
        wm.mark_synced_at(at(2026, 3, 1, 23));
        assert!(wm.roll_over(at(2026, 3, 2, 0)));
        assert!(wm.synced.is_empty());
        assert!((wm.delta("pkg", 3.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn same_day_in_another_year_still_rolls_over() {
        let mut wm = DailySyncWatermark::default();
        wm.advance("pkg", 7.0);
        wm.mark_synced_at(at(2025, 3, 1, 12));
        assert!(wm.roll_over(at(2026, 3, 1, 12)));
    }

    #[test]
    fn rollover_uses_local_offset() {
        // 20:00 UTC on the 1st is 22:00 local at UTC+2
        let mut wm = DailySyncWatermark::default();
        wm.mark_synced_at(at(2026, 3, 1, 20));
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = plus_two.with_ymd_and_hms(2026, 3, 2, 1, 30, 0).unwrap();
        assert!(wm.needs_rollover(now));
        let same_local_day = plus_two.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap();
        assert!(!wm.needs_rollover(same_local_day));
    }

    #[test]
    fn advance_is_monotonic() {
        let mut wm = DailySyncWatermark::default();
        wm.advance("pkg", 12.0);
        wm.advance("pkg", 5.0);
        assert!((wm.emitted("pkg") - 12.0).abs() < f64::EPSILON);
        assert!(wm.delta("pkg", 10.0).abs() < f64::EPSILON);
    }
}
