//! Fakes shared by the tracker tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use mg_core::{
    AppCategory, AppInfo, FeedError, ForegroundApp, MappingFeed, MemoryStore, PermissionStatus,
    UsageError, UsageSource, UsageStat,
};
use parking_lot::Mutex;

use crate::capability::Capability;
use crate::clock::ManualClock;
use crate::tracker::{Tracker, TrackerConfig};

pub type TestTracker = Tracker<FakeUsage, MemoryStore, Option<NoFeed>>;

/// A feed type that is never constructed; `None::<NoFeed>` serves nothing.
pub struct NoFeed;

impl MappingFeed for NoFeed {
    async fn verified_mappings(&self) -> Result<BTreeMap<String, String>, FeedError> {
        Ok(BTreeMap::new())
    }
}

#[derive(Default)]
struct FakeState {
    permission: Mutex<PermissionStatus>,
    stats: Mutex<Vec<UsageStat>>,
    events: Mutex<Vec<UsageStat>>,
    apps: Mutex<HashMap<String, AppInfo>>,
    foreground: Mutex<Option<ForegroundApp>>,
    delay: Mutex<Duration>,
    failures: AtomicUsize,
    queries: AtomicUsize,
}

/// Scriptable usage source; clones share state.
#[derive(Clone, Default)]
pub struct FakeUsage {
    state: Arc<FakeState>,
}

impl FakeUsage {
    pub fn with_permission(permission: PermissionStatus) -> Self {
        let usage = Self::default();
        *usage.state.permission.lock() = permission;
        usage
    }

    pub fn granted() -> Self {
        Self::with_permission(PermissionStatus::Granted)
    }

    pub fn set_permission(&self, permission: PermissionStatus) {
        *self.state.permission.lock() = permission;
    }

    pub fn set_stats(&self, stats: Vec<UsageStat>) {
        *self.state.stats.lock() = stats;
    }

    pub fn set_events(&self, events: Vec<UsageStat>) {
        *self.state.events.lock() = events;
    }

    pub fn set_app(&self, package_name: &str, display_name: &str, is_game: bool) {
        let category = if is_game {
            AppCategory::Game
        } else {
            AppCategory::Other
        };
        self.state.apps.lock().insert(
            package_name.to_string(),
            AppInfo {
                display_name: display_name.to_string(),
                category,
            },
        );
    }

    pub fn set_foreground(&self, package_name: Option<&str>) {
        *self.state.foreground.lock() = package_name.map(|package_name| ForegroundApp {
            package_name: package_name.to_string(),
            timestamp: last_used(),
        });
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock() = delay;
    }

    /// Makes the next `count` aggregate queries fail.
    pub fn fail_next(&self, count: usize) {
        self.state.failures.store(count, Ordering::SeqCst);
    }

    /// Aggregate queries made so far.
    pub fn queries(&self) -> usize {
        self.state.queries.load(Ordering::SeqCst)
    }
}

impl UsageSource for FakeUsage {
    async fn permission(&self) -> PermissionStatus {
        *self.state.permission.lock()
    }

    async fn query_usage_stats(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<UsageStat>, UsageError> {
        self.state.queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .state
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(UsageError::Query("binder transaction failed".to_string()));
        }
        Ok(self.state.stats.lock().clone())
    }

    async fn query_event_usage(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<UsageStat>, UsageError> {
        Ok(self.state.events.lock().clone())
    }

    async fn current_foreground_app(&self) -> Result<Option<ForegroundApp>, UsageError> {
        Ok(self.state.foreground.lock().clone())
    }

    async fn app_display_names(
        &self,
        package_names: &[String],
    ) -> Result<HashMap<String, AppInfo>, UsageError> {
        let apps = self.state.apps.lock();
        Ok(package_names
            .iter()
            .filter_map(|name| apps.get(name).map(|info| (name.clone(), info.clone())))
            .collect())
    }
}

pub fn last_used() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 11, 30, 0).unwrap()
}

pub fn stat(package_name: &str, minutes: f64) -> UsageStat {
    UsageStat {
        package_name: package_name.to_string(),
        app_name: None,
        total_time_in_foreground: minutes,
        last_time_used: last_used(),
    }
}

pub fn test_clock() -> ManualClock {
    let utc = FixedOffset::east_opt(0).unwrap();
    ManualClock::new(utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
}

pub fn tracker_with(
    usage: FakeUsage,
    config: TrackerConfig,
) -> (Arc<TestTracker>, Arc<ManualClock>) {
    let clock = Arc::new(test_clock());
    let tracker = Tracker::new(Capability::Available(usage), MemoryStore::new(), None, config)
        .with_clock(clock.clone());
    (Arc::new(tracker), clock)
}
