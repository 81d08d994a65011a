//! The session delta reconciler.
//!
//! A cycle fetches today's cumulative usage, resolves packages to games, diffs
//! against the daily watermark and appends the increments to the session log.
//! At most one cycle runs at a time; overlapping calls report
//! [`RefreshOutcome::AlreadyRunning`]. Failed cycles are retried in the
//! background with exponential backoff.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use mg_core::reconcile::MIN_SESSION_DELTA_MINUTES;
use mg_core::resolver::format_package_name;
use mg_core::store::{
    self, BACKGROUND_CONFIG_KEY, LEARNED_MAPPINGS_KEY, PENDING_SESSIONS_KEY, WATERMARK_KEY,
};
use mg_core::types::merge_sessions_without_duplicates;
use mg_core::{
    AppInfo, AutoTrackedSession, BackgroundConfig, Candidate, DailySyncWatermark, Detection,
    ForegroundStatus, GameSearch, KeyValueStore, MappingFeed, MappingSources, PackageMap,
    PermissionStatus, SessionDelta, SessionLog, SessionSource, StoreError, UnmappedGame,
    UntrackedGame, UsageError, UsageSource, UsageStat, merge_hybrid, plan_deltas,
};
use mg_core::resolver::ResolvedName;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::capability::Capability;
use crate::clock::{Clock, SystemClock, start_of_local_day};
use crate::community::CachedMappings;
use crate::fuzzy::FuzzyMatcher;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Tracker errors.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("no auto-tracked session with id {0}")]
    SessionNotFound(String),
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Smallest delta worth a session, in minutes.
    pub min_delta_minutes: f64,
    pub max_retries: u32,
    /// Append deltas to the log directly instead of queueing them as pending.
    pub auto_append: bool,
    /// Backoff unit; retry `n` waits `retry_base * 2^(n-1)`.
    pub retry_base: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_delta_minutes: MIN_SESSION_DELTA_MINUTES,
            max_retries: DEFAULT_MAX_RETRIES,
            auto_append: true,
            retry_base: Duration::from_secs(1),
        }
    }
}

/// What a refresh call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed,
    /// No usage capability, or permission not granted.
    Unavailable(PermissionStatus),
    /// Auto-tracking is switched off in settings.
    Disabled,
    AlreadyRunning,
}

impl RefreshOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Unavailable(_) => "unavailable",
            Self::Disabled => "disabled",
            Self::AlreadyRunning => "already_running",
        }
    }
}

impl std::fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(permission) => write!(f, "unavailable (permission {permission})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Whether the cycle's state reached storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    Saved,
    /// Nothing was written because the cycle did not run.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub outcome: RefreshOutcome,
    /// Sessions created this cycle.
    pub emitted: Vec<AutoTrackedSession>,
    /// Deltas that could not be recorded; their usage is retried next cycle.
    pub failed_appends: usize,
    pub rolled_over: bool,
    pub unmapped: Vec<UnmappedGame>,
    pub persist: PersistStatus,
}

impl RefreshReport {
    const fn skipped(outcome: RefreshOutcome) -> Self {
        Self {
            outcome,
            emitted: Vec::new(),
            failed_appends: 0,
            rolled_over: false,
            unmapped: Vec::new(),
            persist: PersistStatus::Skipped,
        }
    }
}

/// Point-in-time view of the tracker for display.
#[derive(Debug, Clone, Default)]
pub struct TrackerStatus {
    pub last_error: Option<String>,
    pub last_sync: Option<DateTime<Utc>>,
    pub retry_pending: bool,
    pub foreground: ForegroundStatus,
    pub unmapped: Vec<UnmappedGame>,
    pub untracked: Vec<UntrackedGame>,
}

/// A mapping accepted from fuzzy matching.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnedMapping {
    pub package_name: String,
    pub game_name: String,
    pub score: f64,
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) last_error: Option<String>,
    pub(crate) last_sync: Option<DateTime<Utc>>,
    /// Authoritative once loaded, so a failed save does not cause double counting.
    pub(crate) watermark: Option<DailySyncWatermark>,
    pub(crate) foreground: ForegroundStatus,
    pub(crate) unmapped: Vec<UnmappedGame>,
    pub(crate) untracked: Vec<UntrackedGame>,
    retry: Option<JoinHandle<()>>,
}

/// Settings and mapping layers read at the start of an operation.
pub(crate) struct Snapshot {
    pub(crate) config: BackgroundConfig,
    pub(crate) map: PackageMap,
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then_some(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Tracker<U, S, F> {
    pub(crate) usage: Capability<U>,
    store: Mutex<S>,
    community: CachedMappings<F>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
    in_flight: AtomicBool,
    pub(crate) state: Mutex<State>,
}

impl<U, S, F> Tracker<U, S, F>
where
    U: UsageSource + 'static,
    S: SessionLog + KeyValueStore + 'static,
    F: MappingFeed + 'static,
{
    pub fn new(usage: Capability<U>, store: S, feed: F, config: TrackerConfig) -> Self {
        Self {
            usage,
            store: Mutex::new(store),
            community: CachedMappings::new(feed),
            clock: Arc::new(SystemClock),
            config,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(State::default()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Runs `f` with exclusive access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.store.lock())
    }

    pub fn status(&self) -> TrackerStatus {
        let state = self.state.lock();
        TrackerStatus {
            last_error: state.last_error.clone(),
            last_sync: state.last_sync,
            retry_pending: state.retry.as_ref().is_some_and(|task| !task.is_finished()),
            foreground: state.foreground.clone(),
            unmapped: state.unmapped.clone(),
            untracked: state.untracked.clone(),
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Watermark as the next cycle will see it.
    pub fn watermark(&self) -> Result<DailySyncWatermark, TrackerError> {
        if let Some(watermark) = self.state.lock().watermark.clone() {
            return Ok(watermark);
        }
        Ok(store::load_json(&mut *self.store.lock(), WATERMARK_KEY)?)
    }

    /// Runs a reconciliation cycle, scheduling background retries on failure.
    ///
    /// Any retry still pending from an earlier failure is cancelled, and waited
    /// for, before the new cycle starts.
    pub async fn refresh(self: &Arc<Self>) -> Result<RefreshReport, TrackerError> {
        let pending = self.state.lock().retry.take();
        if let Some(task) = pending {
            task.abort();
            // a retry caught mid-cycle holds the in-flight guard until it is dropped
            if let Err(err) = task.await {
                tracing::debug!(cancelled = err.is_cancelled(), "pending retry stopped");
            }
        }
        let result = self.run_cycle().await;
        if self.record_outcome(0, &result) {
            self.schedule_retry(0);
        }
        result
    }

    /// Runs a single cycle with no retries.
    pub async fn refresh_once(&self) -> Result<RefreshReport, TrackerError> {
        let result = self.run_cycle().await;
        let mut state = self.state.lock();
        match &result {
            Ok(report) if report.outcome == RefreshOutcome::Completed => state.last_error = None,
            Ok(_) => {}
            Err(err) => state.last_error = Some(err.to_string()),
        }
        result
    }

    /// Aborts a scheduled retry, if any.
    pub fn cancel_retry(&self) {
        let pending = self.state.lock().retry.take();
        if let Some(task) = pending {
            task.abort();
        }
    }

    /// Records the result of `attempt` and reports whether another attempt should follow.
    fn record_outcome(&self, attempt: u32, result: &Result<RefreshReport, TrackerError>) -> bool {
        let mut state = self.state.lock();
        match result {
            Ok(report) => {
                if report.outcome == RefreshOutcome::Completed {
                    state.last_error = None;
                }
                false
            }
            Err(err) if attempt < self.config.max_retries => {
                tracing::warn!(error = %err, attempt, "refresh failed, retry scheduled");
                state.last_error = Some(err.to_string());
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, attempt, "refresh failed, giving up");
                state.last_error = Some(format!(
                    "gave up after {} retries: {err}",
                    self.config.max_retries
                ));
                false
            }
        }
    }

    fn backoff(&self, failed_attempt: u32) -> Duration {
        self.config
            .retry_base
            .saturating_mul(2_u32.saturating_pow(failed_attempt))
    }

    fn schedule_retry(self: &Arc<Self>, failed_attempt: u32) {
        let tracker = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut attempt = failed_attempt;
            loop {
                tokio::time::sleep(tracker.backoff(attempt)).await;
                attempt += 1;
                tracing::debug!(attempt, "retrying refresh");
                let result = tracker.run_cycle().await;
                if !tracker.record_outcome(attempt, &result) {
                    break;
                }
            }
        });
        let previous = self.state.lock().retry.replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub(crate) fn load_snapshot(
        &self,
        community: BTreeMap<String, String>,
    ) -> Result<Snapshot, TrackerError> {
        let (config, learned): (BackgroundConfig, BTreeMap<String, String>) = {
            let mut store = self.store.lock();
            (
                store::load_json(&mut *store, BACKGROUND_CONFIG_KEY)?,
                store::load_json(&mut *store, LEARNED_MAPPINGS_KEY)?,
            )
        };
        let map = MappingSources {
            library: config.user_library_games.clone(),
            custom: config.user_mappings.clone(),
            community,
            learned,
        }
        .resolve();
        Ok(Snapshot { config, map })
    }

    pub(crate) async fn community_mappings(&self) -> BTreeMap<String, String> {
        self.community.get().await
    }

    pub(crate) fn load_config(&self) -> Result<BackgroundConfig, TrackerError> {
        Ok(store::load_json(&mut *self.store.lock(), BACKGROUND_CONFIG_KEY)?)
    }

    pub(crate) async fn display_names(&self, packages: &[String]) -> HashMap<String, AppInfo> {
        match self.usage.app_display_names(packages).await {
            Ok(apps) => apps,
            Err(err) => {
                tracing::warn!(error = %err, "app display names unavailable");
                HashMap::new()
            }
        }
    }

    /// Whether the capability is present, permission granted and tracking enabled.
    pub(crate) async fn gate(&self) -> Result<Option<RefreshOutcome>, TrackerError> {
        if !self.usage.is_available() {
            return Ok(Some(RefreshOutcome::Unavailable(PermissionStatus::Unavailable)));
        }
        let permission = self.usage.permission().await;
        if permission != PermissionStatus::Granted {
            return Ok(Some(RefreshOutcome::Unavailable(permission)));
        }
        if !self.load_config()?.auto_tracking_enabled {
            return Ok(Some(RefreshOutcome::Disabled));
        }
        Ok(None)
    }

    /// Today's merged usage and the display names for the packages in it.
    async fn todays_usage(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<(Vec<UsageStat>, HashMap<String, AppInfo>), TrackerError> {
        let start = start_of_local_day(now);
        let end = now.with_timezone(&Utc);

        let aggregate = self.usage.query_usage_stats(start, end).await?;
        let events = self.usage.query_event_usage(start, end).await?;
        tracing::debug!(aggregate = aggregate.len(), events = events.len(), "usage fetched");
        let stats = merge_hybrid(aggregate, events);

        let packages: Vec<String> = stats.iter().map(|stat| stat.package_name.clone()).collect();
        let apps = self.display_names(&packages).await;
        Ok((stats, apps))
    }

    pub async fn permission(&self) -> PermissionStatus {
        self.usage.permission().await
    }

    /// The mapping, and its layer, that a package resolves to right now.
    pub async fn resolve_package(
        &self,
        package_name: &str,
    ) -> Result<Option<ResolvedName>, TrackerError> {
        let community = self.community_mappings().await;
        let snapshot = self.load_snapshot(community)?;
        Ok(snapshot.map.resolved(package_name).cloned())
    }

    /// Finds today's unmapped games without recording any sessions.
    pub async fn detect_unmapped(&self) -> Result<Vec<UnmappedGame>, TrackerError> {
        if let Some(outcome) = self.gate().await? {
            tracing::debug!(%outcome, "unmapped detection skipped");
            return Ok(Vec::new());
        }
        let (stats, apps) = self.todays_usage(self.clock.now()).await?;
        let community = self.community_mappings().await;
        let snapshot = self.load_snapshot(community)?;
        let unmapped = Detection {
            map: &snapshot.map,
            ignored: &snapshot.config.ignored_packages,
            apps: &apps,
        }
        .unmapped(&stats);
        self.state.lock().unmapped.clone_from(&unmapped);
        Ok(unmapped)
    }

    async fn run_cycle(&self) -> Result<RefreshReport, TrackerError> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            tracing::debug!("refresh already in flight");
            return Ok(RefreshReport::skipped(RefreshOutcome::AlreadyRunning));
        };
        if let Some(outcome) = self.gate().await? {
            tracing::debug!(%outcome, "refresh skipped");
            return Ok(RefreshReport::skipped(outcome));
        }

        let now = self.clock.now();
        let (stats, apps) = self.todays_usage(now).await?;
        let community = self.community_mappings().await;
        let snapshot = self.load_snapshot(community)?;

        let detection = Detection {
            map: &snapshot.map,
            ignored: &snapshot.config.ignored_packages,
            apps: &apps,
        };
        let candidates = detection.candidates(&stats);
        let unmapped = detection.unmapped(&stats);

        let mut report = self.emit(now, &candidates)?;
        tracing::info!(
            candidates = candidates.len(),
            emitted = report.emitted.len(),
            failed = report.failed_appends,
            unmapped = unmapped.len(),
            "refresh completed"
        );

        let mut state = self.state.lock();
        state.unmapped.clone_from(&unmapped);
        state.last_sync = Some(now.with_timezone(&Utc));
        drop(state);

        report.unmapped = unmapped;
        Ok(report)
    }

    /// Diffs candidates against the watermark and records the increments.
    ///
    /// The watermark only advances for deltas that reached durable storage.
    fn emit(
        &self,
        now: DateTime<FixedOffset>,
        candidates: &[Candidate],
    ) -> Result<RefreshReport, TrackerError> {
        let cached = self.state.lock().watermark.clone();
        let mut store = self.store.lock();
        let mut watermark = match cached {
            Some(watermark) => watermark,
            None => store::load_json(&mut *store, WATERMARK_KEY)?,
        };

        let rolled_over = watermark.roll_over(now);
        let deltas = plan_deltas(&watermark, candidates, self.config.min_delta_minutes);

        let mut emitted = Vec::new();
        let mut failed_appends = 0;
        let mut persist_failures = Vec::new();

        if self.config.auto_append {
            for delta in &deltas {
                match store.add_session(&delta.game_name, delta.delta_minutes) {
                    Ok(()) => {
                        tracing::info!(
                            package = %delta.package_name,
                            game = %delta.game_name,
                            delta = delta.delta_minutes,
                            "session appended"
                        );
                        watermark.advance(&delta.package_name, delta.cumulative_minutes);
                        emitted.push(detected_session(delta, true));
                    }
                    Err(err) => {
                        tracing::warn!(
                            package = %delta.package_name,
                            error = %err,
                            "session append failed"
                        );
                        failed_appends += 1;
                    }
                }
            }
        } else if !deltas.is_empty() {
            let mut pending: Vec<AutoTrackedSession> =
                store::load_json(&mut *store, PENDING_SESSIONS_KEY)?;
            // An id already queued covers the same minutes; it still counts as recorded.
            let sessions: Vec<_> = deltas
                .iter()
                .map(|d| detected_session(d, false))
                .filter(|session| !pending.iter().any(|queued| queued.id == session.id))
                .collect();
            merge_sessions_without_duplicates(&mut pending, sessions.iter().cloned());
            match store::save_json(&mut *store, PENDING_SESSIONS_KEY, &pending) {
                Ok(()) => {
                    for delta in &deltas {
                        watermark.advance(&delta.package_name, delta.cumulative_minutes);
                    }
                    tracing::info!(
                        count = sessions.len(),
                        already_queued = deltas.len() - sessions.len(),
                        "sessions queued as pending"
                    );
                    emitted = sessions;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to queue pending sessions");
                    failed_appends += deltas.len();
                    persist_failures.push(err.to_string());
                }
            }
        }

        watermark.mark_synced_at(now);
        if let Err(err) = store::save_json(&mut *store, WATERMARK_KEY, &watermark) {
            tracing::warn!(error = %err, "failed to persist watermark");
            persist_failures.push(err.to_string());
        }
        drop(store);
        self.state.lock().watermark = Some(watermark);

        let persist = if persist_failures.is_empty() {
            PersistStatus::Saved
        } else {
            PersistStatus::Failed(persist_failures.join("; "))
        };
        Ok(RefreshReport {
            outcome: RefreshOutcome::Completed,
            emitted,
            failed_appends,
            rolled_over,
            unmapped: Vec::new(),
            persist,
        })
    }

    /// Marks a package as not a game and deletes sessions already recorded for it.
    ///
    /// The watermark is left alone. Returns the number of log sessions removed.
    pub async fn ignore_package(&self, package_name: &str) -> Result<usize, TrackerError> {
        let apps = self.display_names(&[package_name.to_string()]).await;
        let community = self.community_mappings().await;
        let snapshot = self.load_snapshot(community)?;
        let game_name = Detection {
            map: &snapshot.map,
            ignored: &snapshot.config.ignored_packages,
            apps: &apps,
        }
        .game_name(package_name, None);

        let mut config = snapshot.config;
        config.ignored_packages.insert(package_name.to_string());

        let removed = {
            let mut store = self.store.lock();
            store::save_json(&mut *store, BACKGROUND_CONFIG_KEY, &config)?;
            let removed = store.remove_sessions_for_game(&game_name)?;

            let mut pending: Vec<AutoTrackedSession> =
                store::load_json(&mut *store, PENDING_SESSIONS_KEY)?;
            let before = pending.len();
            pending.retain(|session| session.package_name != package_name);
            if pending.len() != before {
                store::save_json(&mut *store, PENDING_SESSIONS_KEY, &pending)?;
            }
            removed
        };

        let mut state = self.state.lock();
        state.unmapped.retain(|game| game.package_name != package_name);
        state.untracked.retain(|game| game.package_name != package_name);
        drop(state);

        tracing::info!(package = %package_name, game = %game_name, removed, "package ignored");
        Ok(removed)
    }

    /// Makes an ignored package eligible again. Returns whether it was ignored.
    pub fn unignore_package(&self, package_name: &str) -> Result<bool, TrackerError> {
        let mut store = self.store.lock();
        let mut config: BackgroundConfig = store::load_json(&mut *store, BACKGROUND_CONFIG_KEY)?;
        if !config.ignored_packages.remove(package_name) {
            return Ok(false);
        }
        store::save_json(&mut *store, BACKGROUND_CONFIG_KEY, &config)?;
        Ok(true)
    }

    /// Every auto-tracked session still held in the pending list.
    pub fn auto_sessions(&self) -> Result<Vec<AutoTrackedSession>, TrackerError> {
        Ok(store::load_json(&mut *self.store.lock(), PENDING_SESSIONS_KEY)?)
    }

    pub fn pending_sessions(&self) -> Result<Vec<AutoTrackedSession>, TrackerError> {
        let mut sessions = self.auto_sessions()?;
        sessions.retain(|session| !session.synced);
        Ok(sessions)
    }

    /// Promotes one pending session into the log.
    ///
    /// Returns `false` when the session was already synced; the log is untouched then.
    pub fn sync_session(&self, id: &str) -> Result<bool, TrackerError> {
        let mut store = self.store.lock();
        let mut sessions: Vec<AutoTrackedSession> =
            store::load_json(&mut *store, PENDING_SESSIONS_KEY)?;
        let session = sessions
            .iter_mut()
            .find(|session| session.id == id)
            .ok_or_else(|| TrackerError::SessionNotFound(id.to_string()))?;
        if session.synced {
            return Ok(false);
        }
        store.add_session(&session.game_name, session.duration)?;
        session.synced = true;
        store::save_json(&mut *store, PENDING_SESSIONS_KEY, &sessions)?;
        Ok(true)
    }

    /// Promotes every pending session. Returns how many were promoted.
    ///
    /// Progress is saved even when an append fails part-way.
    pub fn sync_all_sessions(&self) -> Result<usize, TrackerError> {
        let mut store = self.store.lock();
        let mut sessions: Vec<AutoTrackedSession> =
            store::load_json(&mut *store, PENDING_SESSIONS_KEY)?;
        let mut promoted = 0;
        let mut failure = None;
        for session in sessions.iter_mut().filter(|session| !session.synced) {
            if let Err(err) = store.add_session(&session.game_name, session.duration) {
                failure = Some(err);
                break;
            }
            session.synced = true;
            promoted += 1;
        }
        if promoted > 0 {
            store::save_json(&mut *store, PENDING_SESSIONS_KEY, &sessions)?;
        }
        match failure {
            Some(err) => Err(err.into()),
            None => Ok(promoted),
        }
    }

    /// Fuzzy-matches unmapped games and persists the accepted matches as learned mappings.
    pub async fn learn_unmapped<G: GameSearch>(
        &self,
        unmapped: &[UnmappedGame],
        matcher: &FuzzyMatcher<G>,
    ) -> Result<Vec<LearnedMapping>, TrackerError> {
        let names: Vec<String> = unmapped
            .iter()
            .map(|game| {
                game.display_name
                    .clone()
                    .unwrap_or_else(|| format_package_name(&game.package_name))
            })
            .collect();
        let answers = matcher.match_batch(&names).await;

        let learned: Vec<LearnedMapping> = unmapped
            .iter()
            .zip(answers)
            .filter_map(|(game, answer)| {
                answer.map(|found| LearnedMapping {
                    package_name: game.package_name.clone(),
                    game_name: found.game.name,
                    score: found.score,
                })
            })
            .collect();
        if learned.is_empty() {
            return Ok(learned);
        }

        {
            let mut store = self.store.lock();
            let mut mappings: BTreeMap<String, String> =
                store::load_json(&mut *store, LEARNED_MAPPINGS_KEY)?;
            for mapping in &learned {
                mappings.insert(mapping.package_name.clone(), mapping.game_name.clone());
            }
            store::save_json(&mut *store, LEARNED_MAPPINGS_KEY, &mappings)?;
        }
        self.state
            .lock()
            .unmapped
            .retain(|game| !learned.iter().any(|m| m.package_name == game.package_name));
        tracing::info!(count = learned.len(), "learned package mappings");
        Ok(learned)
    }

    /// Drops cached community mappings so the next cycle refetches them.
    pub fn invalidate_community_mappings(&self) {
        self.community.invalidate();
    }
}

fn detected_session(delta: &SessionDelta, synced: bool) -> AutoTrackedSession {
    AutoTrackedSession {
        id: AutoTrackedSession::make_id(
            &delta.package_name,
            delta.detected_at,
            delta.cumulative_minutes,
        ),
        package_name: delta.package_name.clone(),
        game_name: delta.game_name.clone(),
        duration: delta.delta_minutes,
        detected_at: delta.detected_at,
        synced,
        source: SessionSource::Auto,
    }
}
