//! Foreground polling: what is being played right now.

use std::time::Duration;

use mg_core::{
    Detection, ForegroundStatus, KeyValueStore, MappingFeed, SessionLog, UntrackedGame,
    UsageSource,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::tracker::{Tracker, TrackerError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

impl<U, S, F> Tracker<U, S, F>
where
    U: UsageSource + 'static,
    S: SessionLog + KeyValueStore + 'static,
    F: MappingFeed + 'static,
{
    /// Samples the foreground app once and updates the playing status.
    ///
    /// A game absent from the user's library is recorded as untracked; only the
    /// current foreground game is flagged as playing.
    pub async fn poll_foreground(&self) -> Result<ForegroundStatus, TrackerError> {
        let Some(app) = self.usage.current_foreground_app().await? else {
            let mut state = self.state.lock();
            for game in &mut state.untracked {
                game.is_currently_playing = false;
            }
            state.foreground = ForegroundStatus::default();
            return Ok(ForegroundStatus::default());
        };

        let apps = self.display_names(std::slice::from_ref(&app.package_name)).await;
        let community = self.community_mappings().await;
        let snapshot = self.load_snapshot(community)?;
        let detection = Detection {
            map: &snapshot.map,
            ignored: &snapshot.config.ignored_packages,
            apps: &apps,
        };

        let package = app.package_name.as_str();
        let is_game = !detection.ignored.contains(package) && detection.is_game(package);
        let status = if is_game {
            ForegroundStatus {
                is_playing: true,
                package_name: Some(app.package_name.clone()),
                game_name: Some(detection.game_name(package, None)),
            }
        } else {
            ForegroundStatus::default()
        };
        let in_library = snapshot
            .config
            .user_library_games
            .iter()
            .any(|game| game.package() == Some(package));

        let mut state = self.state.lock();
        for game in &mut state.untracked {
            game.is_currently_playing = false;
        }
        if is_game && !in_library {
            let display_name = status.game_name.clone().unwrap_or_default();
            match state.untracked.iter_mut().find(|game| game.package_name == package) {
                Some(game) => game.is_currently_playing = true,
                None => {
                    tracing::info!(package, game = %display_name, "untracked game in foreground");
                    state.untracked.push(UntrackedGame {
                        package_name: app.package_name.clone(),
                        display_name,
                        first_seen: app.timestamp,
                        is_currently_playing: true,
                    });
                }
            }
        }
        state.foreground = status.clone();
        drop(state);

        Ok(status)
    }

    /// Polls the foreground app every `interval` until cancelled.
    ///
    /// Stops on its own when the capability is missing, permission is revoked
    /// or auto-tracking is switched off.
    pub async fn run_foreground_poll(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.gate().await {
                        Ok(None) => {}
                        Ok(Some(outcome)) => {
                            tracing::info!(%outcome, "foreground polling stopped");
                            break;
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "foreground poll skipped");
                            continue;
                        }
                    }
                    match self.poll_foreground().await {
                        Ok(status) => {
                            tracing::trace!(playing = status.is_playing, "foreground polled");
                        }
                        Err(err) => tracing::warn!(error = %err, "foreground poll failed"),
                    }
                }
                () = cancel.cancelled() => {
                    tracing::info!("foreground polling shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mg_core::store::{self, BACKGROUND_CONFIG_KEY};
    use mg_core::{BackgroundConfig, LibraryGame, PermissionStatus};

    use super::*;
    use crate::testing::{FakeUsage, tracker_with};
    use crate::tracker::TrackerConfig;

    const MINECRAFT: &str = "com.mojang.minecraftpe";

    #[tokio::test]
    async fn game_in_foreground_is_playing_and_untracked() {
        let usage = FakeUsage::granted();
        usage.set_foreground(Some(MINECRAFT));
        let (tracker, _clock) = tracker_with(usage.clone(), TrackerConfig::default());

        let status = tracker.poll_foreground().await.unwrap();
        assert!(status.is_playing);
        assert_eq!(status.game_name.as_deref(), Some("Minecraft"));

        let untracked = tracker.status().untracked;
        assert_eq!(untracked.len(), 1);
        assert!(untracked[0].is_currently_playing);

        usage.set_foreground(Some("com.android.chrome"));
        let status = tracker.poll_foreground().await.unwrap();
        assert!(!status.is_playing);
        let untracked = tracker.status().untracked;
        assert_eq!(untracked.len(), 1);
        assert!(!untracked[0].is_currently_playing);
    }

    #[tokio::test]
    async fn library_games_are_not_untracked() {
        let usage = FakeUsage::granted();
        usage.set_foreground(Some(MINECRAFT));
        let (tracker, _clock) = tracker_with(usage, TrackerConfig::default());
        tracker.with_store(|store| {
            let config = BackgroundConfig {
                user_library_games: vec![LibraryGame {
                    id: "g1".to_string(),
                    name: "Minecraft".to_string(),
                    package_name: Some(MINECRAFT.to_string()),
                }],
                ..BackgroundConfig::default()
            };
            store::save_json(store, BACKGROUND_CONFIG_KEY, &config).unwrap();
        });

        let status = tracker.poll_foreground().await.unwrap();
        assert!(status.is_playing);
        assert!(tracker.status().untracked.is_empty());
    }

    #[tokio::test]
    async fn first_seen_is_kept_across_polls() {
        let usage = FakeUsage::granted();
        usage.set_foreground(Some(MINECRAFT));
        let (tracker, _clock) = tracker_with(usage, TrackerConfig::default());
        tracker.poll_foreground().await.unwrap();
        let first = tracker.status().untracked[0].first_seen;
        tracker.poll_foreground().await.unwrap();
        let untracked = tracker.status().untracked;
        assert_eq!(untracked.len(), 1);
        assert_eq!(untracked[0].first_seen, first);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_loop_stops_on_cancel() {
        let usage = FakeUsage::granted();
        usage.set_foreground(Some(MINECRAFT));
        let (tracker, _clock) = tracker_with(usage, TrackerConfig::default());
        let cancel = CancellationToken::new();

        let task = {
            let tracker = Arc::clone(&tracker);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tracker.run_foreground_poll(Duration::from_secs(30), cancel).await;
            })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(tracker.status().foreground.is_playing);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn poll_loop_stops_when_permission_revoked() {
        let usage = FakeUsage::granted();
        let (tracker, _clock) = tracker_with(usage.clone(), TrackerConfig::default());
        usage.set_permission(PermissionStatus::Denied);

        // returns without cancellation
        tracker
            .run_foreground_poll(Duration::from_secs(30), CancellationToken::new())
            .await;
    }
}
