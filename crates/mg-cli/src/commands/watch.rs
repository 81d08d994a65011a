//! Watch command: foreground polling plus periodic refresh.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mg_core::ForegroundStatus;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::refresh::write_report;
use crate::app::AppTracker;

/// Runs until `shutdown` resolves.
pub async fn run<W: Write>(
    writer: &mut W,
    tracker: Arc<AppTracker>,
    poll_interval: Duration,
    refresh_interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let poller = {
        let tracker = Arc::clone(&tracker);
        let cancel = cancel.clone();
        tokio::spawn(async move { tracker.run_foreground_poll(poll_interval, cancel).await })
    };

    let mut ticker = tokio::time::interval(refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut shown = ForegroundStatus::default();
    tokio::pin!(shutdown);

    writeln!(writer, "Watching for play sessions (Ctrl-C to stop)")?;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match tracker.refresh().await {
                    Ok(report) if !report.emitted.is_empty() || report.failed_appends > 0 => {
                        write_report(writer, &report)?;
                    }
                    Ok(_) => {}
                    Err(err) => writeln!(writer, "Refresh failed: {err} (retrying in background)")?,
                }
                let foreground = tracker.status().foreground;
                if foreground != shown {
                    match &foreground.game_name {
                        Some(game) if foreground.is_playing => {
                            writeln!(writer, "Now playing: {game}")?;
                        }
                        _ => writeln!(writer, "Not playing")?,
                    }
                    shown = foreground;
                }
            }
            () = &mut shutdown => break,
        }
    }

    cancel.cancel();
    tracker.cancel_retry();
    poller.await.context("foreground poller panicked")?;
    if let Some(error) = tracker.last_error() {
        writeln!(writer, "Last error: {error}")?;
    }
    writeln!(writer, "Stopped.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::Config;
    use crate::app::build_tracker;
    use crate::usage::SNAPSHOT_FILE;

    #[tokio::test]
    async fn watch_records_and_reports_foreground() {
        let temp = tempfile::tempdir().unwrap();
        let usage_dir = temp.path().join("usage");
        std::fs::create_dir_all(&usage_dir).unwrap();
        let now = Utc::now().timestamp_millis();
        let snapshot = serde_json::json!({
            "permission": "granted",
            "stats": [{"packageName": "com.mojang.minecraftpe", "totalTimeInForeground": 420_000, "lastTimeUsed": now}],
            "foreground": {"packageName": "com.mojang.minecraftpe", "timestamp": now},
        });
        std::fs::write(usage_dir.join(SNAPSHOT_FILE), snapshot.to_string()).unwrap();

        let config = Config {
            database_path: temp.path().join("mg.db"),
            usage_dir,
            ..Config::default()
        };
        let tracker = Arc::new(build_tracker(&config).unwrap());

        let mut output = Vec::new();
        run(
            &mut output,
            Arc::clone(&tracker),
            Duration::from_millis(20),
            Duration::from_millis(50),
            tokio::time::sleep(Duration::from_millis(300)),
        )
        .await
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("- Minecraft: 7.0 min"), "{output}");
        assert!(output.contains("Now playing: Minecraft"), "{output}");
        assert!(output.ends_with("Stopped.\n"), "{output}");
        tracker.with_store(|db| assert_eq!(db.recent_sessions(5).unwrap().len(), 1));
    }
}
