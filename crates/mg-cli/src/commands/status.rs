//! Status command: permission, watermark and today's totals.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use mg_tracker::clock::start_of_local_day;

use super::util::{format_minutes, load_background_config};
use crate::Config;
use crate::app::AppTracker;

pub async fn run<W: Write>(writer: &mut W, tracker: &AppTracker, config: &Config) -> Result<()> {
    let permission = tracker.permission().await;
    let watermark = tracker.watermark().context("failed to read watermark")?;
    let pending = tracker.pending_sessions().context("failed to read pending sessions")?;

    let now = Local::now().fixed_offset();
    let start = start_of_local_day(now);
    let (enabled, today) = tracker.with_store(|db| -> Result<_> {
        let background = load_background_config(db)?;
        let today = db.minutes_between(start, now.with_timezone(&Utc))?;
        Ok((background.auto_tracking_enabled, today))
    })?;

    writeln!(writer, "Mindful Gamer status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Permission: {permission}")?;
    writeln!(
        writer,
        "Auto-tracking: {}",
        if enabled { "enabled" } else { "disabled" }
    )?;
    match watermark.last_sync_date {
        Some(at) => writeln!(
            writer,
            "Last sync: {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )?,
        None => writeln!(writer, "Last sync: never")?,
    }
    writeln!(writer, "Today: {}", format_minutes(today))?;
    writeln!(writer, "Pending sessions: {}", pending.len())?;

    if watermark.synced.is_empty() {
        writeln!(writer, "Watermark: empty")?;
        return Ok(());
    }
    writeln!(writer, "Watermark:")?;
    for (package, minutes) in &watermark.synced {
        writeln!(writer, "- {package}: {}", format_minutes(*minutes))?;
    }

    Ok(())
}
