//! Pending and sync commands: manual promotion of auto-tracked sessions.

use std::io::Write;

use anyhow::{Context, Result};

use super::util::format_minutes;
use crate::app::AppTracker;

pub fn run<W: Write>(writer: &mut W, tracker: &AppTracker) -> Result<()> {
    let pending = tracker
        .pending_sessions()
        .context("failed to read pending sessions")?;
    if pending.is_empty() {
        writeln!(writer, "No pending sessions.")?;
        return Ok(());
    }
    for session in &pending {
        writeln!(
            writer,
            "{}  {}  {}",
            session.id,
            session.game_name,
            format_minutes(session.duration)
        )?;
    }
    Ok(())
}

pub fn sync<W: Write>(writer: &mut W, tracker: &AppTracker, id: Option<&str>) -> Result<()> {
    match id {
        Some(id) => {
            if tracker.sync_session(id)? {
                writeln!(writer, "Synced {id}")?;
            } else {
                writeln!(writer, "{id} was already synced")?;
            }
        }
        None => {
            let promoted = tracker
                .sync_all_sessions()
                .context("failed to sync pending sessions")?;
            writeln!(writer, "Synced {promoted} session(s)")?;
        }
    }
    Ok(())
}
