//! Refresh command: one reconciliation cycle.

use std::io::Write;

use anyhow::{Context, Result};
use mg_tracker::{PersistStatus, RefreshOutcome, RefreshReport};

use super::util::format_minutes;
use crate::app::AppTracker;

pub async fn run<W: Write>(writer: &mut W, tracker: &AppTracker) -> Result<()> {
    let report = tracker.refresh_once().await.context("refresh failed")?;
    write_report(writer, &report)
}

pub fn write_report<W: Write>(writer: &mut W, report: &RefreshReport) -> Result<()> {
    if report.outcome != RefreshOutcome::Completed {
        writeln!(writer, "Refresh skipped: {}", report.outcome)?;
        return Ok(());
    }

    if report.rolled_over {
        writeln!(writer, "New day, watermark reset.")?;
    }
    if report.emitted.is_empty() {
        writeln!(writer, "No new sessions.")?;
    } else {
        writeln!(writer, "New sessions: {}", report.emitted.len())?;
        for session in &report.emitted {
            let pending = if session.synced { "" } else { " (pending)" };
            writeln!(
                writer,
                "- {}: {}{pending}",
                session.game_name,
                format_minutes(session.duration)
            )?;
        }
    }
    if report.failed_appends > 0 {
        writeln!(
            writer,
            "Failed to record {} session(s); they will be retried next refresh.",
            report.failed_appends
        )?;
    }
    if let PersistStatus::Failed(reason) = &report.persist {
        writeln!(writer, "Warning: tracker state not saved: {reason}")?;
    }
    if !report.unmapped.is_empty() {
        writeln!(
            writer,
            "Unmapped games: {} (see `mg unmapped`)",
            report.unmapped.len()
        )?;
    }
    Ok(())
}
