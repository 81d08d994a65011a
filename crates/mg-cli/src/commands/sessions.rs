//! Sessions command: the recent session log.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use mg_db::{Database, SessionRecord};
use serde::Serialize;

use super::util::format_minutes;

#[derive(Serialize)]
struct SessionJson<'a> {
    id: &'a str,
    game_name: &'a str,
    duration_minutes: f64,
    created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

impl<'a> From<&'a SessionRecord> for SessionJson<'a> {
    fn from(record: &'a SessionRecord) -> Self {
        Self {
            id: &record.id,
            game_name: &record.game_name,
            duration_minutes: record.duration_minutes,
            created_at: record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            note: record.note.as_deref(),
        }
    }
}

pub fn run<W: Write>(writer: &mut W, db: &Database, limit: usize, json: bool) -> Result<()> {
    let sessions = db
        .recent_sessions(limit)
        .context("failed to read sessions")?;

    if json {
        let rows: Vec<SessionJson<'_>> = sessions.iter().map(SessionJson::from).collect();
        serde_json::to_writer_pretty(&mut *writer, &rows)?;
        writeln!(writer)?;
        return Ok(());
    }

    if sessions.is_empty() {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    }
    for session in &sessions {
        writeln!(
            writer,
            "{}  {}  {}",
            session.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            session.game_name,
            format_minutes(session.duration_minutes)
        )?;
    }
    Ok(())
}
