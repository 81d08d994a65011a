//! Unmapped games and learning mappings for them.

use std::io::Write;

use anyhow::{Context, Result};
use mg_core::GameSearch;
use mg_tracker::FuzzyMatcher;

use super::util::format_minutes;
use crate::app::AppTracker;

pub async fn run<W: Write>(writer: &mut W, tracker: &AppTracker) -> Result<()> {
    let unmapped = tracker
        .detect_unmapped()
        .await
        .context("failed to detect unmapped games")?;
    if unmapped.is_empty() {
        writeln!(writer, "No unmapped games.")?;
        return Ok(());
    }
    for game in &unmapped {
        writeln!(
            writer,
            "{}  {}  {}",
            game.package_name,
            game.display_name.as_deref().unwrap_or("-"),
            format_minutes(game.total_time_in_foreground)
        )?;
    }
    Ok(())
}

pub async fn learn<W: Write, S: GameSearch>(
    writer: &mut W,
    tracker: &AppTracker,
    matcher: &FuzzyMatcher<S>,
) -> Result<()> {
    let unmapped = tracker
        .detect_unmapped()
        .await
        .context("failed to detect unmapped games")?;
    if unmapped.is_empty() {
        writeln!(writer, "No unmapped games.")?;
        return Ok(());
    }

    let learned = tracker
        .learn_unmapped(&unmapped, matcher)
        .await
        .context("failed to save learned mappings")?;
    for mapping in &learned {
        writeln!(
            writer,
            "Learned {} -> {} (score {:.2})",
            mapping.package_name, mapping.game_name, mapping.score
        )?;
    }
    writeln!(
        writer,
        "Matched {} of {} unmapped game(s)",
        learned.len(),
        unmapped.len()
    )?;
    Ok(())
}
