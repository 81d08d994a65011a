//! Ignore, unignore and ignored commands.

use std::io::Write;

use anyhow::{Context, Result};
use mg_db::Database;

use super::util::load_background_config;
use crate::app::AppTracker;

pub async fn ignore<W: Write>(writer: &mut W, tracker: &AppTracker, package: &str) -> Result<()> {
    let removed = tracker
        .ignore_package(package)
        .await
        .with_context(|| format!("failed to ignore {package}"))?;
    writeln!(writer, "Ignoring {package} (removed {removed} session(s))")?;
    Ok(())
}

pub fn unignore<W: Write>(writer: &mut W, tracker: &AppTracker, package: &str) -> Result<()> {
    if tracker.unignore_package(package)? {
        writeln!(writer, "Tracking {package} again")?;
    } else {
        writeln!(writer, "{package} was not ignored")?;
    }
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, db: &mut Database) -> Result<()> {
    let config = load_background_config(db)?;
    if config.ignored_packages.is_empty() {
        writeln!(writer, "No ignored packages.")?;
        return Ok(());
    }
    for package in &config.ignored_packages {
        writeln!(writer, "{package}")?;
    }
    Ok(())
}
