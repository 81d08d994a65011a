//! Custom mapping and resolution commands.

use std::io::Write;

use anyhow::{Result, bail};
use mg_core::resolver::format_package_name;
use mg_db::Database;

use super::util::{load_background_config, save_background_config};
use crate::app::AppTracker;

pub fn map<W: Write>(writer: &mut W, db: &mut Database, package: &str, game: &str) -> Result<()> {
    let package = package.trim();
    let game = game.trim();
    if package.is_empty() || game.is_empty() {
        bail!("package and game name must not be empty");
    }
    let mut config = load_background_config(db)?;
    config
        .user_mappings
        .insert(package.to_string(), game.to_string());
    save_background_config(db, &config)?;
    writeln!(writer, "Mapped {package} -> {game}")?;
    Ok(())
}

pub fn unmap<W: Write>(writer: &mut W, db: &mut Database, package: &str) -> Result<()> {
    let mut config = load_background_config(db)?;
    if config.user_mappings.remove(package).is_none() {
        writeln!(writer, "No custom mapping for {package}")?;
        return Ok(());
    }
    save_background_config(db, &config)?;
    writeln!(writer, "Removed mapping for {package}")?;
    Ok(())
}

pub async fn resolve<W: Write>(writer: &mut W, tracker: &AppTracker, package: &str) -> Result<()> {
    match tracker.resolve_package(package).await? {
        Some(resolved) => writeln!(
            writer,
            "{package} -> {} ({})",
            resolved.game_name, resolved.layer
        )?,
        None => writeln!(
            writer,
            "{package} is not mapped (shown as \"{}\")",
            format_package_name(package)
        )?,
    }
    Ok(())
}
