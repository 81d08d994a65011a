//! Library commands.

use std::io::Write;

use anyhow::{Context, Result};
use mg_db::Database;

use super::util::format_minutes;

pub fn list<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let games = db.list_games().context("failed to read library")?;
    if games.is_empty() {
        writeln!(writer, "Library is empty.")?;
        return Ok(());
    }
    for game in &games {
        let package = game.package_name.as_deref().unwrap_or("-");
        writeln!(
            writer,
            "{}  {package}  {}",
            game.name,
            format_minutes(game.total_minutes)
        )?;
    }
    Ok(())
}

pub fn add<W: Write>(
    writer: &mut W,
    db: &mut Database,
    name: &str,
    package: Option<&str>,
) -> Result<()> {
    let game = db
        .add_game(name, package)
        .with_context(|| format!("failed to add {name}"))?;
    match &game.package_name {
        Some(package) => writeln!(writer, "Added {} ({package})", game.name)?,
        None => writeln!(writer, "Added {}", game.name)?,
    }
    Ok(())
}
