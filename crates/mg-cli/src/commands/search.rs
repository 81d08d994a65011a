//! Game-metadata lookups: one fuzzy match, or a plain search.

use std::io::Write;

use anyhow::{Context, Result};
use mg_core::{GameRecord, GameSearch};
use mg_tracker::{FuzzyMatcher, LatestSearch};

pub async fn match_name<W: Write, S: GameSearch>(
    writer: &mut W,
    matcher: &FuzzyMatcher<S>,
    name: &str,
) -> Result<()> {
    match matcher.match_name(name).await {
        Some(found) => {
            writeln!(writer, "{} (score {:.2})", found.game.name, found.score)?;
            write_details(writer, &found.game)?;
        }
        None => writeln!(writer, "No match for \"{name}\"")?,
    }
    Ok(())
}

pub async fn search<W: Write, S: GameSearch>(
    writer: &mut W,
    search: &LatestSearch<S>,
    query: &str,
    limit: usize,
) -> Result<()> {
    let games = search
        .search(query, limit)
        .await
        .with_context(|| format!("search for \"{query}\" failed"))?;
    if games.is_empty() {
        writeln!(writer, "No results.")?;
        return Ok(());
    }
    for game in &games {
        writeln!(writer, "{}  {}", game.id, game.name)?;
    }
    Ok(())
}

fn write_details<W: Write>(writer: &mut W, game: &GameRecord) -> Result<()> {
    if !game.genres.is_empty() {
        writeln!(writer, "  genres: {}", game.genres.join(", "))?;
    }
    writeln!(writer, "  rating: {:.1}", game.rating)?;
    if let Some(metacritic) = game.metacritic {
        writeln!(writer, "  metacritic: {metacritic}")?;
    }
    Ok(())
}
