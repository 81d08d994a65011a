//! Construction of the tracker and remote clients from configuration.

use anyhow::{Context, Result};
use mg_db::Database;
use mg_remote::{CommunityFeed, RawgClient};
use mg_tracker::{Capability, Tracker};

use crate::Config;
use crate::usage::SnapshotUsageSource;

pub type AppTracker = Tracker<SnapshotUsageSource, Database, Option<CommunityFeed>>;

/// Opens the database, creating its parent directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

pub fn community_feed(config: &Config) -> Result<Option<CommunityFeed>> {
    config
        .community_mappings_url
        .as_deref()
        .map(CommunityFeed::new)
        .transpose()
        .context("failed to create community mapping client")
}

/// Search client, or `None` when no API key is configured.
pub fn game_search(config: &Config) -> Result<Option<RawgClient>> {
    let Some(api_key) = config.rawg_api_key.as_deref() else {
        return Ok(None);
    };
    let client = RawgClient::new(api_key)
        .context("failed to create game search client")?
        .with_base_url(config.rawg_base_url.as_str());
    Ok(Some(client))
}

/// Like [`game_search`], but a missing API key is an error.
pub fn require_game_search(config: &Config) -> Result<RawgClient> {
    game_search(config)?.context("rawg_api_key is not configured (set MG_RAWG_API_KEY)")
}

pub fn build_tracker(config: &Config) -> Result<AppTracker> {
    let db = open_database(config)?;
    let usage = Capability::detect(SnapshotUsageSource::discover(&config.usage_dir));
    if !usage.is_available() {
        tracing::info!(dir = %config.usage_dir.display(), "usage capability unavailable");
    }
    let feed = community_feed(config)?;
    Ok(Tracker::new(usage, db, feed, config.tracker_config()))
}
