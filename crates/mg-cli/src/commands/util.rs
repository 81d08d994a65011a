//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use mg_core::BackgroundConfig;
use mg_core::store::{self, BACKGROUND_CONFIG_KEY};
use mg_db::Database;

/// Formats minutes with one decimal, e.g. `7.5 min`.
pub fn format_minutes(minutes: f64) -> String {
    format!("{minutes:.1} min")
}

pub fn load_background_config(db: &mut Database) -> Result<BackgroundConfig> {
    store::load_json(db, BACKGROUND_CONFIG_KEY).context("failed to read background configuration")
}

pub fn save_background_config(db: &mut Database, config: &BackgroundConfig) -> Result<()> {
    store::save_json(db, BACKGROUND_CONFIG_KEY, config)
        .context("failed to write background configuration")
}
