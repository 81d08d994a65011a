//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mindful Gamer auto-tracking.
///
/// Turns the device's cumulative per-app usage into incremental play sessions.
#[derive(Debug, Parser)]
#[command(name = "mg", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show permission, watermark and today's totals.
    Status,

    /// Run one reconciliation cycle.
    Refresh,

    /// Poll the foreground app and refresh periodically until Ctrl-C.
    Watch,

    /// List recently recorded sessions.
    Sessions {
        /// Number of sessions to show.
        #[arg(long, default_value_t = mg_db::DEFAULT_RECENT_LIMIT)]
        limit: usize,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List auto-tracked sessions waiting to be synced.
    Pending,

    /// Promote pending sessions into the session log.
    Sync {
        /// Session id to promote.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Promote every pending session.
        #[arg(long)]
        all: bool,
    },

    /// Stop tracking a package and delete its recorded sessions.
    Ignore {
        /// Package name (e.g. com.android.chrome).
        package: String,
    },

    /// Resume tracking an ignored package.
    Unignore { package: String },

    /// List ignored packages.
    Ignored,

    /// Map a package to a game name.
    Map { package: String, game: String },

    /// Remove a custom mapping.
    Unmap { package: String },

    /// List or add library games.
    Games {
        #[command(subcommand)]
        action: Option<GamesAction>,
    },

    /// Show which game a package resolves to.
    Resolve { package: String },

    /// List game-like packages with no mapping.
    Unmapped,

    /// Fuzzy-match a name against the game-metadata API.
    Match { name: String },

    /// Search the game-metadata API.
    Search {
        query: String,

        /// Maximum results.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Fuzzy-match unmapped games and remember the matches.
    Learn,
}

#[derive(Debug, Subcommand)]
pub enum GamesAction {
    /// Add a game to the library.
    Add {
        name: String,

        /// Android package the game is installed as.
        #[arg(long)]
        package: Option<String>,
    },
}
