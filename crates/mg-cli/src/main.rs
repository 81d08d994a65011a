use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mg_tracker::{FuzzyMatcher, LatestSearch};
use tracing_subscriber::EnvFilter;

use mg_cli::app::{build_tracker, game_search, open_database, require_game_search};
use mg_cli::commands::{
    games, ignore, mappings, pending, refresh, search, sessions, status, unmapped, watch,
};
use mg_cli::{Cli, Commands, Config, GamesAction};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init: tests may have installed a subscriber already
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut out = std::io::stdout();
    dispatch(&mut out, command, &config).await?;
    out.flush()?;
    Ok(())
}

async fn dispatch<W: Write>(out: &mut W, command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Status => {
            let tracker = build_tracker(config)?;
            status::run(out, &tracker, config).await?;
        }
        Commands::Refresh => {
            let tracker = build_tracker(config)?;
            refresh::run(out, &tracker).await?;
        }
        Commands::Watch => {
            let tracker = Arc::new(build_tracker(config)?);
            let shutdown = async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %err, "failed to listen for ctrl-c");
                }
            };
            watch::run(
                out,
                tracker,
                config.poll_interval(),
                config.refresh_interval(),
                shutdown,
            )
            .await?;
        }
        Commands::Sessions { limit, json } => {
            let db = open_database(config)?;
            sessions::run(out, &db, limit, json)?;
        }
        Commands::Pending => {
            let tracker = build_tracker(config)?;
            pending::run(out, &tracker)?;
        }
        Commands::Sync { id, all: _ } => {
            let tracker = build_tracker(config)?;
            pending::sync(out, &tracker, id.as_deref())?;
        }
        Commands::Ignore { package } => {
            let tracker = build_tracker(config)?;
            ignore::ignore(out, &tracker, &package).await?;
        }
        Commands::Unignore { package } => {
            let tracker = build_tracker(config)?;
            ignore::unignore(out, &tracker, &package)?;
        }
        Commands::Ignored => {
            let mut db = open_database(config)?;
            ignore::list(out, &mut db)?;
        }
        Commands::Map { package, game } => {
            let mut db = open_database(config)?;
            mappings::map(out, &mut db, &package, &game)?;
        }
        Commands::Unmap { package } => {
            let mut db = open_database(config)?;
            mappings::unmap(out, &mut db, &package)?;
        }
        Commands::Resolve { package } => {
            let tracker = build_tracker(config)?;
            mappings::resolve(out, &tracker, &package).await?;
        }
        Commands::Games { action } => {
            let mut db = open_database(config)?;
            match action {
                None => games::list(out, &db)?,
                Some(GamesAction::Add { name, package }) => {
                    games::add(out, &mut db, &name, package.as_deref())?;
                }
            }
        }
        Commands::Unmapped => {
            let tracker = build_tracker(config)?;
            unmapped::run(out, &tracker).await?;
        }
        Commands::Learn => {
            let tracker = build_tracker(config)?;
            let search = game_search(config)?;
            if search.is_none() {
                tracing::warn!("rawg_api_key is not configured; nothing can be matched");
            }
            let matcher = FuzzyMatcher::new(search);
            unmapped::learn(out, &tracker, &matcher).await?;
        }
        Commands::Match { name } => {
            let matcher = FuzzyMatcher::new(require_game_search(config)?);
            search::match_name(out, &matcher, &name).await?;
        }
        Commands::Search { query, limit } => {
            let latest = LatestSearch::new(require_game_search(config)?);
            search::search(out, &latest, &query, limit).await?;
        }
    }
    Ok(())
}
