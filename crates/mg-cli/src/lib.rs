//! Mindful Gamer CLI library.
//!
//! This crate provides the `mg` command-line interface and the wiring between
//! configuration, storage, remote services and the tracker.

pub mod app;
mod cli;
pub mod commands;
mod config;
pub mod usage;

pub use cli::{Cli, Commands, GamesAction};
pub use config::Config;
