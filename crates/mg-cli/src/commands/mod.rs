//! CLI subcommand implementations.

pub mod games;
pub mod ignore;
pub mod mappings;
pub mod pending;
pub mod refresh;
pub mod search;
pub mod sessions;
pub mod status;
pub mod unmapped;
pub mod util;
pub mod watch;
