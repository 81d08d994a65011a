//! Auto-tracking runtime for Mindful Gamer.
//!
//! Wires the pure reconciliation logic in `mg-core` to live capabilities:
//! - [`Tracker`]: single-flight refresh cycles with backoff retries
//! - Foreground polling that reports the game currently being played
//! - [`FuzzyMatcher`] and [`CachedMappings`]: cached lookups against remote services
//! - [`LatestSearch`]: cancels superseded searches

pub mod capability;
pub mod clock;
pub mod community;
pub mod foreground;
pub mod fuzzy;
pub mod search;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use capability::Capability;
pub use clock::{Clock, ManualClock, SystemClock};
pub use community::CachedMappings;
pub use foreground::DEFAULT_POLL_INTERVAL;
pub use fuzzy::{FuzzyMatch, FuzzyMatcher};
pub use search::LatestSearch;
pub use tracker::{
    LearnedMapping, PersistStatus, RefreshOutcome, RefreshReport, Tracker, TrackerConfig,
    TrackerError, TrackerStatus,
};
