//! Core domain logic for Mindful Gamer auto-tracking.
//!
//! This crate contains the fundamental types and logic for:
//! - Resolution: merging package mapping layers with explicit precedence
//! - Similarity: scoring display names against game-metadata search results
//! - Reconciliation: turning cumulative daily usage into incremental sessions

pub mod cache;
pub mod catalog;
pub mod reconcile;
pub mod resolver;
pub mod similarity;
pub mod source;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod watermark;

pub use cache::TtlCache;
pub use reconcile::{Candidate, Detection, SessionDelta, merge_hybrid, plan_deltas};
pub use resolver::{MappingLayer, MappingSources, PackageMap, merge_with_precedence, resolve};
pub use source::{
    FeedError, GameRecord, GameSearch, MappingFeed, SearchError, UsageError, UsageSource,
};
pub use store::{BackgroundConfig, KeyValueStore, SessionLog, StoreError};
#[cfg(any(test, feature = "testing"))]
pub use testing::MemoryStore;
pub use types::{
    AppCategory, AppInfo, AutoTrackedSession, ForegroundApp, ForegroundStatus, LibraryGame,
    PermissionStatus, SessionSource, UnmappedGame, UntrackedGame, UsageStat,
};
pub use watermark::DailySyncWatermark;
