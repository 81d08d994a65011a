//! External capabilities consumed by the reconciler.
//!
//! These are the seams to the OS usage-stats plugin, the game-metadata search
//! API and the community mapping feed. Implementations live elsewhere.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AppInfo, ForegroundApp, PermissionStatus, UsageStat};

/// Usage source errors.
#[derive(Debug, Error)]
pub enum UsageError {
    /// The platform call failed.
    #[error("usage query failed: {0}")]
    Query(String),
    /// The platform answered with data we could not read.
    #[error("malformed usage data: {0}")]
    Malformed(String),
}

/// OS-level per-app usage statistics.
pub trait UsageSource: Send + Sync {
    fn permission(&self) -> impl Future<Output = PermissionStatus> + Send;

    /// Aggregated foreground time per package for `[start, end]`.
    fn query_usage_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<UsageStat>, UsageError>> + Send;

    /// Foreground time per package derived from the finer-grained event log.
    fn query_event_usage(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<UsageStat>, UsageError>> + Send;

    fn current_foreground_app(
        &self,
    ) -> impl Future<Output = Result<Option<ForegroundApp>, UsageError>> + Send;

    fn app_display_names(
        &self,
        package_names: &[String],
    ) -> impl Future<Output = Result<HashMap<String, AppInfo>, UsageError>> + Send;
}

/// A game returned by the metadata search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub metacritic: Option<u32>,
    #[serde(default)]
    pub background_image: Option<String>,
}

/// Game search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The search was superseded or aborted.
    #[error("search cancelled")]
    Cancelled,
    /// Transport-level failure.
    #[error("search request failed: {0}")]
    Request(String),
    /// The API responded with an error status.
    #[error("search API error {status}: {message}")]
    Api { status: u16, message: String },
}

/// Game-metadata search.
pub trait GameSearch: Send + Sync {
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<GameRecord>, SearchError>> + Send;
}

/// An unconfigured search finds nothing.
impl<S: GameSearch> GameSearch for Option<S> {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<GameRecord>, SearchError> {
        match self {
            Some(search) => search.search(query, limit).await,
            None => Ok(Vec::new()),
        }
    }
}

/// Community mapping feed errors.
#[derive(Debug, Error)]
#[error("community mappings unavailable: {0}")]
pub struct FeedError(pub String);

/// Server-sourced, community-verified package mappings.
pub trait MappingFeed: Send + Sync {
    fn verified_mappings(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<String, String>, FeedError>> + Send;
}

/// An unconfigured feed serves no mappings.
impl<F: MappingFeed> MappingFeed for Option<F> {
    async fn verified_mappings(&self) -> Result<BTreeMap<String, String>, FeedError> {
        match self {
            Some(feed) => feed.verified_mappings().await,
            None => Ok(BTreeMap::new()),
        }
    }
}
