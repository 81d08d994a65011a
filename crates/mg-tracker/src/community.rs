//! Time-bounded cache over the community mapping feed.

use std::collections::BTreeMap;
use std::time::Duration;

use mg_core::{MappingFeed, TtlCache};
use parking_lot::Mutex;
use tokio::time::Instant;

pub const COMMUNITY_TTL: Duration = Duration::from_secs(60 * 60);

/// Serves the verified community mappings, refetching at most once per TTL.
///
/// When a fetch fails the last known mappings are served, or none at all.
pub struct CachedMappings<F> {
    feed: F,
    cache: Mutex<TtlCache<(), BTreeMap<String, String>>>,
}

impl<F: MappingFeed> CachedMappings<F> {
    pub fn new(feed: F) -> Self {
        Self::with_ttl(feed, COMMUNITY_TTL)
    }

    pub fn with_ttl(feed: F, ttl: Duration) -> Self {
        Self {
            feed,
            cache: Mutex::new(TtlCache::new(1, ttl)),
        }
    }

    pub async fn get(&self) -> BTreeMap<String, String> {
        let cached = self.cache.lock().get(&(), Instant::now().into_std());
        if let Some(mappings) = cached {
            return mappings;
        }

        match self.feed.verified_mappings().await {
            Ok(mappings) => {
                self.cache
                    .lock()
                    .insert((), mappings.clone(), Instant::now().into_std());
                mappings
            }
            Err(err) => {
                let stale = self.cache.lock().get_stale(&());
                tracing::warn!(
                    error = %err,
                    serving_stale = stale.is_some(),
                    "community mappings fetch failed"
                );
                stale.unwrap_or_default()
            }
        }
    }

    /// Drops the cached mappings so the next read refetches.
    pub fn invalidate(&self) {
        self.cache.lock().clear();
    }
}
