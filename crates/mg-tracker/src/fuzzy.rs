//! Fuzzy matching of display names against the game-metadata search.

use std::time::Duration;

use futures::future::join_all;
use mg_core::similarity::{best_match, normalize_title};
use mg_core::{GameRecord, GameSearch, SearchError, TtlCache};
use parking_lot::Mutex;
use tokio::time::Instant;

/// Results requested per search.
pub const MAX_SEARCH_RESULTS: usize = 5;
/// Searches in flight at once during batch matching.
pub const BATCH_SIZE: usize = 3;
pub const CACHE_CAPACITY: usize = 256;
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// An accepted match between a display name and a catalog game.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub query: String,
    pub game: GameRecord,
    pub score: f64,
}

/// Matches names through a [`GameSearch`], caching answers by normalized query.
///
/// Misses are cached as well as hits. Failed searches are not cached.
pub struct FuzzyMatcher<S> {
    search: S,
    cache: Mutex<TtlCache<String, Option<FuzzyMatch>>>,
}

impl<S: GameSearch> FuzzyMatcher<S> {
    pub fn new(search: S) -> Self {
        Self::with_cache(search, TtlCache::new(CACHE_CAPACITY, CACHE_TTL))
    }

    pub fn with_cache(search: S, cache: TtlCache<String, Option<FuzzyMatch>>) -> Self {
        Self {
            search,
            cache: Mutex::new(cache),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Best search result scoring at or above the match threshold.
    ///
    /// Network failures degrade to `None`.
    pub async fn match_name(&self, display_name: &str) -> Option<FuzzyMatch> {
        let key = normalize_title(display_name);
        if key.is_empty() {
            return None;
        }

        let cached = self.cache.lock().get(&key, Instant::now().into_std());
        if let Some(answer) = cached {
            tracing::trace!(query = %key, hit = answer.is_some(), "fuzzy cache hit");
            return answer;
        }

        let results = match self.search.search(display_name, MAX_SEARCH_RESULTS).await {
            Ok(results) => results,
            Err(SearchError::Cancelled) => {
                tracing::debug!(query = %key, "fuzzy search cancelled");
                return None;
            }
            Err(err) => {
                tracing::warn!(query = %key, error = %err, "fuzzy search failed");
                return None;
            }
        };

        let answer = best_match(display_name, &results, |game| game.name.as_str()).map(
            |(game, score)| FuzzyMatch {
                query: display_name.to_string(),
                game: game.clone(),
                score,
            },
        );
        tracing::debug!(
            query = %key,
            matched = answer.as_ref().map(|m| m.game.name.as_str()),
            "fuzzy match"
        );
        self.cache
            .lock()
            .insert(key, answer.clone(), Instant::now().into_std());
        answer
    }

    /// Matches many names, [`BATCH_SIZE`] at a time, preserving input order.
    pub async fn match_batch(&self, display_names: &[String]) -> Vec<Option<FuzzyMatch>> {
        let mut answers = Vec::with_capacity(display_names.len());
        for group in display_names.chunks(BATCH_SIZE) {
            let results = join_all(group.iter().map(|name| self.match_name(name))).await;
            answers.extend(results);
        }
        answers
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn game(id: u64, name: &str) -> GameRecord {
        GameRecord {
            id,
            name: name.to_string(),
            genres: Vec::new(),
            rating: 0.0,
            metacritic: None,
            background_image: None,
        }
    }

    #[derive(Default)]
    struct FakeSearch {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        fail: bool,
    }

    impl GameSearch for FakeSearch {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<GameRecord>, SearchError> {
            assert_eq!(limit, MAX_SEARCH_RESULTS);
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                return Err(SearchError::Request("connection reset".to_string()));
            }
            Ok(match query {
                "Stardew Valley" => vec![game(1, "Stardew Valley"), game(2, "Stardew Valley: Deluxe")],
                "Call of Duty" => vec![game(3, "Call of Duty: Mobile")],
                _ => vec![game(9, "Something Else Entirely")],
            })
        }
    }

    #[tokio::test]
    async fn exact_title_matches() {
        let matcher = FuzzyMatcher::new(FakeSearch::default());
        let found = matcher.match_name("Stardew Valley").await.unwrap();
        assert_eq!(found.game.id, 1);
        assert!((found.score - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn containment_matches_with_lower_score() {
        let matcher = FuzzyMatcher::new(FakeSearch::default());
        let found = matcher.match_name("Call of Duty").await.unwrap();
        assert_eq!(found.game.id, 3);
        assert!((found.score - 0.9).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn misses_are_cached() {
        let matcher = FuzzyMatcher::new(FakeSearch::default());
        assert!(matcher.match_name("Tapper").await.is_none());
        assert!(matcher.match_name("  tapper! ").await.is_none());
        assert_eq!(matcher.search.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_degrade_and_are_not_cached() {
        let matcher = FuzzyMatcher::new(FakeSearch {
            fail: true,
            ..FakeSearch::default()
        });
        assert!(matcher.match_name("Stardew Valley").await.is_none());
        assert!(matcher.match_name("Stardew Valley").await.is_none());
        assert_eq!(matcher.search.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cached_answers_expire() {
        let matcher = FuzzyMatcher::new(FakeSearch::default());
        matcher.match_name("Stardew Valley").await;
        tokio::time::advance(CACHE_TTL + Duration::from_secs(1)).await;
        matcher.match_name("Stardew Valley").await;
        assert_eq!(matcher.search.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_bound_concurrency_and_keep_order() {
        let matcher = FuzzyMatcher::new(FakeSearch::default());
        let names: Vec<String> = ["Stardew Valley", "a", "b", "Call of Duty", "c", "d", "e"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let answers = matcher.match_batch(&names).await;

        assert_eq!(answers.len(), names.len());
        assert_eq!(answers[0].as_ref().map(|m| m.game.id), Some(1));
        assert_eq!(answers[3].as_ref().map(|m| m.game.id), Some(3));
        assert!(answers[1].is_none());
        assert_eq!(matcher.search.peak.load(Ordering::SeqCst), BATCH_SIZE);
    }
}
