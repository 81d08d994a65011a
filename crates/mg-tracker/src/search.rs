//! Last-write-wins game search.

use mg_core::{GameRecord, GameSearch, SearchError};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Wraps a search so that each new query cancels the one still in flight.
///
/// A cancelled query resolves to an empty result rather than an error.
pub struct LatestSearch<S> {
    search: S,
    current: Mutex<Option<CancellationToken>>,
}

impl<S: GameSearch> LatestSearch<S> {
    pub fn new(search: S) -> Self {
        Self {
            search,
            current: Mutex::new(None),
        }
    }

    /// Cancels whatever query is in flight.
    pub fn cancel(&self) {
        if let Some(token) = self.current.lock().take() {
            token.cancel();
        }
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<GameRecord>, SearchError> {
        let token = CancellationToken::new();
        let previous = self.current.lock().replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let result = tokio::select! {
            () = token.cancelled() => Err(SearchError::Cancelled),
            result = self.search.search(query, limit) => result,
        };

        match result {
            Err(SearchError::Cancelled) => {
                tracing::debug!(query, "search superseded");
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    struct SlowSearch;

    impl GameSearch for SlowSearch {
        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<GameRecord>, SearchError> {
            let delay = if query == "slow" { 100 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if query == "broken" {
                return Err(SearchError::Api {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                });
            }
            Ok(vec![GameRecord {
                id: 1,
                name: query.to_string(),
                genres: Vec::new(),
                rating: 0.0,
                metacritic: None,
                background_image: None,
            }])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn newer_query_supersedes_older() {
        let search = Arc::new(LatestSearch::new(SlowSearch));
        let first = {
            let search = Arc::clone(&search);
            tokio::spawn(async move { search.search("slow", 5).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        let second = search.search("fast", 5).await.unwrap();

        assert_eq!(second[0].name, "fast");
        assert!(first.await.unwrap().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn errors_still_propagate() {
        let search = LatestSearch::new(SlowSearch);
        let err = search.search("broken", 5).await.unwrap_err();
        assert!(matches!(err, SearchError::Api { status: 500, .. }));
    }
}
