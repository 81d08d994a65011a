//! RAWG game-metadata search.
//!
//! <https://rawg.io/apidocs>

use std::fmt;

use mg_core::{GameRecord, GameSearch, SearchError};
use serde::Deserialize;

use crate::{RemoteError, build_http, read_body};

pub const DEFAULT_BASE_URL: &str = "https://api.rawg.io/api";

/// RAWG API client.
///
/// Cloning shares the underlying HTTP connection pool.
#[derive(Clone)]
pub struct RawgClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for RawgClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawgClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RawgClient {
    /// Creates a new client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, RemoteError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RemoteError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(RemoteError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        Ok(Self {
            http: build_http()?,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn search_request(
        &self,
        query: &str,
        page_size: usize,
    ) -> Result<reqwest::Request, RemoteError> {
        let page_size = page_size.to_string();
        let request = self
            .http
            .get(format!("{}/games", self.base_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("search", query),
                ("page_size", page_size.as_str()),
                ("search_precise", "true"),
            ])
            .build()?;
        Ok(request)
    }

    /// Searches games by title. A blank query returns no results without a request.
    pub async fn search_games(
        &self,
        query: &str,
        page_size: usize,
    ) -> Result<Vec<GameRecord>, RemoteError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.search_request(query, page_size)?;
        let response = self.http.execute(request).await?;
        let body = read_body(response).await?;
        let games = parse_search_response(&body)?;
        tracing::debug!(query, results = games.len(), "game search");
        Ok(games)
    }
}

impl GameSearch for RawgClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<GameRecord>, SearchError> {
        Ok(self.search_games(query, limit).await?)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawgGame>,
}

#[derive(Debug, Deserialize)]
struct RawgGame {
    id: u64,
    name: String,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    metacritic: Option<u32>,
    #[serde(default)]
    background_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

fn parse_search_response(body: &str) -> Result<Vec<GameRecord>, RemoteError> {
    let payload: SearchResponse =
        serde_json::from_str(body).map_err(|err| RemoteError::InvalidResponse(err.to_string()))?;
    Ok(payload
        .results
        .into_iter()
        .map(|game| GameRecord {
            id: game.id,
            name: game.name,
            genres: game.genres.into_iter().map(|genre| genre.name).collect(),
            rating: game.rating,
            metacritic: game.metacritic,
            background_image: game.background_image,
        })
        .collect())
}
