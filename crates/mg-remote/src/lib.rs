//! HTTP integrations for Mindful Gamer.
//!
//! - [`RawgClient`]: game-metadata search used by fuzzy matching
//! - [`CommunityFeed`]: community-verified package mappings

mod community;
mod rawg;

use std::time::Duration;

use mg_core::{FeedError, SearchError};
use thiserror::Error;

pub use community::{CommunityFeed, MappingRecord, MappingStatus, verified_mappings};
pub use rawg::{DEFAULT_BASE_URL, RawgClient};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote client errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<RemoteError> for SearchError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Api { status, message } => Self::Api { status, message },
            other => Self::Request(other.to_string()),
        }
    }
}

impl From<RemoteError> for FeedError {
    fn from(err: RemoteError) -> Self {
        Self(err.to_string())
    }
}

fn build_http() -> Result<reqwest::Client, RemoteError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(RemoteError::ClientBuild)
}

async fn read_body(response: reqwest::Response) -> Result<String, RemoteError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(RemoteError::Api {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .map_or_else(|| body.clone(), str::to_string),
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_status_for_search() {
        let err = SearchError::from(RemoteError::Api {
            status: 401,
            message: "Unauthorized".to_string(),
        });
        assert!(matches!(err, SearchError::Api { status: 401, .. }));
    }

    #[test]
    fn other_errors_become_request_failures() {
        let err = SearchError::from(RemoteError::InvalidResponse("eof".to_string()));
        assert!(matches!(err, SearchError::Request(message) if message.contains("eof")));
    }
}
