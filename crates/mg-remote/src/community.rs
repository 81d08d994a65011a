//! Community-contributed package mappings.

use std::collections::BTreeMap;

use mg_core::{FeedError, MappingFeed};
use serde::Deserialize;

use crate::{RemoteError, build_http, read_body};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Pending,
    Verified,
    Rejected,
}

/// One contributed mapping as served by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecord {
    pub package_name: String,
    pub game_name: String,
    pub status: MappingStatus,
    #[serde(default)]
    pub vote_count: i64,
}

/// Keeps verified records only; the most-voted record per package wins.
pub fn verified_mappings(mut records: Vec<MappingRecord>) -> BTreeMap<String, String> {
    records.retain(|record| record.status == MappingStatus::Verified);
    records.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));

    let mut mappings = BTreeMap::new();
    for record in records {
        mappings
            .entry(record.package_name)
            .or_insert(record.game_name);
    }
    mappings
}

/// HTTP feed returning a JSON array of [`MappingRecord`]s.
#[derive(Debug, Clone)]
pub struct CommunityFeed {
    http: reqwest::Client,
    url: String,
}

impl CommunityFeed {
    pub fn new(url: impl Into<String>) -> Result<Self, RemoteError> {
        Ok(Self {
            http: build_http()?,
            url: url.into(),
        })
    }

    pub async fn fetch(&self) -> Result<BTreeMap<String, String>, RemoteError> {
        let response = self.http.get(&self.url).send().await?;
        let body = read_body(response).await?;
        let records: Vec<MappingRecord> = serde_json::from_str(&body)
            .map_err(|err| RemoteError::InvalidResponse(err.to_string()))?;
        let mappings = verified_mappings(records);
        tracing::info!(count = mappings.len(), "loaded verified community mappings");
        Ok(mappings)
    }
}

impl MappingFeed for CommunityFeed {
    async fn verified_mappings(&self) -> Result<BTreeMap<String, String>, FeedError> {
        Ok(self.fetch().await?)
    }
}
