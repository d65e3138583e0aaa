//! Preview catalog client: resolves short playable clips for a song.
//!
//! Queries a Deezer-shaped search endpoint with a free-text "artist title"
//! query. Lookups are memoized per lowercased `artist|title` pair for the
//! process lifetime, including misses, so a song's preview availability is
//! only ever asked about once.

use moka::sync::Cache;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const PREVIEW_API_BASE: &str = "https://api.deezer.com";

/// Default lookup timeout. Deliberately tighter than the main catalog's:
/// these calls run inside a race and a straggler must not block the round.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Preview catalog client with a process-lifetime memoization cache.
pub struct PreviewClient {
    client: Client,
    base_url: String,
    result_limit: u32,
    cache: Cache<String, Option<String>>,
}

impl PreviewClient {
    /// Creates a client with default timeout, result limit, and base URL.
    pub fn new(base_url: Option<String>) -> Self {
        Self::new_with_limits(base_url, DEFAULT_TIMEOUT, 3)
    }

    /// Creates a client with an explicit timeout and result limit.
    pub fn new_with_limits(base_url: Option<String>, timeout: Duration, result_limit: u32) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Rewindle/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|error| {
                debug!(?error, "failed to build preview HTTP client, falling back to default");
                Client::new()
            });

        Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| PREVIEW_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            result_limit,
            cache: Cache::new(10_000),
        }
    }

    /// Resolve a preview clip URL for an artist/title pair.
    ///
    /// Returns `None` when no preview exists or the lookup fails; either way
    /// the answer is cached, so repeat misses cost nothing. A lookup that
    /// completes after its race was already decided still lands here, which
    /// is deliberate: future rounds benefit from it.
    pub async fn resolve_preview(&self, artist: &str, title: &str) -> Option<String> {
        let cache_key = format!("{}|{}", artist, title).to_lowercase();
        if let Some(cached) = self.cache.get(&cache_key) {
            return cached;
        }

        let resolved = match self.search_preview(artist, title).await {
            Ok(url) => url,
            Err(error) => {
                warn!(target: "preview", artist, title, %error, "preview lookup failed");
                None
            }
        };

        self.cache.insert(cache_key, resolved.clone());
        resolved
    }

    async fn search_preview(&self, artist: &str, title: &str) -> Result<Option<String>, PreviewError> {
        let url = format!("{}/search", self.base_url);
        let query = format!("{} {}", artist, title);
        debug!(target: "preview", query = %query, "searching preview catalog");

        let response = self
            .client
            .get(&url)
            .query(&[("q", query.as_str()), ("limit", &self.result_limit.to_string())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PreviewError::HttpStatus { status, body });
        }

        let payload: SearchResponse = serde_json::from_str(&body)?;
        Ok(payload
            .data
            .into_iter()
            .find_map(|item| item.preview.filter(|preview| !preview.is_empty())))
    }
}

/// Error type returned by the preview catalog client.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Network or protocol failure, including the lookup timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status from the preview catalog.
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    /// The response body did not match the expected shape.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    preview: Option<String>,
}
