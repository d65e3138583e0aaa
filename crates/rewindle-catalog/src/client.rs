// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{CatalogError, Result};
use crate::models::{
    PlaylistItem, PlaylistSearchResponse, PlaylistTracksResponse, TokenResponse, TrackItem,
    TrackSearchResponse,
};
use rand::seq::SliceRandom;
use rand::thread_rng;
use reqwest::Client;
use rewindle_domain::{
    deduplicate_candidates, is_compilation_or_remaster, is_plausibly_english, TrackCandidate,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

const CATALOG_API_BASE: &str = "https://api.spotify.com";
const CATALOG_AUTH_URL: &str = "https://accounts.spotify.com/api/token";
const TRACK_LINK_BASE: &str = "https://open.spotify.com/track";
const USER_AGENT: &str = concat!("Rewindle/", env!("CARGO_PKG_VERSION"));

/// Hard cap on candidates cached per (year, genre) key.
const MAX_TRACKS_PER_YEAR: usize = 100;
/// Tokens are refreshed this long before their advertised expiry.
const TOKEN_EXPIRY_MARGIN: u64 = 60;

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

struct CachedTracks {
    fetched_at: Instant,
    tracks: Vec<TrackCandidate>,
}

/// Which release-year policy applies to a screened item.
///
/// The two paths intentionally answer "is this track's year reliable" in
/// different ways and are kept distinct: the chart path trusts each item's
/// own release date, the search path demands an exact match because it has
/// no chart year to fall back on.
enum YearPolicy {
    TrustRelease { chart_year: i32 },
    ExactMatch { year: i32 },
}

/// Track catalog client with token, chart-playlist, and track-list caching.
pub struct CatalogClient {
    client: Client,
    base_url: String,
    auth_url: String,
    credentials: Option<(String, String)>,
    market: String,
    min_popularity: u32,
    track_cache_ttl: Duration,
    token: Mutex<Option<CachedToken>>,
    playlist_ids: Mutex<HashMap<i32, Option<String>>>,
    track_cache: Mutex<HashMap<(i32, String), CachedTracks>>,
}

impl CatalogClient {
    /// Create a client builder for custom configuration.
    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::default()
    }

    /// Fetch screened candidate tracks for a chart year.
    ///
    /// Tries the curated year-chart playlist first (only without a genre
    /// filter), then falls back to a direct search. Every failure along the
    /// way degrades to fewer results; this call never errors. Results are
    /// freshly shuffled on every invocation, including cache hits.
    pub async fn fetch_year_tracks(&self, year: i32, genre_query: &str) -> Vec<TrackCandidate> {
        if let Some(tracks) = self.cached_year_tracks(year, genre_query).await {
            return tracks;
        }

        let token = match self.access_token().await {
            Ok(token) => token,
            Err(CatalogError::MissingCredentials) => {
                debug!(target: "catalog", "catalog access unavailable, no credentials");
                return Vec::new();
            }
            Err(error) => {
                warn!(target: "catalog", %error, "token request failed");
                return Vec::new();
            }
        };

        let mut tracks = Vec::new();

        if genre_query.is_empty() {
            if let Some(playlist_id) = self.year_playlist_id(year, &token).await {
                match self.playlist_tracks(&playlist_id, year, &token).await {
                    Ok(found) => tracks = found,
                    Err(error) => {
                        warn!(target: "catalog", year, %error, "chart playlist listing failed")
                    }
                }
            }
        }

        if tracks.is_empty() {
            match self.search_year_tracks(year, genre_query, &token).await {
                Ok(found) => tracks = found,
                Err(error) => warn!(target: "catalog", year, %error, "track search failed"),
            }
        }

        let mut tracks = deduplicate_candidates(tracks);
        tracks.shuffle(&mut thread_rng());
        tracks.truncate(MAX_TRACKS_PER_YEAR);

        debug!(target: "catalog", year, genre = genre_query, count = tracks.len(), "caching year tracks");
        self.track_cache.lock().await.insert(
            (year, genre_query.to_string()),
            CachedTracks {
                fetched_at: Instant::now(),
                tracks: tracks.clone(),
            },
        );

        tracks
    }

    /// Canonical deep link for a catalog track id.
    pub fn track_link(&self, track_id: &str) -> String {
        format!("{}/{}", TRACK_LINK_BASE, track_id)
    }

    /// Drops the chart and track caches so the next round fetches fresh
    /// selections. Called when the player changes genre or year filters.
    pub async fn clear_caches(&self) {
        self.track_cache.lock().await.clear();
        self.playlist_ids.lock().await.clear();
    }

    async fn cached_year_tracks(&self, year: i32, genre_query: &str) -> Option<Vec<TrackCandidate>> {
        let cache = self.track_cache.lock().await;
        let entry = cache.get(&(year, genre_query.to_string()))?;
        // Lazy expiry: a stale entry is treated as absent and overwritten by
        // the fresh fetch.
        if entry.fetched_at.elapsed() >= self.track_cache_ttl {
            return None;
        }
        let mut tracks = entry.tracks.clone();
        drop(cache);
        // Shuffle on read, not just on write, so repeated rounds inside the
        // TTL window still vary.
        tracks.shuffle(&mut thread_rng());
        trace!(target: "catalog", year, "serving year tracks from cache");
        Some(tracks)
    }

    async fn access_token(&self) -> Result<String> {
        let (client_id, client_secret) = self
            .credentials
            .as_ref()
            .ok_or(CatalogError::MissingCredentials)?;

        {
            let token = self.token.lock().await;
            if let Some(cached) = token.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        debug!(target: "catalog", url = %self.auth_url, "requesting access token");
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let payload: TokenResponse = self.parse_response(response).await?;

        let expires_at = Instant::now()
            + Duration::from_secs(payload.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN));
        let mut token = self.token.lock().await;
        *token = Some(CachedToken {
            access_token: payload.access_token.clone(),
            expires_at,
        });

        Ok(payload.access_token)
    }

    async fn year_playlist_id(&self, year: i32, token: &str) -> Option<String> {
        if let Some(cached) = self.playlist_ids.lock().await.get(&year) {
            return cached.clone();
        }

        let resolved = match self.search_year_playlist(year, token).await {
            Ok(id) => id,
            Err(error) => {
                warn!(target: "catalog", year, %error, "chart playlist search failed");
                None
            }
        };

        // Negative results are cached too; whether a year has a usable chart
        // does not change within a process lifetime.
        self.playlist_ids.lock().await.insert(year, resolved.clone());
        resolved
    }

    async fn search_year_playlist(&self, year: i32, token: &str) -> Result<Option<String>> {
        let url = format!("{}/v1/search", self.base_url);
        let query = format!("Top Hits {}", year);
        debug!(target: "catalog", year, "searching for year chart playlist");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("type", "playlist"), ("limit", "20")])
            .send()
            .await?;
        let payload: PlaylistSearchResponse = self.parse_response(response).await?;

        let items: Vec<PlaylistItem> = payload
            .playlists
            .unwrap_or_default()
            .items
            .into_iter()
            .flatten()
            .collect();
        let year_marker = year.to_string();

        // Prefer the curated owner whose list names the year outright.
        for item in &items {
            let name = item.name.to_lowercase();
            let owner = item.owner.display_name.to_lowercase();
            if owner.contains("spotify") && name.contains(&year_marker) {
                return Ok(Some(item.id.clone()));
            }
        }

        // Otherwise accept any community list that looks like a year-top chart.
        for item in &items {
            let name = item.name.to_lowercase();
            if name.contains("top")
                && name.contains(&year_marker)
                && (name.contains("hit") || name.contains("100"))
            {
                return Ok(Some(item.id.clone()));
            }
        }

        Ok(None)
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        chart_year: i32,
        token: &str,
    ) -> Result<Vec<TrackCandidate>> {
        let url = format!("{}/v1/playlists/{}/tracks", self.base_url, playlist_id);
        debug!(target: "catalog", playlist_id, "listing chart playlist tracks");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", "100"), ("market", self.market.as_str())])
            .send()
            .await?;
        let payload: PlaylistTracksResponse = self.parse_response(response).await?;

        let policy = YearPolicy::TrustRelease { chart_year };
        Ok(payload
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(|track| self.screen_item(track, &policy))
            .collect())
    }

    async fn search_year_tracks(
        &self,
        year: i32,
        genre_query: &str,
        token: &str,
    ) -> Result<Vec<TrackCandidate>> {
        let url = format!("{}/v1/search", self.base_url);
        let query = if genre_query.is_empty() {
            format!("year:{}", year)
        } else {
            format!("{} year:{}", genre_query, year)
        };
        debug!(target: "catalog", year, genre = genre_query, "searching tracks directly");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("type", "track"),
                ("limit", "50"),
                ("market", self.market.as_str()),
            ])
            .send()
            .await?;
        let payload: TrackSearchResponse = self.parse_response(response).await?;

        let policy = YearPolicy::ExactMatch { year };
        Ok(payload
            .tracks
            .unwrap_or_default()
            .items
            .into_iter()
            .filter_map(|track| self.screen_item(track, &policy))
            .collect())
    }

    /// Applies the per-item screens: release-year policy, compilation and
    /// Latin-script heuristics, and the popularity floor.
    fn screen_item(&self, item: TrackItem, policy: &YearPolicy) -> Option<TrackCandidate> {
        let parsed_year = parse_release_year(&item.album.release_date);
        let release_year = match *policy {
            YearPolicy::TrustRelease { chart_year } => parsed_year.unwrap_or(chart_year),
            YearPolicy::ExactMatch { year } => match parsed_year {
                Some(parsed) if parsed != year => return None,
                Some(parsed) => parsed,
                None => year,
            },
        };

        if is_compilation_or_remaster(&item.album.name) || is_compilation_or_remaster(&item.name) {
            return None;
        }

        let artist = item
            .artists
            .into_iter()
            .next()
            .map(|artist| artist.name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        if !is_plausibly_english(&item.name, &artist) {
            return None;
        }

        if item.popularity < self.min_popularity {
            return None;
        }

        Some(TrackCandidate {
            id: item.id,
            title: item.name,
            artist,
            album: item.album.name,
            release_year,
            image_url: item.album.images.into_iter().next().map(|image| image.url),
            popularity: item.popularity,
        })
    }

    async fn parse_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        trace!(target: "catalog", "response body: {}", body);
        Ok(serde_json::from_str(&body)?)
    }
}

/// First four characters of the release date string, when they parse.
fn parse_release_year(release_date: &str) -> Option<i32> {
    release_date.get(..4)?.parse().ok()
}

/// Builder for configuring a catalog client.
#[derive(Debug)]
pub struct CatalogClientBuilder {
    base_url: String,
    auth_url: String,
    credentials: Option<(String, String)>,
    market: String,
    min_popularity: u32,
    track_cache_ttl: Duration,
    timeout: Duration,
}

impl Default for CatalogClientBuilder {
    fn default() -> Self {
        Self {
            base_url: CATALOG_API_BASE.to_string(),
            auth_url: CATALOG_AUTH_URL.to_string(),
            credentials: None,
            market: "US".to_string(),
            min_popularity: 50,
            track_cache_ttl: Duration::from_secs(60),
            timeout: Duration::from_secs(5),
        }
    }
}

impl CatalogClientBuilder {
    /// Set the client-credentials pair used for token resolution.
    pub fn credentials(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.credentials = Some((client_id.into(), client_secret.into()));
        self
    }

    /// Set a custom API base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a custom token endpoint (useful for testing).
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.market = market.into();
        self
    }

    pub fn min_popularity(mut self, floor: u32) -> Self {
        self.min_popularity = floor;
        self
    }

    pub fn track_cache_ttl(mut self, ttl: Duration) -> Self {
        self.track_cache_ttl = ttl;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the catalog client.
    pub fn build(self) -> Result<CatalogClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(CatalogClient {
            client,
            base_url: self.base_url,
            auth_url: self.auth_url,
            credentials: self.credentials,
            market: self.market,
            min_popularity: self.min_popularity,
            track_cache_ttl: self.track_cache_ttl,
            token: Mutex::new(None),
            playlist_ids: Mutex::new(HashMap::new()),
            track_cache: Mutex::new(HashMap::new()),
        })
    }
}
