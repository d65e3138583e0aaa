// SPDX-License-Identifier: GPL-3.0-or-later

//! Leaderboard persistence: a REST-backed store, an in-memory store, and a
//! facade that degrades from the remote store to the local one on failure.

use async_trait::async_trait;
use reqwest::Client;
use rewindle_domain::LeaderboardEntry;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("leaderboard API returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("failed to deserialize leaderboard response: {0}")]
    Deserialization(#[from] serde_json::Error),
}

/// Anything that can persist finished games and return the top scores.
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    async fn load_top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;

    async fn insert(&self, entry: &LeaderboardEntry) -> Result<(), LeaderboardError>;
}

/// Store backed by a PostgREST-style `leaderboard` table.
pub struct RestLeaderboard {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestLeaderboard {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/leaderboard", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LeaderboardStore for RestLeaderboard {
    async fn load_top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let response = self
            .client
            .get(self.table_url())
            .query(&[
                ("select", "*"),
                ("order", "total_score.desc"),
                ("limit", &limit.to_string()),
            ])
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LeaderboardError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let entries: Vec<LeaderboardEntry> = serde_json::from_str(&body)?;
        debug!(target: "leaderboard", count = entries.len(), "loaded remote leaderboard");
        Ok(entries)
    }

    async fn insert(&self, entry: &LeaderboardEntry) -> Result<(), LeaderboardError> {
        let response = self
            .client
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=minimal")
            .json(entry)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeaderboardError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Process-local store, used standalone or as the fallback behind a remote.
#[derive(Default)]
pub struct MemoryLeaderboard {
    entries: Mutex<Vec<LeaderboardEntry>>,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaderboardStore for MemoryLeaderboard {
    async fn load_top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().take(limit).cloned().collect())
    }

    async fn insert(&self, entry: &LeaderboardEntry) -> Result<(), LeaderboardError> {
        let mut entries = self.entries.lock().await;
        entries.push(entry.clone());
        entries.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        Ok(())
    }
}

/// Leaderboard facade: prefers the remote store, keeps a local copy, and
/// degrades to the local copy when the remote fails. A game never aborts
/// over leaderboard trouble.
pub struct Leaderboard {
    remote: Option<RestLeaderboard>,
    local: MemoryLeaderboard,
    max_entries: usize,
}

impl Leaderboard {
    pub fn new(remote: Option<RestLeaderboard>, max_entries: usize) -> Self {
        Self {
            remote,
            local: MemoryLeaderboard::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Top entries, highest total score first, capped at the configured size.
    pub async fn top_entries(&self) -> Vec<LeaderboardEntry> {
        if let Some(remote) = self.remote.as_ref() {
            match remote.load_top(self.max_entries).await {
                Ok(entries) => return entries,
                Err(error) => {
                    warn!(target: "leaderboard", error = %error, "remote load failed, using local entries");
                }
            }
        }
        self.local
            .load_top(self.max_entries)
            .await
            .unwrap_or_default()
    }

    /// Saves a finished game. The local copy is always updated; a remote
    /// failure is logged and swallowed.
    pub async fn save(&self, entry: &LeaderboardEntry) {
        if let Err(error) = self.local.insert(entry).await {
            warn!(target: "leaderboard", error = %error, "local insert failed");
        }
        if let Some(remote) = self.remote.as_ref() {
            if let Err(error) = remote.insert(entry).await {
                warn!(target: "leaderboard", error = %error, "remote insert failed, entry kept locally");
            }
        }
    }
}
