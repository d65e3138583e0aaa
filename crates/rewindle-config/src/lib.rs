// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use rewindle_domain::ScoringMode;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Client-credentials pair for the track catalog. When absent, catalog
    /// access degrades to empty results rather than failing.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Overridable for tests; None means the public API endpoint.
    pub base_url: Option<String>,
    pub auth_url: Option<String>,
    pub market: String,
    /// Tracks below this popularity are not eligible.
    pub min_popularity: u32,
    /// Age after which a cached per-year track list is treated as absent.
    pub track_cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: None,
            auth_url: None,
            market: "US".to_string(),
            min_popularity: 50,
            track_cache_ttl_secs: 60,
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub base_url: Option<String>,
    /// Tight timeout: preview lookups run inside a race and a slow straggler
    /// must not hold up the round.
    pub timeout_ms: u64,
    pub result_limit: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 2000,
            result_limit: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// How many shuffled candidates get preview lookups per attempt.
    pub race_pool_size: usize,
    /// Concurrent preview lookups allowed inside one race.
    pub max_concurrent_lookups: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            race_pool_size: 12,
            max_concurrent_lookups: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub mode: ScoringMode,
    /// Seconds before a round locks and scores at the timeout boundary.
    pub max_guess_time: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::AccuracyAndSpeed,
            max_guess_time: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Remote table endpoint; when absent the leaderboard is in-memory only.
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub max_entries: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            max_entries: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub preview: PreviewConfig,
    pub selection: SelectionConfig,
    pub scoring: ScoringConfig,
    pub leaderboard: LeaderboardConfig,
    pub telemetry: TelemetryConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: REWINDLE_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("REWINDLE_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
