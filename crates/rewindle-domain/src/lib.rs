// SPDX-License-Identifier: GPL-3.0-or-later

//! Core data model for the song-year guessing game.
//!
//! Everything in this crate is pure: candidate/song records, the dedup rule,
//! text screening heuristics, the score function, and the genre presets.
//! Network access and session bookkeeping live in the other crates.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod genres;
pub mod score;
pub mod text;

pub use genres::{find_genre, GenrePreset, GENRES};
pub use score::{score, ScoringMode};
pub use text::{is_compilation_or_remaster, is_plausibly_english, strip_numerals};

/// One catalog entry before a preview clip has been resolved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCandidate {
    /// Opaque catalog identifier, unique within the catalog.
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Parsed from the release date; falls back to the chart year when the
    /// date string is unusable.
    pub release_year: i32,
    pub image_url: Option<String>,
    /// 0-100 popularity number, used only as a pre-filter threshold.
    pub popularity: u32,
}

impl TrackCandidate {
    /// Lowercase `artist|title` composite used to collapse the same song
    /// appearing in multiple chart lists.
    pub fn dedupe_key(&self) -> String {
        dedupe_key(&self.artist, &self.title)
    }
}

/// Builds the canonical dedup key for an artist/title pair.
pub fn dedupe_key(artist: &str, title: &str) -> String {
    format!("{}|{}", artist.to_lowercase(), title.to_lowercase())
}

/// Collapses duplicate candidates by dedup key, keeping the first occurrence.
///
/// Uniqueness is only enforced within one fetch; a reissue may reappear under
/// a different chart year and that is accepted.
pub fn deduplicate_candidates(candidates: Vec<TrackCandidate>) -> Vec<TrackCandidate> {
    let mut seen: HashSet<String> = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.dedupe_key()))
        .collect()
}

/// A track candidate enriched with a resolved preview clip.
///
/// Created only once a preview has been found; immutable thereafter. The
/// title has numerals stripped so a song cannot leak its own year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableSong {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub release_year: i32,
    /// Short streamable clip, externally hosted.
    pub preview_url: String,
    pub image_url: Option<String>,
    /// Deep link to the canonical catalog entry.
    pub external_url: String,
    /// Key computed from the original (unstripped) title.
    pub dedupe_key: String,
}

impl PlayableSong {
    pub fn from_candidate(
        candidate: TrackCandidate,
        preview_url: String,
        external_url: String,
    ) -> Self {
        let dedupe_key = candidate.dedupe_key();
        Self {
            id: candidate.id,
            title: text::strip_numerals(&candidate.title),
            artist: candidate.artist,
            album: candidate.album,
            release_year: candidate.release_year,
            preview_url,
            image_url: candidate.image_url,
            external_url,
            dedupe_key,
        }
    }
}

/// One finished game on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player: String,
    pub total_score: u64,
    pub songs_played: u32,
    pub avg_score: u64,
    pub genre: String,
    pub date: String,
}

impl LeaderboardEntry {
    /// Builds an entry, deriving the rounded average and the display date.
    /// Dates are rendered in AEDT (UTC+11), matching the existing table data.
    pub fn new(
        player: impl Into<String>,
        total_score: u64,
        songs_played: u32,
        genre: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let avg_score = if songs_played > 0 {
            (total_score as f64 / songs_played as f64).round() as u64
        } else {
            0
        };
        let aedt = FixedOffset::east_opt(11 * 3600).expect("valid fixed offset");
        Self {
            player: player.into(),
            total_score,
            songs_played,
            avg_score,
            genre: genre.into(),
            date: now.with_timezone(&aedt).format("%b %d").to_string(),
        }
    }
}
