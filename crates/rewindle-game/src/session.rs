// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-game session state: played-song tracking, the current and prefetched
//! songs, and the score history for one player's run.

use chrono::Utc;
use rewindle_domain::{score, LeaderboardEntry, PlayableSong, ScoringMode};
use std::collections::HashSet;
use tracing::debug;

/// Outcome of one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundScore {
    pub song_label: String,
    pub guess: i32,
    pub actual: i32,
    pub score: u32,
    pub elapsed_seconds: u32,
    pub timed_out: bool,
}

/// State for one player's game.
///
/// The played sets grow monotonically for the duration of the game and are
/// only reset when the game ends or the filters change. The prefetched song
/// is speculative: by the time it is promoted, the played sets may have
/// changed, so promotion re-validates it.
#[derive(Debug)]
pub struct GameSession {
    pub player: String,
    pub start_year: i32,
    pub end_year: i32,
    pub genre: String,
    scoring_mode: ScoringMode,
    max_guess_time: u32,
    played_ids: HashSet<String>,
    played_keys: HashSet<String>,
    current_song: Option<PlayableSong>,
    next_song_cache: Option<PlayableSong>,
    scores: Vec<RoundScore>,
    round: u32,
}

impl GameSession {
    pub fn new(
        player: impl Into<String>,
        start_year: i32,
        end_year: i32,
        genre: impl Into<String>,
        scoring_mode: ScoringMode,
        max_guess_time: u32,
    ) -> Self {
        Self {
            player: player.into(),
            start_year,
            end_year,
            genre: genre.into(),
            scoring_mode,
            max_guess_time,
            played_ids: HashSet::new(),
            played_keys: HashSet::new(),
            current_song: None,
            next_song_cache: None,
            scores: Vec::new(),
            round: 0,
        }
    }

    pub fn played_ids(&self) -> &HashSet<String> {
        &self.played_ids
    }

    pub fn played_keys(&self) -> &HashSet<String> {
        &self.played_keys
    }

    pub fn current_song(&self) -> Option<&PlayableSong> {
        self.current_song.as_ref()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn scores(&self) -> &[RoundScore] {
        &self.scores
    }

    pub fn total_score(&self) -> u64 {
        self.scores.iter().map(|round| round.score as u64).sum()
    }

    pub fn songs_played(&self) -> u32 {
        self.scores.len() as u32
    }

    /// Stores a speculatively fetched next song.
    pub fn store_prefetched(&mut self, song: PlayableSong) {
        self.next_song_cache = Some(song);
    }

    /// Takes the prefetched song if it is still valid against the played
    /// sets. A stale one (played in the meantime) is discarded.
    pub fn take_prefetched(&mut self) -> Option<PlayableSong> {
        let song = self.next_song_cache.take()?;
        if self.played_ids.contains(&song.id) || self.played_keys.contains(&song.dedupe_key) {
            debug!(target: "session", id = %song.id, "discarding stale prefetched song");
            return None;
        }
        Some(song)
    }

    /// Begins a round with the given song, marking it as played.
    pub fn begin_round(&mut self, song: PlayableSong) {
        self.played_ids.insert(song.id.clone());
        self.played_keys.insert(song.dedupe_key.clone());
        self.round += 1;
        self.current_song = Some(song);
    }

    /// Records the guess for the current round and returns its score entry.
    /// A timed-out guess is scored at the timeout boundary regardless of how
    /// long the player actually took.
    pub fn record_guess(
        &mut self,
        guess_year: i32,
        elapsed_seconds: u32,
        timed_out: bool,
    ) -> Option<&RoundScore> {
        let song = self.current_song.as_ref()?;
        let scored_elapsed = if timed_out {
            self.max_guess_time
        } else {
            elapsed_seconds
        };
        let round = RoundScore {
            song_label: format!("{} by {}", song.title, song.artist),
            guess: guess_year,
            actual: song.release_year,
            score: score(
                guess_year,
                song.release_year,
                scored_elapsed,
                0,
                self.scoring_mode,
            ),
            elapsed_seconds,
            timed_out,
        };
        self.scores.push(round);
        self.scores.last()
    }

    /// Applies new filters, wiping the played sets and speculative state:
    /// a different genre or range is a different pool of songs.
    pub fn change_filters(&mut self, start_year: i32, end_year: i32, genre: impl Into<String>) {
        self.start_year = start_year;
        self.end_year = end_year;
        self.genre = genre.into();
        self.played_ids.clear();
        self.played_keys.clear();
        self.next_song_cache = None;
        self.current_song = None;
    }

    /// Ends the game: builds a leaderboard entry (when at least one round
    /// was played) and resets all per-game state.
    pub fn finish(&mut self) -> Option<LeaderboardEntry> {
        let entry = if self.songs_played() > 0 {
            Some(LeaderboardEntry::new(
                self.player.clone(),
                self.total_score(),
                self.songs_played(),
                self.genre.clone(),
                Utc::now(),
            ))
        } else {
            None
        };

        self.played_ids.clear();
        self.played_keys.clear();
        self.current_song = None;
        self.next_song_cache = None;
        self.scores.clear();
        self.round = 0;

        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, artist: &str, title: &str, year: i32) -> PlayableSong {
        PlayableSong {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: "Album".to_string(),
            release_year: year,
            preview_url: "https://cdn.example/p.mp3".to_string(),
            image_url: None,
            external_url: "https://songs.example/t".to_string(),
            dedupe_key: format!("{}|{}", artist.to_lowercase(), title.to_lowercase()),
        }
    }

    fn session() -> GameSession {
        GameSession::new("Ana", 1995, 2005, "All Genres", ScoringMode::AccuracyAndSpeed, 30)
    }

    #[test]
    fn begin_round_marks_song_as_played() {
        let mut session = session();
        session.begin_round(song("a", "Artist A", "Track A", 1999));

        assert_eq!(session.round(), 1);
        assert!(session.played_ids().contains("a"));
        assert!(session.played_keys().contains("artist a|track a"));
    }

    #[test]
    fn stale_prefetch_is_discarded_on_promotion() {
        let mut session = session();
        session.store_prefetched(song("a", "Artist A", "Track A", 1999));
        // The same song gets played before the prefetch is promoted.
        session.begin_round(song("a", "Artist A", "Track A", 1999));

        assert!(session.take_prefetched().is_none());
    }

    #[test]
    fn valid_prefetch_is_promoted() {
        let mut session = session();
        session.begin_round(song("a", "Artist A", "Track A", 1999));
        session.store_prefetched(song("b", "Artist B", "Track B", 2001));

        let promoted = session.take_prefetched().unwrap();
        assert_eq!(promoted.id, "b");
        // Taking consumes the slot.
        assert!(session.take_prefetched().is_none());
    }

    #[test]
    fn prefetch_blocked_by_dedupe_key_alone() {
        let mut session = session();
        session.begin_round(song("id-1", "Artist A", "Track A", 1999));
        // Same song, different catalog id.
        session.store_prefetched(song("id-2", "Artist A", "Track A", 1999));

        assert!(session.take_prefetched().is_none());
    }

    #[test]
    fn record_guess_scores_current_song() {
        let mut session = session();
        session.begin_round(song("a", "Artist A", "Track A", 1999));

        let round = session.record_guess(1999, 0, false).unwrap();
        assert_eq!(round.score, 1300);
        assert_eq!(session.total_score(), 1300);
        assert_eq!(session.songs_played(), 1);
    }

    #[test]
    fn timed_out_guess_scores_at_boundary() {
        let mut session = session();
        session.begin_round(song("a", "Artist A", "Track A", 1999));

        // Exact year but timed out: accuracy 1000, no time bonus left.
        let round = session.record_guess(1999, 12, true).unwrap();
        assert_eq!(round.score, 1000);
        assert!(round.timed_out);
    }

    #[test]
    fn record_guess_without_song_is_none() {
        let mut session = session();
        assert!(session.record_guess(1999, 0, false).is_none());
    }

    #[test]
    fn changing_filters_resets_played_sets() {
        let mut session = session();
        session.begin_round(song("a", "Artist A", "Track A", 1999));
        session.store_prefetched(song("b", "Artist B", "Track B", 2001));

        session.change_filters(1980, 1989, "80s");

        assert!(session.played_ids().is_empty());
        assert!(session.played_keys().is_empty());
        assert!(session.current_song().is_none());
        assert!(session.take_prefetched().is_none());
        assert_eq!(session.genre, "80s");
    }

    #[test]
    fn finish_builds_entry_and_resets() {
        let mut session = session();
        session.begin_round(song("a", "Artist A", "Track A", 1999));
        session.record_guess(1998, 5, false);
        session.begin_round(song("b", "Artist B", "Track B", 2001));
        session.record_guess(2001, 10, false);

        let total = session.total_score();
        let entry = session.finish().unwrap();
        assert_eq!(entry.player, "Ana");
        assert_eq!(entry.total_score, total);
        assert_eq!(entry.songs_played, 2);
        assert_eq!(entry.genre, "All Genres");

        assert_eq!(session.round(), 0);
        assert_eq!(session.songs_played(), 0);
        assert!(session.played_ids().is_empty());
    }

    #[test]
    fn finish_without_rounds_yields_no_entry() {
        let mut session = session();
        assert!(session.finish().is_none());
    }
}
