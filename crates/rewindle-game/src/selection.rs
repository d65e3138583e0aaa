// SPDX-License-Identifier: GPL-3.0-or-later

//! Candidate race: picks a playable song out of a year range.
//!
//! Years are tried in a freshly shuffled order. For each year the candidate
//! list is screened against the played sets and the requested year window,
//! then a bounded pool of shuffled candidates gets concurrent preview
//! lookups. The first candidate whose lookup yields a clip wins; the losers
//! are left to finish on their own, which harmlessly warms the preview cache.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::thread_rng;
use rewindle_catalog::CatalogClient;
use rewindle_config::SelectionConfig;
use rewindle_domain::{PlayableSong, TrackCandidate};
use rewindle_preview::PreviewClient;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, trace};

/// Source of screened candidate tracks for a chart year.
#[async_trait]
pub trait TrackSource: Send + Sync {
    async fn tracks_for_year(&self, year: i32, genre_query: &str) -> Vec<TrackCandidate>;

    /// Deep link to the canonical catalog entry for a track id.
    fn external_url(&self, track_id: &str) -> String;
}

/// Source of short preview clips for an artist/title pair.
#[async_trait]
pub trait PreviewSource: Send + Sync {
    async fn preview_url(&self, artist: &str, title: &str) -> Option<String>;
}

#[async_trait]
impl TrackSource for CatalogClient {
    async fn tracks_for_year(&self, year: i32, genre_query: &str) -> Vec<TrackCandidate> {
        self.fetch_year_tracks(year, genre_query).await
    }

    fn external_url(&self, track_id: &str) -> String {
        self.track_link(track_id)
    }
}

#[async_trait]
impl PreviewSource for PreviewClient {
    async fn preview_url(&self, artist: &str, title: &str) -> Option<String> {
        self.resolve_preview(artist, title).await
    }
}

/// Bounds for one selection attempt.
#[derive(Debug, Clone, Copy)]
pub struct SelectionOptions {
    /// How many shuffled candidates per year get preview lookups.
    pub race_pool_size: usize,
    /// Concurrent lookups allowed inside one race.
    pub max_concurrent_lookups: usize,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            race_pool_size: 12,
            max_concurrent_lookups: 8,
        }
    }
}

impl From<&SelectionConfig> for SelectionOptions {
    fn from(config: &SelectionConfig) -> Self {
        Self {
            race_pool_size: config.race_pool_size.max(1),
            max_concurrent_lookups: config.max_concurrent_lookups.max(1),
        }
    }
}

/// Orchestrates track fetching and the preview race.
pub struct SongSelector {
    tracks: Arc<dyn TrackSource>,
    previews: Arc<dyn PreviewSource>,
    options: SelectionOptions,
}

impl SongSelector {
    pub fn new(
        tracks: Arc<dyn TrackSource>,
        previews: Arc<dyn PreviewSource>,
        options: SelectionOptions,
    ) -> Self {
        Self {
            tracks,
            previews,
            options,
        }
    }

    /// Pick a random playable song from the year range.
    ///
    /// Never returns a song whose id or dedup key is already in the played
    /// sets, and never one whose release year falls outside the range.
    /// Returns `None` once every year has been exhausted; the caller decides
    /// whether that means "range played out" or "range has nothing".
    pub async fn select_song(
        &self,
        start_year: i32,
        end_year: i32,
        played_ids: &HashSet<String>,
        played_keys: &HashSet<String>,
        genre_query: &str,
    ) -> Option<PlayableSong> {
        let mut years: Vec<i32> = (start_year..=end_year).collect();
        years.shuffle(&mut thread_rng());

        for year in years {
            let tracks = self.tracks.tracks_for_year(year, genre_query).await;
            if tracks.is_empty() {
                continue;
            }

            let mut available: Vec<TrackCandidate> = tracks
                .into_iter()
                .filter(|track| {
                    !played_ids.contains(&track.id)
                        && !played_keys.contains(&track.dedupe_key())
                        // A track surfaced under this chart year can still
                        // have a true release year outside the window.
                        && (start_year..=end_year).contains(&track.release_year)
                })
                .collect();

            if available.is_empty() {
                trace!(target: "selection", year, "no unplayed candidates for year");
                continue;
            }

            available.shuffle(&mut thread_rng());
            available.truncate(self.options.race_pool_size);

            debug!(target: "selection", year, pool = available.len(), "racing preview lookups");
            if let Some(song) = self.race_previews(available).await {
                return Some(song);
            }
        }

        debug!(target: "selection", start_year, end_year, "year range exhausted without a playable song");
        None
    }

    /// Runs bounded concurrent preview lookups over the pool and returns the
    /// first candidate that resolves a clip. Pool members that lose the race
    /// are not interrupted; their lookups run to completion in the background
    /// and populate the preview cache.
    async fn race_previews(&self, pool: Vec<TrackCandidate>) -> Option<PlayableSong> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_lookups));
        let (tx, mut rx) = mpsc::channel(pool.len().max(1));

        for candidate in pool {
            let previews = Arc::clone(&self.previews);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let preview = previews
                    .preview_url(&candidate.artist, &candidate.title)
                    .await;
                // The receiver is gone once a winner was picked; that is fine.
                let _ = tx.send((candidate, preview)).await;
            });
        }
        drop(tx);

        while let Some((candidate, preview)) = rx.recv().await {
            if let Some(preview_url) = preview {
                let external_url = self.tracks.external_url(&candidate.id);
                debug!(
                    target: "selection",
                    artist = %candidate.artist,
                    year = candidate.release_year,
                    "preview race won"
                );
                return Some(PlayableSong::from_candidate(
                    candidate,
                    preview_url,
                    external_url,
                ));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewindle_domain::dedupe_key;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct StubTracks {
        by_year: HashMap<i32, Vec<TrackCandidate>>,
    }

    #[async_trait]
    impl TrackSource for StubTracks {
        async fn tracks_for_year(&self, year: i32, _genre_query: &str) -> Vec<TrackCandidate> {
            self.by_year.get(&year).cloned().unwrap_or_default()
        }

        fn external_url(&self, track_id: &str) -> String {
            format!("https://songs.example/{}", track_id)
        }
    }

    struct StubPreviews {
        previews: HashMap<String, String>,
        slow_keys: HashSet<String>,
        completed: Mutex<Vec<String>>,
    }

    impl StubPreviews {
        fn new(pairs: &[(&str, &str, &str)]) -> Self {
            Self {
                previews: pairs
                    .iter()
                    .map(|(artist, title, url)| (dedupe_key(artist, title), url.to_string()))
                    .collect(),
                slow_keys: HashSet::new(),
                completed: Mutex::new(Vec::new()),
            }
        }

        fn slow(mut self, artist: &str, title: &str) -> Self {
            self.slow_keys.insert(dedupe_key(artist, title));
            self
        }
    }

    #[async_trait]
    impl PreviewSource for StubPreviews {
        async fn preview_url(&self, artist: &str, title: &str) -> Option<String> {
            let key = dedupe_key(artist, title);
            if self.slow_keys.contains(&key) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.completed.lock().unwrap().push(key.clone());
            self.previews.get(&key).cloned()
        }
    }

    fn candidate(id: &str, artist: &str, title: &str, year: i32) -> TrackCandidate {
        TrackCandidate {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: format!("{} Album", title),
            release_year: year,
            image_url: None,
            popularity: 80,
        }
    }

    fn selector(tracks: StubTracks, previews: Arc<StubPreviews>) -> SongSelector {
        SongSelector::new(Arc::new(tracks), previews, SelectionOptions::default())
    }

    #[tokio::test]
    async fn returns_candidate_with_resolved_preview() {
        let tracks = StubTracks {
            by_year: HashMap::from([(
                1999,
                vec![candidate("a", "Artist A", "Track A", 1999)],
            )]),
        };
        let previews = Arc::new(StubPreviews::new(&[(
            "Artist A",
            "Track A",
            "https://cdn.example/a.mp3",
        )]));
        let selector = selector(tracks, previews);

        let song = selector
            .select_song(1999, 1999, &HashSet::new(), &HashSet::new(), "")
            .await
            .unwrap();

        assert_eq!(song.id, "a");
        assert_eq!(song.preview_url, "https://cdn.example/a.mp3");
        assert_eq!(song.external_url, "https://songs.example/a");
    }

    #[tokio::test]
    async fn release_year_outside_range_is_rejected() {
        // Surfaced under the 1999 chart, but actually released in 1990.
        let tracks = StubTracks {
            by_year: HashMap::from([(
                1999,
                vec![
                    candidate("old", "Artist O", "Track O", 1990),
                    candidate("ok", "Artist A", "Track A", 1999),
                ],
            )]),
        };
        let previews = Arc::new(StubPreviews::new(&[
            ("Artist O", "Track O", "https://cdn.example/o.mp3"),
            ("Artist A", "Track A", "https://cdn.example/a.mp3"),
        ]));
        let selector = selector(tracks, previews);

        for _ in 0..10 {
            let song = selector
                .select_song(1995, 2005, &HashSet::new(), &HashSet::new(), "")
                .await
                .unwrap();
            assert_eq!(song.id, "ok");
        }
    }

    #[tokio::test]
    async fn played_songs_never_repeat_until_sets_reset() {
        let tracks = StubTracks {
            by_year: HashMap::from([(
                1999,
                vec![
                    candidate("a", "Artist A", "Track A", 1999),
                    candidate("b", "Artist B", "Track B", 1999),
                    candidate("c", "Artist C", "Track C", 1999),
                ],
            )]),
        };
        let previews = Arc::new(StubPreviews::new(&[
            ("Artist A", "Track A", "https://cdn.example/a.mp3"),
            ("Artist B", "Track B", "https://cdn.example/b.mp3"),
            ("Artist C", "Track C", "https://cdn.example/c.mp3"),
        ]));
        let selector = selector(tracks, previews);

        let mut played_ids = HashSet::new();
        let mut played_keys = HashSet::new();
        let mut seen = HashSet::new();

        for _ in 0..3 {
            let song = selector
                .select_song(1999, 1999, &played_ids, &played_keys, "")
                .await
                .unwrap();
            assert!(seen.insert(song.id.clone()), "song {} repeated", song.id);
            played_ids.insert(song.id.clone());
            played_keys.insert(song.dedupe_key.clone());
        }

        // All unique songs consumed; the range is now exhausted.
        let exhausted = selector
            .select_song(1999, 1999, &played_ids, &played_keys, "")
            .await;
        assert!(exhausted.is_none());
    }

    #[tokio::test]
    async fn dedupe_key_alone_blocks_a_reissue() {
        // Same song under a different catalog id: the key must block it.
        let tracks = StubTracks {
            by_year: HashMap::from([(
                1999,
                vec![candidate("reissue-id", "Artist A", "Track A", 1999)],
            )]),
        };
        let previews = Arc::new(StubPreviews::new(&[(
            "Artist A",
            "Track A",
            "https://cdn.example/a.mp3",
        )]));
        let selector = selector(tracks, previews);

        let played_keys = HashSet::from([dedupe_key("Artist A", "Track A")]);
        let song = selector
            .select_song(1999, 1999, &HashSet::new(), &played_keys, "")
            .await;
        assert!(song.is_none());
    }

    #[tokio::test]
    async fn empty_years_are_skipped_until_one_yields() {
        let tracks = StubTracks {
            by_year: HashMap::from([(2002, vec![candidate("a", "Artist A", "Track A", 2002)])]),
        };
        let previews = Arc::new(StubPreviews::new(&[(
            "Artist A",
            "Track A",
            "https://cdn.example/a.mp3",
        )]));
        let selector = selector(tracks, previews);

        let song = selector
            .select_song(2000, 2005, &HashSet::new(), &HashSet::new(), "")
            .await
            .unwrap();
        assert_eq!(song.release_year, 2002);
    }

    #[tokio::test]
    async fn losing_lookups_run_to_completion() {
        let tracks = StubTracks {
            by_year: HashMap::from([(
                1999,
                vec![
                    candidate("fast", "Artist A", "Track A", 1999),
                    candidate("slow", "Artist B", "Track B", 1999),
                ],
            )]),
        };
        let previews = Arc::new(
            StubPreviews::new(&[("Artist A", "Track A", "https://cdn.example/a.mp3")])
                .slow("Artist B", "Track B"),
        );
        let selector = SongSelector::new(
            Arc::new(tracks),
            Arc::clone(&previews) as Arc<dyn PreviewSource>,
            SelectionOptions::default(),
        );

        let song = selector
            .select_song(1999, 1999, &HashSet::new(), &HashSet::new(), "")
            .await
            .unwrap();
        assert_eq!(song.id, "fast");

        // The loser was not cancelled; give it time to finish and observe
        // that its lookup completed (which is what warms the preview cache).
        tokio::time::sleep(Duration::from_millis(150)).await;
        let completed = previews.completed.lock().unwrap();
        assert!(completed.contains(&dedupe_key("Artist B", "Track B")));
    }

    #[tokio::test]
    async fn race_pool_is_bounded() {
        let pool: Vec<TrackCandidate> = (0..50)
            .map(|i| candidate(&format!("t{}", i), &format!("Artist {}", i), "Track", 1999))
            .collect();
        let tracks = StubTracks {
            by_year: HashMap::from([(1999, pool)]),
        };
        // No previews at all, so every pool member gets looked up.
        let previews = Arc::new(StubPreviews::new(&[]));
        let selector = SongSelector::new(
            Arc::new(tracks),
            Arc::clone(&previews) as Arc<dyn PreviewSource>,
            SelectionOptions {
                race_pool_size: 8,
                max_concurrent_lookups: 4,
            },
        );

        let song = selector
            .select_song(1999, 1999, &HashSet::new(), &HashSet::new(), "")
            .await;
        assert!(song.is_none());
        assert_eq!(previews.completed.lock().unwrap().len(), 8);
    }
}
