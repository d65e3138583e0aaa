// SPDX-License-Identifier: GPL-3.0-or-later

//! Game-side orchestration: the candidate race that turns chart years into a
//! playable song, the per-game session state, and the leaderboard store.

pub mod leaderboard;
pub mod selection;
pub mod session;

pub use leaderboard::{Leaderboard, LeaderboardError, LeaderboardStore, MemoryLeaderboard, RestLeaderboard};
pub use selection::{PreviewSource, SelectionOptions, SongSelector, TrackSource};
pub use session::{GameSession, RoundScore};
