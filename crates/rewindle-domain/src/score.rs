// SPDX-License-Identifier: GPL-3.0-or-later

//! Pure score function for a single guess.

use serde::{Deserialize, Serialize};

/// Which scoring configuration is in effect. Earlier rounds of the product
/// rewarded fast answers; the accuracy-only mode drops the time bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    AccuracyAndSpeed,
    AccuracyOnly,
}

impl Default for ScoringMode {
    fn default() -> Self {
        Self::AccuracyAndSpeed
    }
}

/// Maps a guess to an integer score.
///
/// Accuracy bands: 1000 for an exact hit, then 800/600/400/200 as the miss
/// widens, then a linear tail of `100 - 10 * diff` floored at zero. The time
/// bonus (when enabled) is `300 - 10 * elapsed`, also floored. Hints cost 100
/// each and the total never goes negative.
pub fn score(
    guess_year: i32,
    actual_year: i32,
    elapsed_seconds: u32,
    hints_used: u32,
    mode: ScoringMode,
) -> u32 {
    let diff = (guess_year - actual_year).abs() as i64;

    let accuracy = match diff {
        0 => 1000,
        1 => 800,
        2 => 600,
        3 => 400,
        4 | 5 => 200,
        _ => (100 - diff * 10).max(0),
    };

    let time_bonus = match mode {
        ScoringMode::AccuracyAndSpeed => (300 - elapsed_seconds as i64 * 10).max(0),
        ScoringMode::AccuracyOnly => 0,
    };

    let penalty = hints_used as i64 * 100;

    (accuracy + time_bonus - penalty).max(0) as u32
}
