// SPDX-License-Identifier: GPL-3.0-or-later

//! Text screening heuristics for candidate tracks.
//!
//! These are blunt, deliberately so: a keyword list for re-releases, a digit
//! stripper so titles cannot leak their own year, and a Latin-script
//! plausibility check. None of this is language identification; false
//! positives and negatives are accepted product behavior.

use lazy_static::lazy_static;
use regex::Regex;

/// Keywords that mark an album or title as a compilation, remaster, or
/// special edition. Those releases often carry misleading release years.
const COMPILATION_KEYWORDS: &[&str] = &[
    "greatest hits",
    "best of",
    "collection",
    "anthology",
    "compilation",
    "essentials",
    "hits",
    "singles",
    "retrospective",
    "very best",
    "ultimate",
    "deluxe",
    "remastered",
    "live",
    "remix",
    "acoustic",
    "version",
    "edition",
    "anniversary",
    "remaster",
    "expanded",
    "bonus",
    "special",
    "complete",
    "definitive",
    "gold",
    "platinum",
    "legend",
    "classic",
    "chronicles",
    "archive",
    "re-issue",
    "reissue",
    "re-release",
    "mono",
    "stereo",
    "digitally",
];

lazy_static! {
    // CJK ideographs, kana, Cyrillic, Arabic, Thai, Hangul, Hebrew.
    static ref NON_LATIN: Regex = Regex::new(
        "[\\u{4e00}-\\u{9fff}\\u{3040}-\\u{309f}\\u{30a0}-\\u{30ff}\\u{0400}-\\u{04ff}\\u{0600}-\\u{06ff}\\u{0e00}-\\u{0e7f}\\u{ac00}-\\u{d7af}\\u{0590}-\\u{05ff}]"
    )
    .expect("valid non-latin script pattern");
    static ref ACCENTED_LATIN: Regex =
        Regex::new("[àáâãäåèéêëìíîïòóôõöùúûüñçøæœßðþ]").expect("valid accented pattern");
}

/// Returns true when the text suggests a compilation, remaster, or special
/// edition. Case-insensitive substring match against a fixed keyword list.
pub fn is_compilation_or_remaster(text: &str) -> bool {
    let lowered = text.to_lowercase();
    COMPILATION_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Removes every digit from a title so a song cannot reveal its year through
/// its own name. All other characters and spacing are preserved.
pub fn strip_numerals(title: &str) -> String {
    title.chars().filter(|c| !c.is_ascii_digit()).collect()
}

/// Heuristic Latin-script check over the combined title and artist strings.
///
/// Rejects any non-Latin script character outright, and rejects strings where
/// accented-Latin characters make up more than 10% of the length.
pub fn is_plausibly_english(title: &str, artist: &str) -> bool {
    let text = format!("{} {}", title, artist);
    if NON_LATIN.is_match(&text) {
        return false;
    }
    let lowered = text.to_lowercase();
    let accented = ACCENTED_LATIN.find_iter(&lowered).count();
    let total = text.chars().count();
    !(total > 0 && accented as f64 > total as f64 * 0.1)
}
