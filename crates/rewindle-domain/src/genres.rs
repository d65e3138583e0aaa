// SPDX-License-Identifier: GPL-3.0-or-later

//! Genre presets: the search terms fed to the catalog and the "golden age"
//! year range each genre defaults to.

/// A selectable genre with its catalog query terms and default year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenrePreset {
    pub name: &'static str,
    /// Search terms passed to the catalog; empty means no genre filter.
    pub query: &'static str,
    pub start_year: i32,
    pub end_year: i32,
}

pub const GENRES: &[GenrePreset] = &[
    GenrePreset {
        name: "All Genres",
        query: "",
        start_year: 1995,
        end_year: 2020,
    },
    GenrePreset {
        name: "Pop",
        query: "pop",
        start_year: 1985,
        end_year: 2000,
    },
    GenrePreset {
        name: "Rock",
        query: "rock",
        start_year: 1968,
        end_year: 1985,
    },
    GenrePreset {
        name: "Hip-Hop",
        query: "hip hop rap",
        start_year: 1994,
        end_year: 2009,
    },
    GenrePreset {
        name: "R&B",
        query: "r&b soul",
        start_year: 1990,
        end_year: 2005,
    },
    GenrePreset {
        name: "Electronic",
        query: "electronic dance edm",
        start_year: 1998,
        end_year: 2013,
    },
    GenrePreset {
        name: "Country",
        query: "country",
        start_year: 1990,
        end_year: 2005,
    },
    GenrePreset {
        name: "Alternative",
        query: "alternative indie",
        start_year: 1991,
        end_year: 2006,
    },
    GenrePreset {
        name: "Metal",
        query: "metal heavy",
        start_year: 1983,
        end_year: 1998,
    },
    GenrePreset {
        name: "Disco/Funk",
        query: "disco funk",
        start_year: 1975,
        end_year: 1985,
    },
    GenrePreset {
        name: "80s",
        query: "80s hits",
        start_year: 1980,
        end_year: 1989,
    },
];

/// Looks up a preset by its display name (case-insensitive).
pub fn find_genre(name: &str) -> Option<&'static GenrePreset> {
    GENRES
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name))
}
