// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire models for the catalog API. Fields default aggressively: the chart
//! endpoints routinely return null entries and partial objects.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistSearchResponse {
    pub playlists: Option<PlaylistPage>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PlaylistPage {
    // Items can be literal nulls inside the array.
    #[serde(default)]
    pub items: Vec<Option<PlaylistItem>>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: PlaylistOwner,
}

#[derive(Debug, Deserialize, Default)]
pub struct PlaylistOwner {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct PlaylistTracksResponse {
    #[serde(default)]
    pub items: Vec<PlaylistTrackItem>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTrackItem {
    pub track: Option<TrackItem>,
}

#[derive(Debug, Deserialize)]
pub struct TrackSearchResponse {
    pub tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
pub struct TrackItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: AlbumRef,
    #[serde(default)]
    pub popularity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct AlbumRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub release_date: String,
    /// Cover images, largest first.
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRef {
    pub url: String,
}
