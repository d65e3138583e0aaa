// SPDX-License-Identifier: GPL-3.0-or-later

//! Full-stack selection test: real catalog and preview clients over mock
//! servers, driven through the selector.

use rewindle_catalog::CatalogClient;
use rewindle_game::{SelectionOptions, SongSelector};
use rewindle_preview::PreviewClient;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn track_item(id: &str, name: &str, artist: &str, album: &str, release_date: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "artists": [{"name": artist}],
        "album": {
            "name": album,
            "release_date": release_date,
            "images": [{"url": format!("https://images.example/{id}.jpg")}]
        },
        "popularity": 90
    })
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 3600
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("type", "playlist"))
        .and(query_param("q", "Top Hits 1999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "playlists": {"items": [
                {"id": "pl-1999", "name": "Top Hits 1999", "owner": {"display_name": "Spotify"}}
            ]}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists/pl-1999/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"track": track_item("comp", "Song", "Artist X", "Greatest Hits Vol. 1", "1999-01-01")},
                {"track": track_item("a", "Track A", "Artist A", "Album A", "1999-06-01")},
                {"track": track_item("b", "Track B", "Artist B", "Album B", "1999-02-01")}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_previews(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Artist A Track A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"preview": "https://cdn.example/a.mp3", "title": "Track A"}]
        })))
        .mount(server)
        .await;

    // No clip available for the other clean track.
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Artist B Track B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn selects_playable_song_through_real_clients() {
    let catalog_server = MockServer::start().await;
    let preview_server = MockServer::start().await;
    mount_catalog(&catalog_server).await;
    mount_previews(&preview_server).await;

    let catalog = CatalogClient::builder()
        .credentials("id", "secret")
        .base_url(catalog_server.uri())
        .auth_url(format!("{}/api/token", catalog_server.uri()))
        .build()
        .unwrap();
    let previews = PreviewClient::new(Some(preview_server.uri()));

    let selector = SongSelector::new(
        Arc::new(catalog),
        Arc::new(previews),
        SelectionOptions::default(),
    );

    // Only Track A survives: the compilation album is screened out and
    // Track B has no preview clip.
    let song = selector
        .select_song(1999, 1999, &HashSet::new(), &HashSet::new(), "")
        .await
        .expect("a playable song");

    assert_eq!(song.id, "a");
    assert_eq!(song.title, "Track A");
    assert_eq!(song.artist, "Artist A");
    assert_eq!(song.release_year, 1999);
    assert_eq!(song.preview_url, "https://cdn.example/a.mp3");
    assert_eq!(song.external_url, "https://open.spotify.com/track/a");
    assert_eq!(song.image_url.as_deref(), Some("https://images.example/a.jpg"));
}

#[tokio::test]
async fn played_song_forces_exhaustion_through_real_clients() {
    let catalog_server = MockServer::start().await;
    let preview_server = MockServer::start().await;
    mount_catalog(&catalog_server).await;
    mount_previews(&preview_server).await;

    let catalog = CatalogClient::builder()
        .credentials("id", "secret")
        .base_url(catalog_server.uri())
        .auth_url(format!("{}/api/token", catalog_server.uri()))
        .build()
        .unwrap();
    let previews = PreviewClient::new(Some(preview_server.uri()));

    let selector = SongSelector::new(
        Arc::new(catalog),
        Arc::new(previews),
        SelectionOptions::default(),
    );

    // Track A already played; Track B resolves no clip, so nothing remains.
    let played_ids = HashSet::from(["a".to_string()]);
    let song = selector
        .select_song(1999, 1999, &played_ids, &HashSet::new(), "")
        .await;
    assert!(song.is_none());
}
