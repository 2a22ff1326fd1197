//! Integration tests for streaming links, Spotify search and song extraction

mod helpers;

use axum::http::StatusCode;
use helpers::{TestApp, TestOptions};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
const LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64)";

// =============================================================================
// Links
// =============================================================================

#[tokio::test]
async fn test_links_detect_service_from_user_agent() {
    let app = TestApp::spawn().await;

    let response = app
        .request_with_headers(
            "GET",
            "/api/music/links?track=Hello&artist=Adele",
            None,
            None,
            &[("user-agent", IPHONE)],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["service"], "apple");
    assert_eq!(
        response.body["links"]["webUrl"],
        "https://music.apple.com/us/search?term=Hello%20Adele"
    );

    let response = app
        .request_with_headers(
            "GET",
            "/api/music/links?track=Hello&artist=Adele",
            None,
            None,
            &[("user-agent", LINUX)],
        )
        .await;
    assert_eq!(response.body["service"], "spotify");
    assert_eq!(
        response.body["links"]["appDeepLink"],
        "spotify:search:Hello%20Adele"
    );
}

#[tokio::test]
async fn test_links_explicit_service_and_errors() {
    let app = TestApp::spawn().await;

    let response = app
        .request("GET", "/api/music/links?track=Hello&artist=Adele&service=youtube", None, None)
        .await;
    assert_eq!(response.body["service"], "youtube");
    assert!(response.body["links"].get("appDeepLink").is_none());

    let response = app
        .request("GET", "/api/music/links?track=Hello&artist=Adele&service=tidal", None, None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.request("GET", "/api/music/links?track=Hello", None, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Track and artist are required");
}

#[tokio::test]
async fn test_track_link_prefers_app_on_ios() {
    let app = TestApp::spawn().await;

    let response = app
        .request_with_headers(
            "GET",
            "/api/music/track-link?spotifyId=sp1&appleMusicId=am1",
            None,
            None,
            &[("user-agent", IPHONE)],
        )
        .await;
    assert_eq!(response.body["url"], "music://song/am1");

    let response = app
        .request_with_headers(
            "GET",
            "/api/music/track-link?spotifyId=sp1&appleMusicId=am1",
            None,
            None,
            &[("user-agent", LINUX)],
        )
        .await;
    assert_eq!(response.body["url"], "https://open.spotify.com/track/sp1");

    let response = app.request("GET", "/api/music/track-link", None, None).await;
    assert_eq!(response.body["url"], "#");
}

// =============================================================================
// Spotify search
// =============================================================================

#[tokio::test]
async fn test_spotify_search_needs_connected_account() {
    let app = TestApp::spawn().await;
    let cookie = app.register("ada").await;

    let response = app
        .request("GET", "/api/music/spotify/search?q=teardrop", None, Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Spotify account is not connected");
}

#[tokio::test]
async fn test_spotify_search_returns_tracks() {
    let app = TestApp::spawn().await;
    let cookie = app.register("ada").await;
    app.connect_spotify(&cookie, "sp-token").await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "teardrop"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer sp-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tracks": { "items": [{
                "id": "t1",
                "name": "Teardrop",
                "uri": "spotify:track:t1",
                "duration_ms": 330000,
                "artists": [{ "name": "Massive Attack" }],
                "album": { "name": "Mezzanine" }
            }]}
        })))
        .expect(1)
        .mount(&app.spotify)
        .await;

    let response = app
        .request("GET", "/api/music/spotify/search?q=teardrop&limit=5", None, Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let track = &response.body["tracks"][0];
    assert_eq!(track["name"], "Teardrop");
    assert_eq!(track["artists"], json!(["Massive Attack"]));
    assert_eq!(track["url"], "https://open.spotify.com/track/t1");
}

#[tokio::test]
async fn test_spotify_rejection_is_bad_gateway() {
    let app = TestApp::spawn().await;
    let cookie = app.register("ada").await;
    app.connect_spotify(&cookie, "stale").await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .mount(&app.spotify)
        .await;

    let response = app
        .request("GET", "/api/music/spotify/search?q=anything", None, Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
}

// =============================================================================
// Song extraction
// =============================================================================

#[tokio::test]
async fn test_extract_unconfigured_is_unavailable() {
    let app = TestApp::spawn().await;
    let cookie = app.register("ada").await;

    let response = app
        .request(
            "POST",
            "/api/music/extract",
            Some(json!({ "urls": ["https://example.com/song"] })),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_extract_url_count_limits() {
    let app = TestApp::spawn().await;
    let cookie = app.register("ada").await;

    let response = app
        .request("POST", "/api/music/extract", Some(json!({ "urls": [] })), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let urls: Vec<String> = (0..26).map(|i| format!("https://example.com/{}", i)).collect();
    let response = app
        .request("POST", "/api/music/extract", Some(json!({ "urls": urls })), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["details"]["urls"].is_object());
}

#[tokio::test]
async fn test_extract_drops_failed_urls() {
    let app = TestApp::spawn_with(TestOptions {
        jina_key: Some("jina-key".to_string()),
        ..TestOptions::default()
    })
    .await;
    let cookie = app.register("ada").await;

    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(wiremock::matchers::body_partial_json(json!({ "url": "https://example.com/good" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "song_title": "Teardrop",
            "artist_name": "Massive Attack",
            "genres": ["Trip Hop"]
        })))
        .mount(&app.jina)
        .await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(wiremock::matchers::body_partial_json(json!({ "url": "https://example.com/bad" })))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.jina)
        .await;

    let response = app
        .request(
            "POST",
            "/api/music/extract",
            Some(json!({ "urls": ["https://example.com/good", "https://example.com/bad"] })),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let songs = response.body["songs"].as_array().unwrap();
    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0]["title"], "Teardrop");
    assert_eq!(songs[0]["sourceUrl"], "https://example.com/good");
}
