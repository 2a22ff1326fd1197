//! Spotify Web API client
//!
//! Calls are made with the user's access token; the client itself holds no
//! credentials.

use reqwest::Client;
use reso_common::LogArea;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Spotify client errors
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Spotify API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub fn spotify_track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

pub fn spotify_playlist_uri(playlist_id: &str) -> String {
    format!("spotify:playlist:{}", playlist_id)
}

pub fn spotify_track_url(track_id: &str) -> String {
    format!("https://open.spotify.com/track/{}", track_id)
}

pub fn spotify_playlist_url(playlist_id: &str) -> String {
    format!("https://open.spotify.com/playlist/{}", playlist_id)
}

#[derive(Debug, Clone, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlaylistObject {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    uri: String,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: String,
    name: String,
    uri: String,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    artists: Vec<NamedObject>,
    album: Option<NamedObject>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct NamedObject {
    name: String,
}

/// Playlist created on the user's Spotify account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalPlaylist {
    pub id: String,
    pub url: String,
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
}

/// Track from a Spotify search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub uri: String,
    pub url: String,
    pub duration_ms: Option<u64>,
}

impl From<TrackObject> for SpotifyTrack {
    fn from(track: TrackObject) -> Self {
        let url = track
            .external_urls
            .and_then(|u| u.spotify)
            .unwrap_or_else(|| spotify_track_url(&track.id));
        Self {
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album: track.album.map(|a| a.name),
            id: track.id,
            name: track.name,
            uri: track.uri,
            url,
            duration_ms: track.duration_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http_client: Client,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, SpotifyError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SpotifyError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SpotifyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(SpotifyError::Api(status.as_u16(), text))
    }

    async fn create_playlist_object(
        &self,
        access_token: &str,
        name: &str,
        description: &str,
        is_public: bool,
    ) -> Result<PlaylistObject, SpotifyError> {
        let response = self
            .http_client
            .post(format!("{}/me/playlists", self.api_url))
            .bearer_auth(access_token)
            .json(&json!({
                "name": name,
                "description": description,
                "public": is_public,
            }))
            .send()
            .await
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SpotifyError::Parse(e.to_string()))
    }

    /// Create an empty playlist on the token owner's account
    pub async fn create_playlist(
        &self,
        access_token: &str,
        name: &str,
        description: &str,
        is_public: bool,
    ) -> Result<ExternalPlaylist, SpotifyError> {
        let playlist = self
            .create_playlist_object(access_token, name, description, is_public)
            .await?;
        Ok(to_external(playlist))
    }

    pub async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), SpotifyError> {
        let response = self
            .http_client
            .post(format!("{}/playlists/{}/tracks", self.api_url, playlist_id))
            .bearer_auth(access_token)
            .json(&json!({ "uris": uris }))
            .send()
            .await
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    pub async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SpotifyTrack>, SpotifyError> {
        debug!(area = %LogArea::ExtSpotify, query, limit, "Searching Spotify tracks");

        let limit = limit.to_string();
        let response = self
            .http_client
            .get(format!("{}/search", self.api_url))
            .bearer_auth(access_token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        let parsed: SearchResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SpotifyError::Parse(e.to_string()))?;

        Ok(parsed
            .tracks
            .map(|page| page.items.into_iter().map(SpotifyTrack::from).collect())
            .unwrap_or_default())
    }

    /// Create a playlist and fill it with `track_ids`
    pub async fn create_ai_generated_playlist(
        &self,
        access_token: &str,
        name: &str,
        description: &str,
        track_ids: &[String],
        is_public: bool,
    ) -> Result<ExternalPlaylist, SpotifyError> {
        let playlist = self
            .create_playlist_object(access_token, name, description, is_public)
            .await?;

        let uris: Vec<String> = track_ids.iter().map(|id| spotify_track_uri(id)).collect();
        if !uris.is_empty() {
            self.add_tracks(access_token, &playlist.id, &uris).await?;
        }

        info!(
            area = %LogArea::ExtSpotify,
            playlist_id = %playlist.id,
            track_count = uris.len(),
            "Created Spotify playlist"
        );

        Ok(to_external(playlist))
    }
}

fn to_external(playlist: PlaylistObject) -> ExternalPlaylist {
    let url = playlist
        .external_urls
        .and_then(|u| u.spotify)
        .unwrap_or_else(|| spotify_playlist_url(&playlist.id));
    ExternalPlaylist {
        url,
        id: playlist.id,
        uri: playlist.uri,
        name: playlist.name,
        description: playlist.description,
    }
}
