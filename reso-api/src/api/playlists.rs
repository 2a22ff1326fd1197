//! Catalogue-backed playlist generation and playlist lookup

use axum::{
    extract::{Path, State},
    Json,
};
use reso_common::db::Playlist;
use reso_common::LogArea;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, error, info};

use super::log_request;
use super::session::{CurrentUser, JsonBody};
use crate::db::playlists::{self, PlaylistTrack};
use crate::db::songs::{self, NewSong};
use crate::db::profiles;
use crate::error::{ApiError, ApiResult};
use crate::services::spotify::{spotify_track_url, ExternalPlaylist};
use crate::services::track_catalog;
use crate::AppState;

const DEFAULT_SPOTIFY_DESCRIPTION: &str = "AI-generated playlist by reso";
const PLACEHOLDER_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub mood: Option<String>,
    pub genres: Option<Vec<String>>,
    /// Minutes
    pub duration: Option<u32>,
    pub tempo: Option<String>,
    pub era: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub track_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlaylistResponse {
    pub playlist: PlaylistSummary,
    pub external_playlist: Option<ExternalPlaylist>,
    pub message: String,
}

/// Create the playlist, its placeholder songs and junction rows
async fn store_playlist(
    conn: &mut SqliteConnection,
    creator_id: &str,
    name: &str,
    description: Option<&str>,
    is_public: bool,
    track_ids: &[String],
    song_genres: &[String],
) -> reso_common::Result<Playlist> {
    let playlist = playlists::insert_playlist(conn, name, description, is_public, creator_id).await?;

    for (index, track_id) in track_ids.iter().enumerate() {
        let song = match songs::find_by_external_id(conn, track_id).await? {
            Some(song) => song,
            None => {
                let title = format!("Track {}", index + 1);
                let url = spotify_track_url(track_id);
                songs::insert_song(
                    conn,
                    &NewSong {
                        title: &title,
                        artist: PLACEHOLDER_ARTIST,
                        album: None,
                        external_id: Some(track_id),
                        external_url: Some(&url),
                        genres: song_genres,
                    },
                )
                .await?
            }
        };

        playlists::insert_playlist_song(conn, &playlist.id, &song.id, creator_id, index as i64)
            .await?;
    }

    Ok(playlist)
}

/// POST /api/playlists/generate
pub async fn generate_playlist(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(body): JsonBody<GeneratePlaylistRequest>,
) -> ApiResult<Json<GeneratePlaylistResponse>> {
    let request_id = log_request("/api/playlists/generate", "POST", "Generating playlist");

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Playlist name is required"))?
        .to_string();
    let description = body.description.clone().filter(|d| !d.is_empty());
    let is_public = body.is_public.unwrap_or(false);
    let requested_genres = body.genres.clone().unwrap_or_default();

    debug!(
        area = %LogArea::ApiPlaylists,
        request_id = %request_id,
        mood = ?body.mood,
        tempo = ?body.tempo,
        era = ?body.era,
        duration = ?body.duration,
        "Playlist generation parameters"
    );

    let failed = |e: reso_common::Error| {
        ApiError::internal(LogArea::ApiPlaylists, "Failed to generate playlist", e)
    };

    let target_genres = if requested_genres.is_empty() {
        profiles::favorite_genres(&state.db, current.id())
            .await
            .map_err(failed)?
    } else {
        requested_genres.clone()
    };
    let track_ids = track_catalog::select_tracks(&target_genres);

    let mut tx = state.db.begin().await.map_err(|e| failed(e.into()))?;
    let playlist = store_playlist(
        &mut tx,
        current.id(),
        &name,
        description.as_deref(),
        is_public,
        &track_ids,
        &requested_genres,
    )
    .await
    .map_err(failed)?;
    tx.commit().await.map_err(|e| failed(e.into()))?;

    info!(
        area = %LogArea::ApiPlaylists,
        request_id = %request_id,
        playlist_id = %playlist.id,
        track_count = track_ids.len(),
        "Created playlist"
    );

    let mut external_playlist = None;
    if let Some(token) = current.session.spotify_access_token.as_deref() {
        match state
            .spotify
            .create_ai_generated_playlist(
                token,
                &name,
                description.as_deref().unwrap_or(DEFAULT_SPOTIFY_DESCRIPTION),
                &track_ids,
                is_public,
            )
            .await
        {
            Ok(created) => external_playlist = Some(created),
            Err(e) => {
                // The local playlist stands on its own
                error!(
                    area = %LogArea::ExtSpotify,
                    request_id = %request_id,
                    error = %e,
                    "Failed to create Spotify playlist"
                );
            }
        }
    }

    Ok(Json(GeneratePlaylistResponse {
        playlist: PlaylistSummary {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description,
            is_public: playlist.is_public,
            track_count: track_ids.len(),
        },
        external_playlist,
        message: "AI-generated playlist created successfully".to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub tracks: Vec<PlaylistTrack>,
}

/// GET /api/playlists/:id
///
/// Visible to its creator, or to anyone when public.
pub async fn get_playlist(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PlaylistDetail>> {
    log_request("/api/playlists/:id", "GET", "Fetching playlist");

    let playlist = playlists::find_playlist(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;

    if !playlist.is_public && playlist.creator_id != current.id() {
        return Err(ApiError::Forbidden(
            "You do not have access to this playlist".to_string(),
        ));
    }

    let tracks = playlists::playlist_tracks(&state.db, &playlist.id).await?;
    Ok(Json(PlaylistDetail { playlist, tracks }))
}
