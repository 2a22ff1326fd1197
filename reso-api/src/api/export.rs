//! Playlist export to streaming services

use axum::Json;
use reso_common::LogArea;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::log_request;
use super::session::JsonBody;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::services::streaming::{export_playlist, ExportPlaylistParams, ExportTrack};
use crate::services::{StreamingLinks, StreamingService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTrackRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub explanation: Option<String>,
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tracks: Vec<ExportTrackRequest>,
    pub service: Option<String>,
    pub is_public: Option<bool>,
}

impl ExportRequest {
    pub fn into_params(self) -> ApiResult<ExportPlaylistParams> {
        let mut errors = FieldErrors::new();

        let name = self.name.unwrap_or_default();
        errors.check(!name.is_empty(), "name", "Playlist name is required");
        errors.check(!self.tracks.is_empty(), "tracks", "At least one track is required");

        let service = match self.service.as_deref() {
            Some(raw) => match raw.parse::<StreamingService>() {
                Ok(service) => Some(service),
                Err(_) => {
                    errors.add("service", "Service must be one of spotify, apple, youtube");
                    None
                }
            },
            None => {
                errors.add("service", "Required");
                None
            }
        };

        let mut tracks = Vec::with_capacity(self.tracks.len());
        for (index, track) in self.tracks.into_iter().enumerate() {
            let title = track.title.unwrap_or_default();
            let artist = track.artist.unwrap_or_default();
            errors.check(!title.is_empty(), &format!("tracks.{}.title", index), "Required");
            errors.check(!artist.is_empty(), &format!("tracks.{}.artist", index), "Required");
            tracks.push(ExportTrack {
                title,
                artist,
                album: track.album,
                year: track.year,
                explanation: track.explanation,
                genres: track.genres,
            });
        }

        errors.into_result("Invalid request")?;
        let service = service.ok_or_else(|| ApiError::bad_request("Invalid request"))?;

        Ok(ExportPlaylistParams {
            name,
            description: self.description,
            tracks,
            service,
            is_public: self.is_public.unwrap_or(false),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub success: bool,
    pub service: StreamingService,
    pub links: StreamingLinks,
}

/// POST /api/playlists/export
pub async fn export(JsonBody(raw): JsonBody<Value>) -> ApiResult<Json<ExportResponse>> {
    let request_id = log_request("/api/playlists/export", "POST", "Exporting playlist");

    let request: ExportRequest = serde_json::from_value(raw).map_err(|e| {
        ApiError::invalid("Invalid request", json!({ "_errors": [e.to_string()] }))
    })?;
    let params = match request.into_params() {
        Ok(params) => params,
        Err(e) => {
            warn!(area = %LogArea::ApiPlaylists, request_id = %request_id, "Invalid export request");
            return Err(e);
        }
    };

    let links = export_playlist(&params);

    info!(
        area = %LogArea::ApiPlaylists,
        request_id = %request_id,
        service = %params.service,
        track_count = params.tracks.len(),
        "Playlist exported"
    );

    Ok(Json(ExportResponse {
        success: true,
        service: params.service,
        links,
    }))
}

/// GET /api/playlists/export
pub async fn usage() -> Json<Value> {
    log_request("/api/playlists/export", "GET", "API info request");

    Json(json!({
        "description": "Playlist Export API",
        "usage": {
            "method": "POST",
            "bodyParameters": {
                "name": "Name of the playlist (required)",
                "description": "Description of the playlist (optional)",
                "tracks": "Array of tracks, each with title and artist (required)",
                "service": "One of spotify, apple, youtube (required)",
                "isPublic": "Whether the exported playlist is public (optional, default: false)"
            },
            "example": {
                "name": "Summer Road Trip",
                "tracks": [{ "title": "Blinding Lights", "artist": "The Weeknd" }],
                "service": "spotify",
                "isPublic": false
            }
        }
    }))
}
