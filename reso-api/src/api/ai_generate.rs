//! LLM-backed playlist generation
//!
//! Open to anonymous callers; nothing is persisted.

use axum::{extract::State, Json};
use reso_common::LogArea;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::log_request;
use super::session::JsonBody;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::services::{GeneratedPlaylist, PlaylistGenerationParams};
use crate::AppState;

const MIN_TRACKS: i64 = 5;
const MAX_TRACKS: i64 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiGenerateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub mood: Option<String>,
    pub genres: Option<Vec<String>>,
    pub era: Option<String>,
    pub track_count: Option<i64>,
}

impl AiGenerateRequest {
    /// Check field rules and produce generation parameters
    pub fn into_params(self) -> ApiResult<PlaylistGenerationParams> {
        let mut errors = FieldErrors::new();

        let name = self.name.unwrap_or_default();
        errors.check(!name.is_empty(), "name", "Playlist name is required");

        if let Some(count) = self.track_count {
            errors.check(
                count >= MIN_TRACKS,
                "trackCount",
                "Number must be greater than or equal to 5",
            );
            errors.check(
                count <= MAX_TRACKS,
                "trackCount",
                "Number must be less than or equal to 50",
            );
        }

        errors.into_result("Invalid request")?;

        Ok(PlaylistGenerationParams {
            name,
            description: self.description,
            mood: self.mood,
            genres: self.genres,
            era: self.era,
            // Range checked above
            track_count: self.track_count.map(|c| c as u32),
        })
    }
}

/// POST /api/playlists/ai-generate
pub async fn generate(
    State(state): State<AppState>,
    JsonBody(raw): JsonBody<Value>,
) -> ApiResult<Json<GeneratedPlaylist>> {
    let request_id = log_request("/api/playlists/ai-generate", "POST", "Generating AI playlist");
    debug!(area = %LogArea::ApiPlaylists, request_id = %request_id, body = %raw, "Request body received");

    let request: AiGenerateRequest = serde_json::from_value(raw).map_err(|e| {
        ApiError::invalid("Invalid request", json!({ "_errors": [e.to_string()] }))
    })?;
    let params = request.into_params().map_err(|e| {
        warn!(area = %LogArea::ApiPlaylists, request_id = %request_id, "Invalid request body");
        e
    })?;

    info!(
        area = %LogArea::ApiPlaylists,
        request_id = %request_id,
        name = %params.name,
        uses_llm = state.generator.uses_llm(),
        "Generating playlist"
    );

    let playlist = state.generator.generate(&params, &request_id).await;

    info!(
        area = %LogArea::ApiPlaylists,
        request_id = %request_id,
        track_count = playlist.tracks.len(),
        "Playlist generated successfully"
    );

    Ok(Json(playlist))
}

/// GET /api/playlists/ai-generate
pub async fn usage() -> Json<Value> {
    log_request("/api/playlists/ai-generate", "GET", "API info request");

    Json(json!({
        "description": "AI Playlist Generation API",
        "usage": {
            "method": "POST",
            "bodyParameters": {
                "name": "Name of the playlist (required)",
                "description": "Description of the playlist (optional)",
                "mood": "Mood of the playlist (optional)",
                "genres": "Array of genres (optional)",
                "era": "Musical era (optional)",
                "trackCount": "Number of tracks (optional, default: 10)"
            },
            "example": {
                "name": "Summer Road Trip",
                "description": "Upbeat tracks for a long drive",
                "mood": "energetic",
                "genres": ["Pop", "Rock"],
                "era": "2010s",
                "trackCount": 15
            }
        }
    }))
}
