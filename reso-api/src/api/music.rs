//! Streaming links, Spotify search and song metadata extraction

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};
use reso_common::LogArea;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::log_request;
use super::session::{CurrentUser, JsonBody};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::services::apple::optimized_music_link;
use crate::services::spotify::SpotifyTrack;
use crate::services::streaming::{self, detect_optimal_service};
use crate::services::{SongData, SongInfoError, SpotifyError, StreamingLinks, StreamingService};
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: u32 = 10;
const MAX_SEARCH_LIMIT: u32 = 50;
const MAX_EXTRACT_URLS: usize = 25;

fn user_agent(headers: &HeaderMap) -> &str {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub struct LinksQuery {
    pub track: Option<String>,
    pub artist: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinksResponse {
    pub service: StreamingService,
    pub links: StreamingLinks,
}

/// GET /api/music/links
pub async fn streaming_links(
    headers: HeaderMap,
    Query(query): Query<LinksQuery>,
) -> ApiResult<Json<LinksResponse>> {
    log_request("/api/music/links", "GET", "Building streaming links");

    let track = query.track.filter(|t| !t.is_empty());
    let artist = query.artist.filter(|a| !a.is_empty());
    let (Some(track), Some(artist)) = (track, artist) else {
        return Err(ApiError::bad_request("Track and artist are required"));
    };

    let service = match query.service.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<StreamingService>()
            .map_err(|_| ApiError::bad_request("Invalid streaming service"))?,
        None => detect_optimal_service(user_agent(&headers)),
    };

    Ok(Json(LinksResponse {
        service,
        links: streaming::streaming_links(&track, &artist, service),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackLinkQuery {
    pub spotify_id: Option<String>,
    pub apple_music_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackLinkResponse {
    pub url: String,
}

/// GET /api/music/track-link
pub async fn track_link(
    headers: HeaderMap,
    Query(query): Query<TrackLinkQuery>,
) -> Json<TrackLinkResponse> {
    log_request("/api/music/track-link", "GET", "Resolving track link");

    Json(TrackLinkResponse {
        url: optimized_music_link(
            query.apple_music_id.as_deref(),
            query.spotify_id.as_deref(),
            user_agent(&headers),
        ),
    })
}

#[derive(Debug, Deserialize)]
pub struct SpotifySearchQuery {
    pub q: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpotifySearchResponse {
    pub tracks: Vec<SpotifyTrack>,
}

/// GET /api/music/spotify/search
///
/// Uses the Spotify token stored on the caller's session.
pub async fn spotify_search(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<SpotifySearchQuery>,
) -> ApiResult<Json<SpotifySearchResponse>> {
    let request_id = log_request("/api/music/spotify/search", "GET", "Searching Spotify");

    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Search query is required"))?;
    let limit = query
        .limit
        .as_deref()
        .and_then(|l| l.parse::<u32>().ok())
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let token = current
        .session
        .spotify_access_token
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Spotify account is not connected"))?;

    let tracks = state
        .spotify
        .search_tracks(token, q, limit)
        .await
        .map_err(|e| match e {
            SpotifyError::Api(status, _) => {
                warn!(
                    area = %LogArea::ExtSpotify,
                    request_id = %request_id,
                    status,
                    "Spotify rejected search"
                );
                ApiError::BadGateway("Spotify search failed".to_string())
            }
            other => ApiError::internal(LogArea::ExtSpotify, "Spotify search failed", other),
        })?;

    Ok(Json(SpotifySearchResponse { tracks }))
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub urls: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub songs: Vec<SongData>,
}

/// POST /api/music/extract
pub async fn extract(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(body): JsonBody<ExtractRequest>,
) -> ApiResult<Json<ExtractResponse>> {
    let request_id = log_request("/api/music/extract", "POST", "Extracting song info");

    let urls = body.urls.unwrap_or_default();
    let mut errors = FieldErrors::new();
    errors.check(!urls.is_empty(), "urls", "At least one URL is required");
    errors.check(urls.len() <= MAX_EXTRACT_URLS, "urls", "At most 25 URLs per request");
    errors.check(urls.iter().all(|u| !u.is_empty()), "urls", "URLs must not be empty");
    errors.into_result("Invalid request")?;

    let songs = state.song_info.batch_extract(&urls).await.map_err(|e| match e {
        SongInfoError::NotConfigured => {
            ApiError::ServiceUnavailable("Song extraction is not configured".to_string())
        }
        other => ApiError::internal(LogArea::DataJina, "Failed to extract song info", other),
    })?;

    info!(
        area = %LogArea::ApiMusic,
        request_id = %request_id,
        user_id = %current.id(),
        requested = urls.len(),
        extracted = songs.len(),
        "Song extraction finished"
    );

    Ok(Json(ExtractResponse { songs }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_user_agent_defaults_to_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_agent(&headers), "");
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));
        assert_eq!(user_agent(&headers), "curl/8.0");
    }
}
