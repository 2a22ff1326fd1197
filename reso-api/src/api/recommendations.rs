//! Daily recommendations and feedback

use axum::{
    extract::{Query, State},
    Json,
};
use reso_common::db::Song;
use reso_common::LogArea;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::log_request;
use super::session::{CurrentUser, JsonBody};
use crate::db::recommendations::{self, RecommendedSong};
use crate::db::songs;
use crate::error::{ApiError, ApiResult};
use crate::services::recommender;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<String>,
    pub refresh: Option<String>,
}

impl RecommendationQuery {
    fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT)
    }

    fn refresh(&self) -> bool {
        self.refresh.as_deref() == Some("true")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationEntry {
    pub id: String,
    pub track: Song,
    pub explanation: String,
    pub is_liked: bool,
}

impl From<RecommendedSong> for RecommendationEntry {
    fn from(rec: RecommendedSong) -> Self {
        Self {
            id: rec.recommendation.id,
            track: rec.song,
            explanation: rec.recommendation.explanation,
            is_liked: rec.recommendation.is_liked,
        }
    }
}

/// GET /api/recommendations
///
/// Returns today's recommendations when there are any, unless
/// `refresh=true` asks for a new batch.
pub async fn get_recommendations(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<RecommendationQuery>,
) -> ApiResult<Json<Vec<RecommendationEntry>>> {
    let request_id = log_request("/api/recommendations", "GET", "Fetching recommendations");
    let failed = |e: reso_common::Error| {
        ApiError::internal(
            LogArea::ApiRecommendations,
            "Failed to generate recommendations",
            e,
        )
    };

    if !query.refresh() {
        // Today's batch is returned whole; `limit` only sizes new batches
        let existing = recommendations::recommendations_since(
            &state.db,
            current.id(),
            &recommendations::today_start(),
            i64::MAX,
        )
        .await
        .map_err(failed)?;

        if !existing.is_empty() {
            return Ok(Json(existing.into_iter().map(Into::into).collect()));
        }
    }

    let generated = recommender::generate_recommendations(&state.db, current.id(), query.limit())
        .await
        .map_err(failed)?;

    info!(
        area = %LogArea::ApiRecommendations,
        request_id = %request_id,
        user_id = %current.id(),
        count = generated.len(),
        "Generated recommendations"
    );

    Ok(Json(generated.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub recommendation_id: Option<String>,
    pub is_liked: Option<bool>,
}

/// POST /api/recommendations
pub async fn rate_recommendation(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(body): JsonBody<FeedbackRequest>,
) -> ApiResult<Json<RecommendationEntry>> {
    log_request("/api/recommendations", "POST", "Recording recommendation feedback");

    let id = body
        .recommendation_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Recommendation ID is required"))?;

    let mut recommendation = recommendations::find_recommendation(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recommendation not found".to_string()))?;

    if recommendation.user_id != current.id() {
        return Err(ApiError::Forbidden("Unauthorized".to_string()));
    }

    if let Some(is_liked) = body.is_liked {
        recommendations::set_liked(&state.db, &id, is_liked).await?;
        recommendation.is_liked = is_liked;
    }

    let song = songs::find_by_id(&state.db, &recommendation.song_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Song not found".to_string()))?;

    Ok(Json(RecommendationEntry::from(RecommendedSong {
        recommendation,
        song,
    })))
}
