//! User search, identity updates and follows

use axum::{
    extract::{Path, Query, State},
    Json,
};
use reso_common::db::{MusicProfile, User};
use reso_common::LogArea;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::log_request;
use super::session::{CurrentUser, JsonBody};
use crate::db::users::UserSummary;
use crate::db::{profiles, users};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListUsersQuery {
    /// Unparseable values fall back to the defaults
    fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT)
    }

    fn offset(&self) -> i64 {
        self.offset
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0)
            .max(0)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub pagination: Pagination,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<UserListResponse>> {
    log_request("/api/users", "GET", "Listing users");

    let search = query.search.as_deref().unwrap_or("");
    let limit = query.limit();
    let offset = query.offset();

    let found = users::search_users(&state.db, search, limit, offset)
        .await
        .map_err(|e| ApiError::internal(LogArea::ApiUsers, "Failed to fetch users", e))?;
    let total = users::count_users(&state.db, search)
        .await
        .map_err(|e| ApiError::internal(LogArea::ApiUsers, "Failed to fetch users", e))?;

    Ok(Json(UserListResponse {
        users: found,
        pagination: Pagination {
            total,
            limit,
            offset,
            has_more: offset + limit < total,
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub favorite_genres: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    pub profile: MusicProfile,
}

/// POST /api/users
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(body): JsonBody<UpdateUserRequest>,
) -> ApiResult<Json<UserWithProfile>> {
    log_request("/api/users", "POST", "Updating user");

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Name is required"))?;

    if users::username_taken(&state.db, name, Some(current.id())).await? {
        return Err(ApiError::bad_request("Username is already taken"));
    }

    users::update_identity(&state.db, current.id(), name, body.bio.as_deref()).await?;
    let genres = body.favorite_genres.unwrap_or_default();
    let profile = profiles::upsert_genres(&state.db, current.id(), Some(&genres)).await?;

    let user = users::find_by_id(&state.db, current.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(area = %LogArea::ApiUsers, user_id = %user.id, "Updated user");

    Ok(Json(UserWithProfile { user, profile }))
}

/// POST /api/users/:id/follow
pub async fn follow_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(target_id): Path<String>,
) -> ApiResult<Json<Value>> {
    log_request("/api/users/:id/follow", "POST", "Following user");

    if target_id == current.id() {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }
    if users::find_by_id(&state.db, &target_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    users::follow(&state.db, current.id(), &target_id).await?;
    Ok(Json(json!({ "following": true })))
}

/// DELETE /api/users/:id/follow
pub async fn unfollow_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(target_id): Path<String>,
) -> ApiResult<Json<Value>> {
    log_request("/api/users/:id/follow", "DELETE", "Unfollowing user");

    if users::find_by_id(&state.db, &target_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    users::unfollow(&state.db, current.id(), &target_id).await?;
    Ok(Json(json!({ "following": false })))
}
