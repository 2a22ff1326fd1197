//! Current user's taste profile

use axum::{extract::State, Json};
use reso_common::LogArea;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::auth::check_username;
use super::log_request;
use super::session::{CurrentUser, JsonBody};
use crate::db::{profiles, users};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::AppState;

const MAX_BIO_CHARS: usize = 500;
const MAX_GENRES: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub preferred_genres: Vec<String>,
    pub preferred_moods: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub favorite_genres: Option<Vec<String>>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();

        match self.username.as_deref() {
            Some(username) => check_username(&mut errors, username.trim()),
            None => errors.add("username", "Required"),
        }

        if let Some(bio) = &self.bio {
            errors.check(
                bio.chars().count() <= MAX_BIO_CHARS,
                "bio",
                "Bio must be at most 500 characters",
            );
        }

        match &self.favorite_genres {
            Some(genres) => {
                errors.check(!genres.is_empty(), "favoriteGenres", "Select at least one genre");
                errors.check(
                    genres.len() <= MAX_GENRES,
                    "favoriteGenres",
                    "Select at most 10 genres",
                );
            }
            None => errors.add("favoriteGenres", "Required"),
        }

        errors.into_result("Invalid data")
    }
}

async fn load_profile(state: &AppState, user_id: &str) -> ApiResult<ProfileResponse> {
    let user = users::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;
    let profile = profiles::find_by_user(&state.db, user_id).await?;
    let (genres, moods) = profile
        .map(|p| (p.favorite_genres, p.favorite_moods))
        .unwrap_or_default();

    Ok(ProfileResponse {
        id: user.id,
        name: user.username,
        email: user.email,
        image: user.image,
        bio: user.bio,
        preferred_genres: genres,
        preferred_moods: moods,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}

/// GET /api/users/profile
pub async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<ProfileResponse>> {
    log_request("/api/users/profile", "GET", "Fetching profile");
    Ok(Json(load_profile(&state, current.id()).await?))
}

/// POST /api/users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(raw): JsonBody<Value>,
) -> ApiResult<Json<ProfileResponse>> {
    log_request("/api/users/profile", "POST", "Updating profile");

    let update: ProfileUpdate = serde_json::from_value(raw).map_err(|e| {
        ApiError::invalid("Invalid data", json!({ "_errors": [e.to_string()] }))
    })?;
    if let Err(e) = update.validate() {
        warn!(area = %LogArea::ApiUsers, user_id = %current.id(), "Invalid profile update");
        return Err(e);
    }

    // validate() guarantees both are present
    let username = update.username.as_deref().unwrap_or_default().trim();
    let genres = update.favorite_genres.unwrap_or_default();

    if users::username_taken(&state.db, username, Some(current.id())).await? {
        return Err(ApiError::bad_request("Username is already taken"));
    }

    users::update_identity(&state.db, current.id(), username, update.bio.as_deref()).await?;
    profiles::upsert_genres(&state.db, current.id(), Some(&genres)).await?;

    info!(area = %LogArea::ApiUsers, user_id = %current.id(), "Updated profile");

    Ok(Json(load_profile(&state, current.id()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(username: Option<&str>, bio: Option<String>, genres: Option<usize>) -> ProfileUpdate {
        ProfileUpdate {
            username: username.map(str::to_string),
            bio,
            favorite_genres: genres.map(|n| (0..n).map(|i| format!("g{}", i)).collect()),
        }
    }

    #[test]
    fn test_valid_update() {
        assert!(update(Some("ada"), Some("hi".into()), Some(1)).validate().is_ok());
        assert!(update(Some(&"a".repeat(30)), None, Some(10)).validate().is_ok());
    }

    #[test]
    fn test_invalid_updates() {
        assert!(update(Some("ab"), None, Some(1)).validate().is_err());
        assert!(update(Some(&"a".repeat(31)), None, Some(1)).validate().is_err());
        assert!(update(Some("ada"), Some("x".repeat(501)), Some(1)).validate().is_err());
        assert!(update(Some("ada"), None, Some(0)).validate().is_err());
        assert!(update(Some("ada"), None, Some(11)).validate().is_err());
        assert!(update(None, None, Some(1)).validate().is_err());
        assert!(update(Some("ada"), None, None).validate().is_err());
    }

    #[test]
    fn test_error_details_name_fields() {
        let err = update(Some("ab"), None, Some(0)).validate().unwrap_err();
        match err {
            ApiError::BadRequest { message, details } => {
                assert_eq!(message, "Invalid data");
                let details = details.unwrap();
                assert!(details.get("username").is_some());
                assert!(details.get("favoriteGenres").is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
