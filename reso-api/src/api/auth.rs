//! Account registration, login and session management

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use reso_common::LogArea;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::log_request;
use super::session::{clear_session_cookie, session_cookie, session_token, CurrentUser, JsonBody};
use crate::db::{sessions, users};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::services::password;
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyTokenRequest {
    #[serde(default)]
    pub access_token: String,
}

/// Username rule shared with profile updates
pub fn check_username(errors: &mut FieldErrors, username: &str) {
    let len = username.chars().count();
    errors.check(len >= 3, "username", "Username must be at least 3 characters");
    errors.check(len <= 30, "username", "Username must be at most 30 characters");
}

async fn open_session(state: &AppState, user_id: &str) -> ApiResult<String> {
    let removed = sessions::delete_expired(&state.db).await?;
    if removed > 0 {
        debug!(area = %LogArea::AppAuth, removed, "Removed expired sessions");
    }
    let token = password::generate_session_token();
    sessions::create_session(&state.db, &token, user_id, state.session_ttl).await?;
    Ok(session_cookie(&token, state.session_ttl))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    log_request("/api/auth/register", "POST", "Registering account");

    let username = body.username.trim();
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let mut errors = FieldErrors::new();
    check_username(&mut errors, username);
    errors.check(
        body.password.chars().count() >= MIN_PASSWORD_LEN,
        "password",
        "Password must be at least 8 characters",
    );
    if let Some(email) = email {
        errors.check(email.contains('@'), "email", "Invalid email address");
    }
    errors.into_result("Invalid data")?;

    if users::username_taken(&state.db, username, None).await? {
        return Err(ApiError::bad_request("Username is already taken"));
    }
    if let Some(email) = email {
        if users::email_taken(&state.db, email).await? {
            return Err(ApiError::bad_request("Email is already registered"));
        }
    }

    let hash = password::hash_password(&body.password)
        .map_err(|e| ApiError::internal(LogArea::AppAuth, "Failed to create account", e))?;
    // A concurrent registration can still win the race; the insert reports it as a conflict
    let user = users::create_user(&state.db, username, email, &hash).await?;
    let cookie = open_session(&state, &user.id).await?;

    info!(area = %LogArea::AppAuth, user_id = %user.id, "Registered new user");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "user": user })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    log_request("/api/auth/login", "POST", "Logging in");

    let credentials = users::find_credentials(&state.db, body.username.trim()).await?;
    let Some(credentials) = credentials.filter(|c| {
        password::verify_password(&body.password, &c.password_hash)
    }) else {
        warn!(area = %LogArea::AppAuth, "Rejected login attempt");
        return Err(ApiError::Unauthorized);
    };

    let cookie = open_session(&state, &credentials.user.id).await?;
    info!(area = %LogArea::AppAuth, user_id = %credentials.user.id, "User logged in");

    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "user": credentials.user }))))
}

/// POST /api/auth/logout
///
/// Succeeds whether or not a session was present.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    log_request("/api/auth/logout", "POST", "Logging out");

    if let Some(token) = session_token(&headers) {
        sessions::delete_session(&state.db, &token).await?;
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "success": true })),
    ))
}

/// PUT /api/auth/spotify-token
pub async fn set_spotify_token(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(body): JsonBody<SpotifyTokenRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    log_request("/api/auth/spotify-token", "PUT", "Storing Spotify token");

    let access_token = body.access_token.trim();
    if access_token.is_empty() {
        return Err(ApiError::bad_request("Access token is required"));
    }

    sessions::set_spotify_token(&state.db, &current.session.token, access_token).await?;
    info!(area = %LogArea::AppAuth, user_id = %current.id(), "Linked Spotify token to session");

    Ok(Json(json!({ "success": true })))
}
