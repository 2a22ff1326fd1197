//! HTTP API handlers for reso-api

pub mod ai_generate;
pub mod auth;
pub mod export;
pub mod health;
pub mod music;
pub mod playlists;
pub mod profile;
pub mod rate_limit;
pub mod recommendations;
pub mod session;
pub mod users;

pub use health::health_routes;
pub use session::{CurrentUser, JsonBody};

use axum::routing::{get, post, put};
use axum::Router;
use reso_common::LogArea;
use tracing::info;
use uuid::Uuid;

use crate::AppState;

/// Log an incoming API call and return its request id
pub(crate) fn log_request(endpoint: &str, method: &str, message: &str) -> String {
    let request_id = Uuid::new_v4().to_string();
    info!(
        area = %LogArea::for_endpoint(endpoint),
        request_id = %request_id,
        endpoint,
        method,
        "{}",
        message
    );
    request_id
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/spotify-token", put(auth::set_spotify_token))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(users::list_users).post(users::update_user))
        .route(
            "/api/users/profile",
            get(profile::get_profile).post(profile::update_profile),
        )
        .route(
            "/api/users/:id/follow",
            post(users::follow_user).delete(users::unfollow_user),
        )
}

pub fn recommendation_routes() -> Router<AppState> {
    Router::new().route(
        "/api/recommendations",
        get(recommendations::get_recommendations).post(recommendations::rate_recommendation),
    )
}

pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/api/playlists/generate", post(playlists::generate_playlist))
        .route(
            "/api/playlists/ai-generate",
            get(ai_generate::usage).post(ai_generate::generate),
        )
        .route("/api/playlists/export", get(export::usage).post(export::export))
        .route("/api/playlists/:id", get(playlists::get_playlist))
}

pub fn music_routes() -> Router<AppState> {
    Router::new()
        .route("/api/music/links", get(music::streaming_links))
        .route("/api/music/track-link", get(music::track_link))
        .route("/api/music/spotify/search", get(music::spotify_search))
        .route("/api/music/extract", post(music::extract))
}
