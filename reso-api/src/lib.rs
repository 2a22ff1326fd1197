//! reso-api library - social music discovery HTTP service
//!
//! Accounts and sessions, user search and follows, taste profiles, daily
//! recommendations, playlist generation (catalogue and LLM backed),
//! streaming-service links and song metadata extraction.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod kv;
pub mod services;

use api::rate_limit::RateLimitPolicy;
use kv::KvStore;
use services::{PlaylistGenerator, SongInfoClient, SpotifyClient};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Rate-limit counters and caches
    pub kv: Arc<dyn KvStore>,
    pub generator: Arc<PlaylistGenerator>,
    pub spotify: SpotifyClient,
    pub song_info: SongInfoClient,
    /// Lifetime of newly created sessions
    pub session_ttl: chrono::Duration,
    pub rate_limits: Arc<RateLimitPolicy>,
    /// Service start, for health reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        kv: Arc<dyn KvStore>,
        generator: PlaylistGenerator,
        spotify: SpotifyClient,
        song_info: SongInfoClient,
        session_ttl: chrono::Duration,
    ) -> Self {
        Self {
            db,
            kv,
            generator: Arc::new(generator),
            spotify,
            song_info,
            session_ttl,
            rate_limits: Arc::new(RateLimitPolicy::default()),
            startup_time: Utc::now(),
        }
    }

    pub fn with_rate_limits(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limits = Arc::new(policy);
        self
    }
}

/// Build application router
///
/// Authentication is enforced per handler through the `CurrentUser`
/// extractor; the rate limiter wraps every route and only counts the
/// prefixes named in the policy.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::user_routes())
        .merge(api::recommendation_routes())
        .merge(api::playlist_routes())
        .merge(api::music_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::rate_limit::rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
