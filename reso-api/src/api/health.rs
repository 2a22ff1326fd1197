//! Liveness endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use reso_common::LogArea;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the database does not answer
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub uptime_seconds: u64,
}

/// GET /health (no session needed)
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "ok",
        Err(e) => {
            warn!(area = %LogArea::DataDb, error = %e, "Health check could not reach database");
            "unavailable"
        }
    };

    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthResponse {
        status: if database == "ok" { "ok" } else { "degraded" },
        module: "reso-api",
        version: env!("CARGO_PKG_VERSION"),
        database,
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
