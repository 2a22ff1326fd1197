//! Error types for reso-api
//!
//! Every handler returns `ApiResult<T>`. Failures map to a JSON body of the
//! form `{"error": "...", "details": ...}`; internal failures are logged with
//! their cause and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reso_common::LogArea;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {message}")]
    BadRequest {
        message: String,
        details: Option<Value>,
    },

    /// No valid session (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Upstream service rejected the call (502)
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Optional integration not configured (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500); the message is safe to return
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid(message: impl Into<String>, details: Value) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Log `cause` under `area` and return a 500 carrying only `message`
    pub fn internal(area: LogArea, message: &str, cause: impl Display) -> Self {
        error!(area = %area, error = %cause, "{}", message);
        ApiError::Internal(message.to_string())
    }
}

impl From<reso_common::Error> for ApiError {
    fn from(err: reso_common::Error) -> Self {
        match err {
            reso_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            reso_common::Error::InvalidInput(msg) | reso_common::Error::Conflict(msg) => {
                ApiError::bad_request(msg)
            }
            other => ApiError::internal(LogArea::DataDb, "Internal server error", other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::BadRequest { message, details } => (StatusCode::BAD_REQUEST, message, details),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg, None),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let body = match details {
            Some(details) => json!({ "error": message, "details": details }),
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Field-level validation failures, keyed by field name
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record `message` against `field` unless `ok` holds
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when no errors were recorded, else a 400 with the details
    pub fn into_result(self, message: &str) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::invalid(message, self.to_json()))
        }
    }

    pub fn to_json(&self) -> Value {
        let map: serde_json::Map<String, Value> = self
            .errors
            .iter()
            .map(|(field, messages)| (field.clone(), json!({ "_errors": messages })))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));
    }

    #[tokio::test]
    async fn test_bad_request_with_details() {
        let mut errors = FieldErrors::new();
        errors.add("name", "Playlist name is required");
        let response = errors.into_result("Invalid request").unwrap_err().into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid request");
        assert_eq!(body["details"]["name"]["_errors"][0], "Playlist name is required");
    }

    #[tokio::test]
    async fn test_internal_hides_cause() {
        let response = ApiError::internal(LogArea::ApiUsers, "Failed to fetch users", "disk on fire")
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "error": "Failed to fetch users" }));
    }

    #[tokio::test]
    async fn test_common_conflict_maps_to_400() {
        let err: ApiError = reso_common::Error::Conflict("Username is already taken".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "Username is already taken" }));
    }

    #[test]
    fn test_common_not_found_maps_to_404() {
        let err: ApiError = reso_common::Error::NotFound("playlist".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_field_errors_check() {
        let mut errors = FieldErrors::new();
        errors.check(true, "a", "never");
        assert!(errors.is_empty());
        errors.check(false, "b", "bad");
        errors.check(false, "b", "worse");
        assert_eq!(errors.to_json()["b"]["_errors"], json!(["bad", "worse"]));
    }
}
