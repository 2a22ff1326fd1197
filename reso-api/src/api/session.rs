//! Session cookie handling and request extractors

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    Json,
};
use reso_common::db::User;
use reso_common::LogArea;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::db::sessions::{self, Session};
use crate::db::users;
use crate::error::ApiError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "reso_session";

/// Value of the session cookie, if the request carries one
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value establishing a session
pub fn session_cookie(token: &str, ttl: chrono::Duration) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl.num_seconds().max(0)
    )
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

/// The authenticated user behind the request's session
///
/// Rejects with 401 when there is no live session and with 404 when the
/// session outlived its user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ApiError::Unauthorized)?;

        let session = sessions::find_session(&state.db, &token)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if session.is_expired(reso_common::time::now()) {
            debug!(area = %LogArea::AppAuth, "Rejecting expired session");
            sessions::delete_session(&state.db, &token).await?;
            return Err(ApiError::Unauthorized);
        }

        let user = users::find_by_id(&state.db, &session.user_id)
            .await?
            .ok_or_else(|| {
                warn!(area = %LogArea::AppAuth, user_id = %session.user_id, "Session references missing user");
                ApiError::NotFound("User not found".to_string())
            })?;

        Ok(CurrentUser { user, session })
    }
}

/// JSON body whose parse failures answer 400 "Invalid request"
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let area = LogArea::for_endpoint(req.uri().path());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                debug!(area = %area, error = %rejection.body_text(), "Rejected request body");
                Err(ApiError::bad_request("Invalid request"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; reso_session=abc123; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_session_token_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("reso_session="));
        assert!(session_token(&headers).is_none());
    }

    #[test]
    fn test_cookie_strings() {
        let cookie = session_cookie("tok", chrono::Duration::hours(1));
        assert_eq!(cookie, "reso_session=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600");
        assert!(clear_session_cookie().ends_with("Max-Age=0"));
    }
}
