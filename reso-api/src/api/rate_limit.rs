//! Per-client request rate limiting
//!
//! Counters live in the key-value store under `ratelimit:<ip>:<path>` and
//! expire one window after the first counted request. Store failures let the
//! request through.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use reso_common::LogArea;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::kv::{KvError, KvStore};
use crate::AppState;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Limit applied to every path starting with `prefix`
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitRule {
    pub prefix: String,
    pub limit: i64,
    pub window: Duration,
}

impl RateLimitRule {
    pub fn new(prefix: impl Into<String>, limit: i64, window: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            limit,
            window,
        }
    }
}

/// Ordered rules; the first matching prefix wins
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub rules: Vec<RateLimitRule>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                RateLimitRule::new("/api/playlists/generate", 10, Duration::from_secs(60 * 60)),
                RateLimitRule::new("/api/recommendations", 60, Duration::from_secs(60)),
            ],
        }
    }
}

impl RateLimitPolicy {
    pub fn rule_for(&self, path: &str) -> Option<&RateLimitRule> {
        self.rules.iter().find(|rule| path.starts_with(&rule.prefix))
    }
}

/// Client address: first `x-forwarded-for` hop, then `x-real-ip`
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .unwrap_or("anonymous")
        .to_string()
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: i64 },
    Limited,
}

/// Count a request against `rule`
pub async fn check_and_count(
    kv: &dyn KvStore,
    key: &str,
    rule: &RateLimitRule,
) -> Result<Decision, KvError> {
    let current = match kv.get(key).await? {
        Some(raw) => raw.trim().parse::<i64>().unwrap_or(0),
        None => 0,
    };
    if current >= rule.limit {
        return Ok(Decision::Limited);
    }

    let count = kv.incr(key).await?;
    if count == 1 {
        kv.expire(key, rule.window).await?;
    }

    Ok(Decision::Allowed {
        remaining: (rule.limit - count).max(0),
    })
}

fn set_headers(headers: &mut HeaderMap, limit: i64, remaining: i64, reset_ms: i64) {
    for (name, value) in [
        (LIMIT_HEADER, limit),
        (REMAINING_HEADER, remaining),
        (RESET_HEADER, reset_ms),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
            headers.insert(name, value);
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let Some(rule) = state.rate_limits.rule_for(&path).cloned() else {
        return next.run(request).await;
    };

    let ip = client_ip(request.headers());
    let key = format!("ratelimit:{}:{}", ip, path);
    let window_ms = i64::try_from(rule.window.as_millis()).unwrap_or(i64::MAX);
    let reset_ms = chrono::Utc::now().timestamp_millis().saturating_add(window_ms);

    match check_and_count(state.kv.as_ref(), &key, &rule).await {
        Ok(Decision::Limited) => {
            debug!(area = %LogArea::ExtKv, ip = %ip, path = %path, "Rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too many requests",
                    "message": "Rate limit exceeded. Please try again later.",
                })),
            )
                .into_response();
            set_headers(response.headers_mut(), rule.limit, 0, reset_ms);
            response
        }
        Ok(Decision::Allowed { remaining }) => {
            let mut response = next.run(request).await;
            set_headers(response.headers_mut(), rule.limit, remaining, reset_ms);
            response
        }
        Err(e) => {
            warn!(area = %LogArea::ExtKv, error = %e, path = %path, "Rate limiting error, allowing request");
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    #[test]
    fn test_client_ip_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "anonymous");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers), "10.0.0.2");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_rule_for_prefix() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.rule_for("/api/playlists/generate").unwrap().limit, 10);
        assert_eq!(policy.rule_for("/api/recommendations").unwrap().limit, 60);
        assert!(policy.rule_for("/api/playlists/ai-generate").is_none());
        assert!(policy.rule_for("/health").is_none());
    }

    #[tokio::test]
    async fn test_check_and_count_limits() {
        let kv = MemoryKv::new();
        let rule = RateLimitRule::new("/api/x", 2, Duration::from_secs(60));

        assert_eq!(
            check_and_count(&kv, "k", &rule).await.unwrap(),
            Decision::Allowed { remaining: 1 }
        );
        assert_eq!(
            check_and_count(&kv, "k", &rule).await.unwrap(),
            Decision::Allowed { remaining: 0 }
        );
        assert_eq!(check_and_count(&kv, "k", &rule).await.unwrap(), Decision::Limited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_resets_count() {
        let kv = MemoryKv::new();
        let rule = RateLimitRule::new("/api/x", 1, Duration::from_secs(60));

        check_and_count(&kv, "k", &rule).await.unwrap();
        assert_eq!(check_and_count(&kv, "k", &rule).await.unwrap(), Decision::Limited);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(
            check_and_count(&kv, "k", &rule).await.unwrap(),
            Decision::Allowed { remaining: 0 }
        );
    }
}
