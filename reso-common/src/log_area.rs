//! Log area tags
//!
//! Every log statement in reso carries an `area` field naming the functional
//! part of the system it came from, so that logs can be filtered per area:
//!
//! ```rust,ignore
//! use reso_common::LogArea;
//! tracing::info!(area = %LogArea::ApiPlaylists, request_id = %id, "Generating playlist");
//! ```

use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// Functional area attached to log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogArea {
    // API endpoints
    ApiPlaylists,
    ApiRecommendations,
    ApiUsers,
    ApiAuth,
    ApiMusic,

    // LLM interactions
    LlmPrompt,
    LlmResponse,
    LlmError,

    // Data services
    DataLlm,
    DataJina,
    DataDb,

    // External integrations
    ExtSpotify,
    ExtApple,
    ExtYoutube,
    ExtKv,

    // Application lifecycle
    AppStartup,
    AppAuth,
}

impl LogArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogArea::ApiPlaylists => "api:playlists",
            LogArea::ApiRecommendations => "api:recommendations",
            LogArea::ApiUsers => "api:users",
            LogArea::ApiAuth => "api:auth",
            LogArea::ApiMusic => "api:music",
            LogArea::LlmPrompt => "llm:prompt",
            LogArea::LlmResponse => "llm:response",
            LogArea::LlmError => "llm:error",
            LogArea::DataLlm => "data:llm",
            LogArea::DataJina => "data:jina",
            LogArea::DataDb => "data:db",
            LogArea::ExtSpotify => "ext:spotify",
            LogArea::ExtApple => "ext:apple",
            LogArea::ExtYoutube => "ext:youtube",
            LogArea::ExtKv => "ext:kv",
            LogArea::AppStartup => "app:startup",
            LogArea::AppAuth => "app:auth",
        }
    }

    /// Pick the API area for an endpoint path
    ///
    /// Unknown endpoints are attributed to `api:playlists`.
    pub fn for_endpoint(endpoint: &str) -> LogArea {
        if endpoint.contains("playlists") {
            LogArea::ApiPlaylists
        } else if endpoint.contains("recommendations") {
            LogArea::ApiRecommendations
        } else if endpoint.contains("users") {
            LogArea::ApiUsers
        } else if endpoint.contains("auth") {
            LogArea::ApiAuth
        } else if endpoint.contains("music") {
            LogArea::ApiMusic
        } else {
            LogArea::ApiPlaylists
        }
    }
}

impl fmt::Display for LogArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of an LLM exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmStage {
    Prompt,
    Response,
    Error,
}

impl LlmStage {
    pub fn area(&self) -> LogArea {
        match self {
            LlmStage::Prompt => LogArea::LlmPrompt,
            LlmStage::Response => LogArea::LlmResponse,
            LlmStage::Error => LogArea::LlmError,
        }
    }
}

/// Context recorded with every LLM log line
#[derive(Debug, Clone, Default)]
pub struct LlmLogContext<'a> {
    pub conversation_id: Option<&'a str>,
    pub model: Option<&'a str>,
    pub latency: Option<Duration>,
    pub token_count: Option<u64>,
}

/// Log one stage of an LLM interaction
///
/// The payload (prompt messages or raw response) is only emitted at DEBUG.
pub fn log_llm_interaction(
    stage: LlmStage,
    message: &str,
    payload: &serde_json::Value,
    ctx: &LlmLogContext<'_>,
) {
    let area = stage.area();
    let conversation_id = ctx.conversation_id.unwrap_or("-");
    let model = ctx.model.unwrap_or("-");
    let latency_ms = ctx.latency.map(|d| d.as_millis() as u64);

    match stage {
        LlmStage::Error => error!(
            area = %area,
            conversation_id,
            model,
            latency_ms,
            "{}",
            message
        ),
        _ => info!(
            area = %area,
            conversation_id,
            model,
            latency_ms,
            token_count = ctx.token_count,
            "{}",
            message
        ),
    }

    debug!(area = %area, conversation_id, payload = %payload, "LLM payload");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_tags() {
        assert_eq!(LogArea::ApiPlaylists.to_string(), "api:playlists");
        assert_eq!(LogArea::LlmError.as_str(), "llm:error");
        assert_eq!(LogArea::ExtSpotify.as_str(), "ext:spotify");
    }

    #[test]
    fn test_for_endpoint() {
        assert_eq!(LogArea::for_endpoint("/api/playlists/export"), LogArea::ApiPlaylists);
        assert_eq!(LogArea::for_endpoint("/api/recommendations"), LogArea::ApiRecommendations);
        assert_eq!(LogArea::for_endpoint("/api/users/profile"), LogArea::ApiUsers);
        assert_eq!(LogArea::for_endpoint("/api/auth/login"), LogArea::ApiAuth);
        assert_eq!(LogArea::for_endpoint("/api/music/links"), LogArea::ApiMusic);
        assert_eq!(LogArea::for_endpoint("/health"), LogArea::ApiPlaylists);
    }

    #[test]
    fn test_llm_stage_areas() {
        assert_eq!(LlmStage::Prompt.area(), LogArea::LlmPrompt);
        assert_eq!(LlmStage::Response.area(), LogArea::LlmResponse);
        assert_eq!(LlmStage::Error.area(), LogArea::LlmError);
    }
}
