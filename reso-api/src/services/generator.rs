//! AI playlist generation
//!
//! [`PlaylistGenerator`] asks the configured LLM for a playlist and falls back
//! to [`mock_playlist`](super::mock_playlist) when no key is configured or
//! anything about the exchange fails.

use super::llm::{ChatMessage, ChatOptions, LlmClient, LlmError};
use super::mock_playlist::generate_mock_playlist;
use reso_common::LogArea;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

/// Track count used when the request does not give one
pub const DEFAULT_TRACK_COUNT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistGenerationParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_count: Option<u32>,
}

impl PlaylistGenerationParams {
    pub fn track_count(&self) -> u32 {
        self.track_count.unwrap_or(DEFAULT_TRACK_COUNT)
    }

    /// Requested genres, ignoring an empty list
    pub fn genres(&self) -> Option<&[String]> {
        self.genres.as_deref().filter(|g| !g.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTrack {
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlaylist {
    pub name: String,
    pub description: String,
    pub tracks: Vec<GeneratedTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_description: Option<String>,
    pub explanation: String,
}

/// Instructions sent as the system message
pub fn system_prompt() -> &'static str {
    r#"You are a music expert and playlist curator who creates personalized playlists.
Your responses must be in valid JSON format and include real songs that match the user's criteria.
You have the ability to search online for the latest information about music, artists, and tracks.

When creating a playlist:
1. Focus on finding real songs that truly match the given criteria - genre, mood, era, etc.
2. Include accurate information about each track (title, artist, album, year)
3. Provide thoughtful explanations for why each track fits the playlist
4. Ensure a cohesive playlist flow by considering track order and transitions
5. Make use of your online search ability to find accurate and up-to-date information

Your response must be a valid JSON object with this structure:
{
  "name": "Playlist name",
  "description": "Playlist description",
  "explanation": "Overall explanation of the playlist's theme and curation strategy",
  "coverDescription": "A description of what would make a good cover image for this playlist",
  "tracks": [
    {
      "title": "Track title",
      "artist": "Artist name",
      "album": "Album name",
      "year": "Release year",
      "explanation": "Why this track fits the playlist",
      "genres": ["genre1", "genre2"]
    }
  ]
}"#
}

/// `"Rock"` or `"Rock, Jazz"` followed by "genre" / "genres"
pub fn genre_phrase(genres: &[String]) -> String {
    format!(
        "{} genre{}",
        genres.join(", "),
        if genres.len() > 1 { "s" } else { "" }
    )
}

/// User message describing the requested playlist
pub fn user_prompt(params: &PlaylistGenerationParams) -> String {
    let mut prompt = format!("Create a playlist called \"{}\"", params.name);

    if let Some(description) = params.description.as_deref().filter(|d| !d.is_empty()) {
        prompt.push_str(&format!(" described as \"{}\"", description));
    }

    prompt.push_str(&format!(" with {} tracks", params.track_count()));

    if let Some(mood) = params.mood.as_deref().filter(|m| !m.is_empty()) {
        prompt.push_str(&format!(" with a {} mood", mood));
    }

    if let Some(genres) = params.genres() {
        prompt.push_str(&format!(" in the {}", genre_phrase(genres)));
    }

    if let Some(era) = params.era.as_deref().filter(|e| !e.is_empty()) {
        prompt.push_str(&format!(" from the {}", era));
    }

    prompt.push_str(".\n\n");
    prompt.push_str(
        "Search for real songs that match these criteria. For each track, provide the title, \
         artist, actual album, release year, and a brief explanation of why it fits the playlist.\n",
    );
    prompt.push_str("Also provide an overall explanation of the playlist's theme and mood.\n");
    prompt
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Years may come back as numbers or strings
fn year_field(value: &Value) -> Option<String> {
    match value.get("year")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    })
}

/// Fill defaults into a model reply
pub fn process_response(result: &Value, params: &PlaylistGenerationParams) -> GeneratedPlaylist {
    let tracks = result
        .get("tracks")
        .and_then(Value::as_array)
        .map(|tracks| {
            tracks
                .iter()
                .map(|track| GeneratedTrack {
                    title: non_empty_str(track, "title").unwrap_or_else(|| "Unknown Title".into()),
                    artist: non_empty_str(track, "artist")
                        .unwrap_or_else(|| "Unknown Artist".into()),
                    album: non_empty_str(track, "album"),
                    year: year_field(track),
                    explanation: non_empty_str(track, "explanation")
                        .unwrap_or_else(|| "This track fits the playlist theme.".into()),
                    genres: track
                        .get("genres")
                        .and_then(string_list)
                        .or_else(|| params.genres.clone()),
                })
                .collect()
        })
        .unwrap_or_default();

    GeneratedPlaylist {
        name: non_empty_str(result, "name").unwrap_or_else(|| params.name.clone()),
        description: non_empty_str(result, "description")
            .or_else(|| params.description.clone().filter(|d| !d.is_empty()))
            .unwrap_or_else(|| {
                format!("A {} playlist", params.mood.as_deref().unwrap_or("custom"))
            }),
        explanation: non_empty_str(result, "explanation")
            .unwrap_or_else(|| "A playlist based on your preferences.".into()),
        cover_description: non_empty_str(result, "coverDescription"),
        tracks,
    }
}

/// Generates playlists through the LLM, or the mock generator without one
#[derive(Debug, Clone)]
pub struct PlaylistGenerator {
    llm: Option<LlmClient>,
}

impl PlaylistGenerator {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    /// Generator that never calls out
    pub fn mock_only() -> Self {
        Self { llm: None }
    }

    pub fn uses_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Always yields a playlist; failures fall back to mock data
    pub async fn generate(
        &self,
        params: &PlaylistGenerationParams,
        conversation_id: &str,
    ) -> GeneratedPlaylist {
        let Some(llm) = &self.llm else {
            info!(area = %LogArea::DataLlm, conversation_id, "No LLM key configured, using mock playlist");
            return generate_mock_playlist(params, &mut rand::thread_rng());
        };

        match self.generate_with_llm(llm, params, conversation_id).await {
            Ok(playlist) => playlist,
            Err(e) => {
                error!(
                    area = %LogArea::DataLlm,
                    conversation_id,
                    error = %e,
                    name = %params.name,
                    "Error generating playlist, using mock playlist"
                );
                generate_mock_playlist(params, &mut rand::thread_rng())
            }
        }
    }

    async fn generate_with_llm(
        &self,
        llm: &LlmClient,
        params: &PlaylistGenerationParams,
        conversation_id: &str,
    ) -> Result<GeneratedPlaylist, LlmError> {
        let messages = [
            ChatMessage::system(system_prompt()),
            ChatMessage::user(user_prompt(params)),
        ];

        let content = llm
            .complete_json(&messages, ChatOptions::default(), conversation_id)
            .await?;
        let result: Value =
            serde_json::from_str(&content).map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(process_response(&result, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reso_common::config::LlmSettings;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params() -> PlaylistGenerationParams {
        PlaylistGenerationParams {
            name: "Run Club".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_user_prompt_minimal() {
        let prompt = user_prompt(&params());
        assert!(prompt.starts_with("Create a playlist called \"Run Club\" with 10 tracks.\n\n"));
    }

    #[test]
    fn test_user_prompt_full() {
        let params = PlaylistGenerationParams {
            name: "Road Trip".to_string(),
            description: Some("windows down".to_string()),
            mood: Some("happy".to_string()),
            genres: Some(vec!["Rock".to_string(), "Indie".to_string()]),
            era: Some("90s".to_string()),
            track_count: Some(15),
        };
        let prompt = user_prompt(&params);
        assert!(prompt.starts_with(
            "Create a playlist called \"Road Trip\" described as \"windows down\" with 15 tracks \
             with a happy mood in the Rock, Indie genres from the 90s."
        ));
    }

    #[test]
    fn test_genre_phrase_singular() {
        assert_eq!(genre_phrase(&["Jazz".to_string()]), "Jazz genre");
    }

    #[test]
    fn test_process_response_defaults() {
        let params = PlaylistGenerationParams {
            mood: Some("chill".to_string()),
            genres: Some(vec!["Lo-fi".to_string()]),
            ..params()
        };
        let result = json!({
            "tracks": [
                { "title": "Sunset", "year": 2019, "genres": ["Ambient"] },
                { "artist": "Nujabes" }
            ]
        });

        let playlist = process_response(&result, &params);
        assert_eq!(playlist.name, "Run Club");
        assert_eq!(playlist.description, "A chill playlist");
        assert_eq!(playlist.explanation, "A playlist based on your preferences.");
        assert_eq!(playlist.tracks.len(), 2);
        assert_eq!(playlist.tracks[0].artist, "Unknown Artist");
        assert_eq!(playlist.tracks[0].year.as_deref(), Some("2019"));
        assert_eq!(playlist.tracks[0].genres, Some(vec!["Ambient".to_string()]));
        assert_eq!(playlist.tracks[1].title, "Unknown Title");
        assert_eq!(playlist.tracks[1].explanation, "This track fits the playlist theme.");
        assert_eq!(playlist.tracks[1].genres, Some(vec!["Lo-fi".to_string()]));
    }

    #[test]
    fn test_process_response_without_tracks() {
        let playlist = process_response(&json!({ "name": "Other" }), &params());
        assert_eq!(playlist.name, "Other");
        assert_eq!(playlist.description, "A custom playlist");
        assert!(playlist.tracks.is_empty());
    }

    #[tokio::test]
    async fn test_mock_only_generator() {
        let generator = PlaylistGenerator::mock_only();
        let playlist = generator.generate(&params(), "conv").await;
        assert_eq!(playlist.tracks.len(), 10);
        assert_eq!(playlist.name, "Run Club");
    }

    #[tokio::test]
    async fn test_llm_reply_is_used() {
        let server = MockServer::start().await;
        let content = json!({
            "name": "Run Club",
            "description": "Fast songs",
            "explanation": "Tempo first",
            "tracks": [{ "title": "Go", "artist": "The Chemical Brothers", "explanation": "Fast" }]
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": content.to_string() } }]
            })))
            .mount(&server)
            .await;

        let settings = LlmSettings {
            api_url: server.uri(),
            api_key: Some("key".to_string()),
            model: "m".to_string(),
            referer: "https://reso.app".to_string(),
        };
        let generator = PlaylistGenerator::new(Some(LlmClient::new(&settings, "key").unwrap()));
        let playlist = generator.generate(&params(), "conv").await;
        assert_eq!(playlist.description, "Fast songs");
        assert_eq!(playlist.tracks.len(), 1);
        assert_eq!(playlist.tracks[0].artist, "The Chemical Brothers");
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back_to_mock() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "not json at all" } }]
            })))
            .mount(&server)
            .await;

        let settings = LlmSettings {
            api_url: server.uri(),
            api_key: Some("key".to_string()),
            model: "m".to_string(),
            referer: "https://reso.app".to_string(),
        };
        let generator = PlaylistGenerator::new(Some(LlmClient::new(&settings, "key").unwrap()));
        let playlist = generator.generate(&params(), "conv").await;
        assert_eq!(playlist.tracks.len(), 10);
        assert!(playlist.explanation.starts_with("This playlist brings together 10"));
    }
}
