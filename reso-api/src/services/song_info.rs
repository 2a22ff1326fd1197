//! Song metadata extraction through the Jina Reader API
//!
//! Results are cached in the key-value store for a day, keyed by source URL.

use crate::kv::{cache_get, cache_set, KvStore};
use futures::future::join_all;
use reqwest::Client;
use reso_common::config::JinaSettings;
use reso_common::{time, LogArea};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BATCH_SIZE: usize = 5;
const BATCH_PAUSE: Duration = Duration::from_secs(1);
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const EXTRACT_FIELDS: &[&str] = &[
    "song_title",
    "artist_name",
    "album_name",
    "release_year",
    "genres",
    "duration",
    "popularity",
    "lyrics",
    "cover_art_url",
    "streaming_links",
];

#[derive(Debug, Error)]
pub enum SongInfoError {
    #[error("Jina Reader API key not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Jina Reader API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apple_music_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongData {
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art_url: Option<String>,
    #[serde(default)]
    pub streaming_links: StreamingIds,
    pub source_url: String,
    pub extracted_at: String,
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Map an extraction reply onto [`SongData`]
pub fn map_song_data(reply: &Value, source_url: &str) -> SongData {
    let links = reply.get("streaming_links").cloned().unwrap_or(Value::Null);

    SongData {
        title: text_field(reply, "song_title").unwrap_or_else(|| "Unknown Title".into()),
        artist: text_field(reply, "artist_name").unwrap_or_else(|| "Unknown Artist".into()),
        album: text_field(reply, "album_name"),
        release_year: text_field(reply, "release_year"),
        genres: reply
            .get("genres")
            .and_then(Value::as_array)
            .map(|g| {
                g.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
        duration: text_field(reply, "duration"),
        popularity: reply.get("popularity").and_then(Value::as_f64),
        lyrics: text_field(reply, "lyrics"),
        cover_art_url: text_field(reply, "cover_art_url"),
        streaming_links: StreamingIds {
            spotify: text_field(&links, "spotify"),
            apple_music_id: text_field(&links, "apple_music"),
            youtube_id: text_field(&links, "youtube"),
        },
        source_url: source_url.to_string(),
        extracted_at: time::now_db(),
    }
}

fn cache_key(url: &str) -> String {
    format!("song-info:{}", url)
}

#[derive(Clone)]
pub struct SongInfoClient {
    http_client: Client,
    api_url: String,
    api_key: Option<String>,
    cache: Option<Arc<dyn KvStore>>,
    batch_pause: Duration,
}

impl SongInfoClient {
    pub fn new(settings: &JinaSettings) -> Result<Self, SongInfoError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SongInfoError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            cache: None,
            batch_pause: BATCH_PAUSE,
        })
    }

    pub fn with_cache(mut self, cache: Arc<dyn KvStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn cached(&self, url: &str) -> Option<SongData> {
        let cache = self.cache.as_ref()?;
        match cache_get(cache.as_ref(), &cache_key(url)).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(area = %LogArea::ExtKv, url, error = %e, "Song info cache read failed");
                None
            }
        }
    }

    async fn store(&self, data: &SongData) {
        if let Some(cache) = &self.cache {
            if let Err(e) =
                cache_set(cache.as_ref(), &cache_key(&data.source_url), data, Some(CACHE_TTL)).await
            {
                warn!(area = %LogArea::ExtKv, error = %e, "Song info cache write failed");
            }
        }
    }

    async fn request(&self, api_key: &str, url: &str) -> Result<Value, SongInfoError> {
        let response = self
            .http_client
            .post(format!("{}/extract", self.api_url))
            .bearer_auth(api_key)
            .json(&json!({ "url": url, "fields": EXTRACT_FIELDS }))
            .send()
            .await
            .map_err(|e| SongInfoError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SongInfoError::Api(status.as_u16(), text));
        }

        response
            .json()
            .await
            .map_err(|e| SongInfoError::Parse(e.to_string()))
    }

    /// Extract one song; request failures are logged and yield `None`
    pub async fn extract_song_info(&self, url: &str) -> Result<Option<SongData>, SongInfoError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            error!(area = %LogArea::DataJina, url, "No Jina Reader API key found");
            SongInfoError::NotConfigured
        })?;

        if let Some(hit) = self.cached(url).await {
            return Ok(Some(hit));
        }

        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        info!(area = %LogArea::DataJina, request_id = %request_id, url, "Extracting song info");

        match self.request(api_key, url).await {
            Ok(reply) => {
                info!(
                    area = %LogArea::DataJina,
                    request_id = %request_id,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Extracted song info from {}",
                    url
                );
                let data = map_song_data(&reply, url);
                self.store(&data).await;
                Ok(Some(data))
            }
            Err(e) => {
                error!(
                    area = %LogArea::DataJina,
                    request_id = %request_id,
                    url,
                    latency_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Error extracting song info"
                );
                Ok(None)
            }
        }
    }

    /// Extract in parallel groups of five, pausing between groups
    ///
    /// Failed URLs are dropped from the result.
    pub async fn batch_extract(&self, urls: &[String]) -> Result<Vec<SongData>, SongInfoError> {
        if !self.is_configured() {
            return Err(SongInfoError::NotConfigured);
        }

        info!(area = %LogArea::DataJina, count = urls.len(), "Batch extracting song info");

        let mut results = Vec::with_capacity(urls.len());
        let batches: Vec<&[String]> = urls.chunks(BATCH_SIZE).collect();

        for (index, batch) in batches.iter().enumerate() {
            let outcomes = join_all(batch.iter().map(|url| self.extract_song_info(url))).await;
            for outcome in outcomes {
                if let Some(data) = outcome? {
                    results.push(data);
                }
            }

            if index + 1 < batches.len() && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        info!(
            area = %LogArea::DataJina,
            success_count = results.len(),
            total_count = urls.len(),
            "Batch extraction finished"
        );

        Ok(results)
    }
}
