//! Streaming service links
//!
//! Track links are search links; no catalog lookup happens here. Playlist
//! export produces placeholder links until a real export path exists for
//! each service.

use reso_common::LogArea;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingService {
    Spotify,
    Apple,
    Youtube,
}

impl StreamingService {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingService::Spotify => "spotify",
            StreamingService::Apple => "apple",
            StreamingService::Youtube => "youtube",
        }
    }

    pub fn log_area(&self) -> LogArea {
        match self {
            StreamingService::Spotify => LogArea::ExtSpotify,
            StreamingService::Apple => LogArea::ExtApple,
            StreamingService::Youtube => LogArea::ExtYoutube,
        }
    }
}

impl fmt::Display for StreamingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamingService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spotify" => Ok(StreamingService::Spotify),
            "apple" => Ok(StreamingService::Apple),
            "youtube" => Ok(StreamingService::Youtube),
            other => Err(format!("Unknown streaming service '{}'", other)),
        }
    }
}

/// Links for one track or playlist on one service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingLinks {
    pub web_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_deep_link: Option<String>,
    pub embeddable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_code: Option<String>,
}

/// A track in an export request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTrack {
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ExportPlaylistParams {
    pub name: String,
    pub description: Option<String>,
    pub tracks: Vec<ExportTrack>,
    pub service: StreamingService,
    pub is_public: bool,
}

pub fn is_ios(user_agent: &str) -> bool {
    ["iPhone", "iPad", "iPod"]
        .iter()
        .any(|device| user_agent.contains(device))
}

/// Apple devices get Apple Music, everyone else Spotify
pub fn detect_optimal_service(user_agent: &str) -> StreamingService {
    if is_ios(user_agent) || user_agent.contains("Mac") {
        StreamingService::Apple
    } else {
        StreamingService::Spotify
    }
}

fn spotify_iframe(path: &str, height: u32) -> String {
    format!(
        r#"<iframe src="https://open.spotify.com/embed/{}" width="300" height="{}" frameborder="0" allowtransparency="true" allow="encrypted-media"></iframe>"#,
        path, height
    )
}

fn apple_iframe(path: &str, height: u32) -> String {
    format!(
        r#"<iframe allow="autoplay *; encrypted-media *;" frameborder="0" height="{}" style="width:100%;max-width:660px;overflow:hidden;background:transparent;" sandbox="allow-forms allow-popups allow-same-origin allow-scripts allow-storage-access-by-user-activation allow-top-navigation-by-user-activation" src="https://embed.music.apple.com/us/{}"></iframe>"#,
        height, path
    )
}

fn youtube_iframe(query: &str) -> String {
    format!(
        r#"<iframe width="560" height="315" src="https://www.youtube.com/embed{}" frameborder="0" allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture" allowfullscreen></iframe>"#,
        query
    )
}

/// Search links for "`track` `artist`" on `service`
pub fn streaming_links(track: &str, artist: &str, service: StreamingService) -> StreamingLinks {
    let encoded = urlencoding::encode(&format!("{} {}", track, artist)).into_owned();

    match service {
        StreamingService::Spotify => StreamingLinks {
            web_url: format!("https://open.spotify.com/search/{}", encoded),
            app_deep_link: Some(format!("spotify:search:{}", encoded)),
            embeddable: true,
            embed_code: Some(spotify_iframe(&format!("search/{}", encoded), 80)),
        },
        StreamingService::Apple => StreamingLinks {
            web_url: format!("https://music.apple.com/us/search?term={}", encoded),
            app_deep_link: Some(format!("music://music.apple.com/us/search?term={}", encoded)),
            embeddable: true,
            embed_code: Some(apple_iframe(&format!("search?term={}", encoded), 150)),
        },
        StreamingService::Youtube => StreamingLinks {
            web_url: format!("https://music.youtube.com/search?q={}", encoded),
            app_deep_link: None,
            embeddable: true,
            embed_code: Some(youtube_iframe(&format!("?listType=search&list={}", encoded))),
        },
    }
}

/// Placeholder playlist links on the requested service
pub fn export_playlist(params: &ExportPlaylistParams) -> StreamingLinks {
    info!(
        area = %params.service.log_area(),
        name = %params.name,
        service = %params.service,
        track_count = params.tracks.len(),
        is_public = params.is_public,
        "Exporting playlist"
    );

    let encoded = urlencoding::encode(&params.name).into_owned();

    match params.service {
        StreamingService::Spotify => StreamingLinks {
            web_url: format!("https://open.spotify.com/playlist/mock_id_for_{}", encoded),
            app_deep_link: Some(format!("spotify:playlist:mock_id_for_{}", encoded)),
            embeddable: true,
            embed_code: Some(spotify_iframe(&format!("playlist/mock_id_for_{}", encoded), 380)),
        },
        StreamingService::Apple => {
            let path = format!("playlist/mock-id-for-{}/pl.u-mock-id", encoded);
            StreamingLinks {
                web_url: format!("https://music.apple.com/us/{}", path),
                app_deep_link: Some(format!("music://music.apple.com/us/{}", path)),
                embeddable: true,
                embed_code: Some(apple_iframe(&path, 450)),
            }
        }
        StreamingService::Youtube => StreamingLinks {
            web_url: format!("https://music.youtube.com/playlist?list=mock_id_for_{}", encoded),
            app_deep_link: None,
            embeddable: true,
            embed_code: Some(youtube_iframe(&format!("/playlist?list=mock_id_for_{}", encoded))),
        },
    }
}
