//! Domain services and external integrations

pub mod apple;
pub mod generator;
pub mod llm;
pub mod mock_playlist;
pub mod password;
pub mod recommender;
pub mod song_info;
pub mod spotify;
pub mod streaming;
pub mod track_catalog;

pub use generator::{GeneratedPlaylist, GeneratedTrack, PlaylistGenerationParams, PlaylistGenerator};
pub use llm::{LlmClient, LlmError};
pub use song_info::{SongData, SongInfoClient, SongInfoError};
pub use spotify::{ExternalPlaylist, SpotifyClient, SpotifyError};
pub use streaming::{StreamingLinks, StreamingService};
