//! Database models
//!
//! Row structs are decoded by hand from `SqliteRow` so that the JSON list
//! columns (`genres`, `favorite_genres`, `favorite_moods`) surface as
//! `Vec<String>`.

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Decode a JSON text array column
pub fn decode_string_list(raw: &str) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

/// Encode a list for a JSON text array column
pub fn encode_string_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Display name, unique across users
    #[serde(rename = "name")]
    pub username: String,
    pub email: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Columns expected: id, username, email, image, bio, created_at, updated_at
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            image: row.try_get("image")?,
            bio: row.try_get("bio")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicProfile {
    pub id: String,
    pub user_id: String,
    pub favorite_genres: Vec<String>,
    pub favorite_moods: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MusicProfile {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let genres: String = row.try_get("favorite_genres")?;
        let moods: String = row.try_get("favorite_moods")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            favorite_genres: decode_string_list(&genres)?,
            favorite_moods: decode_string_list(&moods)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Streaming-service track id (Spotify)
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub genres: Vec<String>,
    pub play_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Song {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let genres: String = row.try_get("genres")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            artist: row.try_get("artist")?,
            album: row.try_get("album")?,
            external_id: row.try_get("external_id")?,
            external_url: row.try_get("external_url")?,
            genres: decode_string_list(&genres)?,
            play_count: row.try_get("play_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub creator_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Playlist {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            is_public: row.try_get::<i64, _>("is_public")? != 0,
            creator_id: row.try_get("creator_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub user_id: String,
    pub song_id: String,
    pub explanation: String,
    pub is_liked: bool,
    pub created_at: String,
}

impl Recommendation {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            song_id: row.try_get("song_id")?,
            explanation: row.try_get("explanation")?,
            is_liked: row.try_get::<i64, _>("is_liked")? != 0,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_list_encoding() {
        let genres = vec!["Rock".to_string(), "R&B".to_string()];
        let encoded = encode_string_list(&genres);
        assert_eq!(encoded, r#"["Rock","R&B"]"#);
        assert_eq!(decode_string_list(&encoded).unwrap(), genres);
    }

    #[test]
    fn test_blank_list_decodes_empty() {
        assert!(decode_string_list("").unwrap().is_empty());
        assert!(decode_string_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_list_is_error() {
        assert!(decode_string_list("not json").is_err());
    }

    #[test]
    fn test_user_serializes_username_as_name() {
        let user = User {
            id: "u1".to_string(),
            username: "ada".to_string(),
            email: None,
            image: None,
            bio: Some("hi".to_string()),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["name"], "ada");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00.000Z");
        assert!(json.get("username").is_none());
    }
}
