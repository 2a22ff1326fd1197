//! Playlist persistence

use reso_common::db::{Playlist, Song};
use reso_common::{time, Result};
use serde::Serialize;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// A song at a position within a playlist
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistTrack {
    pub position: i64,
    pub song: Song,
}

pub async fn insert_playlist(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
    is_public: bool,
    creator_id: &str,
) -> Result<Playlist> {
    let id = Uuid::new_v4().to_string();
    let now = time::now_db();

    sqlx::query(
        r#"
        INSERT INTO playlists (id, name, description, is_public, creator_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(description)
    .bind(is_public as i64)
    .bind(creator_id)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(Playlist {
        id,
        name: name.to_string(),
        description: description.map(str::to_string),
        is_public,
        creator_id: creator_id.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn insert_playlist_song(
    conn: &mut SqliteConnection,
    playlist_id: &str,
    song_id: &str,
    added_by_id: &str,
    position: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO playlist_songs (id, playlist_id, song_id, added_by_id, position, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(playlist_id)
    .bind(song_id)
    .bind(added_by_id)
    .bind(position)
    .bind(time::now_db())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find_playlist(pool: &SqlitePool, id: &str) -> Result<Option<Playlist>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, description, is_public, creator_id, created_at, updated_at
        FROM playlists
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(Playlist::from_row).transpose()
}

/// Tracks in playlist order
pub async fn playlist_tracks(pool: &SqlitePool, playlist_id: &str) -> Result<Vec<PlaylistTrack>> {
    let rows = sqlx::query(
        r#"
        SELECT ps.position,
               s.id, s.title, s.artist, s.album, s.external_id, s.external_url,
               s.genres, s.play_count, s.created_at, s.updated_at
        FROM playlist_songs ps
        JOIN songs s ON s.id = ps.song_id
        WHERE ps.playlist_id = ?
        ORDER BY ps.position ASC
        "#,
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(PlaylistTrack {
                position: row.try_get("position")?,
                song: Song::from_row(row)?,
            })
        })
        .collect()
}
