//! Song catalogue queries

use reso_common::db::{encode_string_list, Song};
use reso_common::{time, Result};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

const SONG_COLUMNS: &str = "s.id, s.title, s.artist, s.album, s.external_id, s.external_url, \
                            s.genres, s.play_count, s.created_at, s.updated_at";

/// Fields for a new song row
#[derive(Debug, Clone)]
pub struct NewSong<'a> {
    pub title: &'a str,
    pub artist: &'a str,
    pub album: Option<&'a str>,
    pub external_id: Option<&'a str>,
    pub external_url: Option<&'a str>,
    pub genres: &'a [String],
}

pub async fn insert_song(conn: &mut SqliteConnection, song: &NewSong<'_>) -> Result<Song> {
    let id = Uuid::new_v4().to_string();
    let now = time::now_db();

    sqlx::query(
        r#"
        INSERT INTO songs (id, title, artist, album, external_id, external_url, genres, play_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(song.title)
    .bind(song.artist)
    .bind(song.album)
    .bind(song.external_id)
    .bind(song.external_url)
    .bind(encode_string_list(song.genres))
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(Song {
        id,
        title: song.title.to_string(),
        artist: song.artist.to_string(),
        album: song.album.map(str::to_string),
        external_id: song.external_id.map(str::to_string),
        external_url: song.external_url.map(str::to_string),
        genres: song.genres.to_vec(),
        play_count: 0,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find_by_external_id(
    conn: &mut SqliteConnection,
    external_id: &str,
) -> Result<Option<Song>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM songs s WHERE s.external_id = ?",
        SONG_COLUMNS
    ))
    .bind(external_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(Song::from_row).transpose()
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Song>> {
    let row = sqlx::query(&format!("SELECT {} FROM songs s WHERE s.id = ?", SONG_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(Song::from_row).transpose()
}

/// Songs sharing at least one of `genres`, never before recommended to the user
pub async fn find_unrecommended_in_genres(
    pool: &SqlitePool,
    user_id: &str,
    genres: &[String],
    limit: i64,
) -> Result<Vec<Song>> {
    if genres.is_empty() || limit <= 0 {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM songs s
        WHERE EXISTS (
                SELECT 1 FROM json_each(s.genres) g
                WHERE g.value IN (SELECT value FROM json_each(?))
            )
          AND s.id NOT IN (SELECT song_id FROM recommendations WHERE user_id = ?)
        LIMIT ?
        "#,
        SONG_COLUMNS
    ))
    .bind(encode_string_list(genres))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(Song::from_row).collect()
}

/// Most played songs not yet recommended to the user and not in `exclude`
pub async fn find_popular_unrecommended(
    pool: &SqlitePool,
    user_id: &str,
    exclude: &[String],
    limit: i64,
) -> Result<Vec<Song>> {
    if limit <= 0 {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM songs s
        WHERE s.id NOT IN (SELECT song_id FROM recommendations WHERE user_id = ?)
          AND s.id NOT IN (SELECT value FROM json_each(?))
        ORDER BY s.play_count DESC, s.created_at ASC
        LIMIT ?
        "#,
        SONG_COLUMNS
    ))
    .bind(user_id)
    .bind(encode_string_list(exclude))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(Song::from_row).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Insert a song with the given genres and play count
    pub async fn seed_song(pool: &SqlitePool, title: &str, genres: &[&str], plays: i64) -> Song {
        let genres: Vec<String> = genres.iter().map(|g| g.to_string()).collect();
        let mut conn = pool.acquire().await.unwrap();
        let song = insert_song(
            &mut conn,
            &NewSong {
                title,
                artist: "Test Artist",
                album: None,
                external_id: None,
                external_url: None,
                genres: &genres,
            },
        )
        .await
        .unwrap();

        sqlx::query("UPDATE songs SET play_count = ? WHERE id = ?")
            .bind(plays)
            .bind(&song.id)
            .execute(&mut *conn)
            .await
            .unwrap();

        Song {
            play_count: plays,
            ..song
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::seed_song;
    use super::*;
    use reso_common::db::init_memory_database;

    #[tokio::test]
    async fn test_genre_overlap() {
        let pool = init_memory_database().await.unwrap();
        seed_song(&pool, "A", &["Jazz", "Blues"], 1).await;
        seed_song(&pool, "B", &["Rock"], 5).await;
        seed_song(&pool, "C", &[], 9).await;

        let found = find_unrecommended_in_genres(&pool, "u", &["Blues".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "A");

        assert!(find_unrecommended_in_genres(&pool, "u", &[], 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_popular_orders_by_play_count_and_excludes() {
        let pool = init_memory_database().await.unwrap();
        let a = seed_song(&pool, "A", &[], 1).await;
        seed_song(&pool, "B", &[], 5).await;
        seed_song(&pool, "C", &[], 9).await;

        let found = find_popular_unrecommended(&pool, "u", &[], 2).await.unwrap();
        let titles: Vec<_> = found.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "B"]);

        let found = find_popular_unrecommended(&pool, "u", &[a.id.clone()], 10)
            .await
            .unwrap();
        assert!(found.iter().all(|s| s.id != a.id));
    }

    #[tokio::test]
    async fn test_find_by_external_id() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let genres = vec!["Pop".to_string()];
        insert_song(
            &mut conn,
            &NewSong {
                title: "Track 1",
                artist: "Unknown Artist",
                album: None,
                external_id: Some("abc"),
                external_url: Some("https://open.spotify.com/track/abc"),
                genres: &genres,
            },
        )
        .await
        .unwrap();

        let song = find_by_external_id(&mut conn, "abc").await.unwrap().unwrap();
        assert_eq!(song.genres, genres);
        assert!(find_by_external_id(&mut conn, "zzz").await.unwrap().is_none());
    }
}
