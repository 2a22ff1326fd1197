//! Recommendation persistence

use reso_common::db::{Recommendation, Song};
use reso_common::{time, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Recommendation joined with its song
#[derive(Debug, Clone)]
pub struct RecommendedSong {
    pub recommendation: Recommendation,
    pub song: Song,
}

pub async fn insert_recommendation(
    pool: &SqlitePool,
    user_id: &str,
    song_id: &str,
    explanation: &str,
) -> Result<Recommendation> {
    let id = Uuid::new_v4().to_string();
    let now = time::now_db();

    sqlx::query(
        r#"
        INSERT INTO recommendations (id, user_id, song_id, explanation, is_liked, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(song_id)
    .bind(explanation)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(Recommendation {
        id,
        user_id: user_id.to_string(),
        song_id: song_id.to_string(),
        explanation: explanation.to_string(),
        is_liked: false,
        created_at: now,
    })
}

/// Recommendations created at or after `since`, newest first
pub async fn recommendations_since(
    pool: &SqlitePool,
    user_id: &str,
    since: &str,
    limit: i64,
) -> Result<Vec<RecommendedSong>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id AS rec_id, r.user_id, r.song_id, r.explanation, r.is_liked,
               r.created_at AS rec_created_at,
               s.id, s.title, s.artist, s.album, s.external_id, s.external_url,
               s.genres, s.play_count, s.created_at, s.updated_at
        FROM recommendations r
        JOIN songs s ON s.id = r.song_id
        WHERE r.user_id = ? AND r.created_at >= ?
        ORDER BY r.created_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(RecommendedSong {
                recommendation: Recommendation {
                    id: row.try_get("rec_id")?,
                    user_id: row.try_get("user_id")?,
                    song_id: row.try_get("song_id")?,
                    explanation: row.try_get("explanation")?,
                    is_liked: row.try_get::<i64, _>("is_liked")? != 0,
                    created_at: row.try_get("rec_created_at")?,
                },
                song: Song::from_row(row)?,
            })
        })
        .collect()
}

pub async fn find_recommendation(pool: &SqlitePool, id: &str) -> Result<Option<Recommendation>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, song_id, explanation, is_liked, created_at
        FROM recommendations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(Recommendation::from_row).transpose()
}

pub async fn set_liked(pool: &SqlitePool, id: &str, is_liked: bool) -> Result<()> {
    sqlx::query("UPDATE recommendations SET is_liked = ? WHERE id = ?")
        .bind(is_liked as i64)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Start of the current UTC day in storage format
pub fn today_start() -> String {
    time::to_db(time::start_of_day(time::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::songs::test_support::seed_song;
    use crate::db::users::create_user;
    use reso_common::db::init_memory_database;

    #[tokio::test]
    async fn test_insert_and_like() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "ada", None, "h").await.unwrap();
        let song = seed_song(&pool, "Song", &["Jazz"], 0).await;

        let rec = insert_recommendation(&pool, &user.id, &song.id, "Trending in Jazz")
            .await
            .unwrap();
        set_liked(&pool, &rec.id, true).await.unwrap();

        let found = find_recommendation(&pool, &rec.id).await.unwrap().unwrap();
        assert!(found.is_liked);
        assert_eq!(found.explanation, "Trending in Jazz");
    }

    #[tokio::test]
    async fn test_since_filters_older_entries() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "ada", None, "h").await.unwrap();
        let song = seed_song(&pool, "Song", &[], 0).await;
        let rec = insert_recommendation(&pool, &user.id, &song.id, "x").await.unwrap();

        sqlx::query("UPDATE recommendations SET created_at = '2020-01-01T00:00:00.000Z' WHERE id = ?")
            .bind(&rec.id)
            .execute(&pool)
            .await
            .unwrap();

        let today = recommendations_since(&pool, &user.id, &today_start(), 10)
            .await
            .unwrap();
        assert!(today.is_empty());

        let all = recommendations_since(&pool, &user.id, "2019-01-01T00:00:00.000Z", 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].song.title, "Song");
    }
}
