//! Music profile persistence

use reso_common::db::{encode_string_list, MusicProfile};
use reso_common::{time, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn find_by_user(pool: &SqlitePool, user_id: &str) -> Result<Option<MusicProfile>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, favorite_genres, favorite_moods, created_at, updated_at
        FROM music_profiles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(MusicProfile::from_row).transpose()
}

/// Favourite genres, empty when the user has no profile
pub async fn favorite_genres(pool: &SqlitePool, user_id: &str) -> Result<Vec<String>> {
    Ok(find_by_user(pool, user_id)
        .await?
        .map(|p| p.favorite_genres)
        .unwrap_or_default())
}

/// Create or update the user's profile; `None` leaves the genres untouched
pub async fn upsert_genres(
    pool: &SqlitePool,
    user_id: &str,
    genres: Option<&[String]>,
) -> Result<MusicProfile> {
    let now = time::now_db();
    let encoded = genres.map(encode_string_list);

    sqlx::query(
        r#"
        INSERT INTO music_profiles (id, user_id, favorite_genres, favorite_moods, created_at, updated_at)
        VALUES (?1, ?2, COALESCE(?3, '[]'), '[]', ?4, ?4)
        ON CONFLICT(user_id) DO UPDATE SET
            favorite_genres = COALESCE(?3, music_profiles.favorite_genres),
            updated_at = ?4
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(encoded.as_deref())
    .bind(&now)
    .execute(pool)
    .await?;

    find_by_user(pool, user_id)
        .await?
        .ok_or_else(|| reso_common::Error::Internal("music profile vanished after upsert".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::create_user;
    use reso_common::db::init_memory_database;

    #[tokio::test]
    async fn test_upsert_updates_existing_profile() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "ada", None, "h").await.unwrap();
        assert!(favorite_genres(&pool, &user.id).await.unwrap().is_empty());

        let genres = vec!["Jazz".to_string(), "Folk".to_string()];
        let profile = upsert_genres(&pool, &user.id, Some(&genres)).await.unwrap();
        assert_eq!(profile.favorite_genres, genres);

        // None keeps what is stored
        let profile = upsert_genres(&pool, &user.id, None).await.unwrap();
        assert_eq!(profile.favorite_genres, genres);
    }

    #[tokio::test]
    async fn test_upsert_none_without_profile_stores_empty_list() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "grace", None, "h").await.unwrap();
        sqlx::query("DELETE FROM music_profiles WHERE user_id = ?")
            .bind(&user.id)
            .execute(&pool)
            .await
            .unwrap();

        let profile = upsert_genres(&pool, &user.id, None).await.unwrap();
        assert!(profile.favorite_genres.is_empty());

        let genres = vec!["Soul".to_string()];
        upsert_genres(&pool, &user.id, Some(&genres)).await.unwrap();
        let profile = upsert_genres(&pool, &user.id, None).await.unwrap();
        assert_eq!(profile.favorite_genres, genres);
    }

    #[tokio::test]
    async fn test_missing_profile_is_none() {
        let pool = init_memory_database().await.unwrap();
        assert!(find_by_user(&pool, "nobody").await.unwrap().is_none());
        assert!(favorite_genres(&pool, "nobody").await.unwrap().is_empty());
    }
}
