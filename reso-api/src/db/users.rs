//! User database operations

use reso_common::db::{decode_string_list, User};
use reso_common::{time, Error, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, image, bio, created_at, updated_at";

/// Stored password hash for a user
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Relationship counts shown in user listings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserCounts {
    pub followers: i64,
    pub following: i64,
    pub playlists: i64,
}

/// User listing entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub favorite_genres: Vec<String>,
    #[serde(rename = "_count")]
    pub counts: UserCounts,
}

/// Create a user together with an empty music profile
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: Option<&str>,
    password_hash: &str,
) -> Result<User> {
    let id = Uuid::new_v4().to_string();
    let now = time::now_db();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .map_err(unique_violation_as_conflict)?;

    sqlx::query(
        r#"
        INSERT INTO music_profiles (id, user_id, favorite_genres, favorite_moods, created_at, updated_at)
        VALUES (?, ?, '[]', '[]', ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&id)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(User {
        id,
        username: username.to_string(),
        email: email.map(str::to_string),
        image: None,
        bio: None,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Turn a lost race on the unique username or email into a conflict
fn unique_violation_as_conflict(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = if db_err.message().contains("users.email") {
                "Email is already registered"
            } else {
                "Username is already taken"
            };
            return Error::Conflict(message.to_string());
        }
    }
    Error::Database(err)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(User::from_row).transpose()
}

pub async fn find_credentials(pool: &SqlitePool, username: &str) -> Result<Option<Credentials>> {
    let row = sqlx::query(&format!(
        "SELECT {}, password_hash FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(Credentials {
            user: User::from_row(&row)?,
            password_hash: row.try_get("password_hash")?,
        })),
        None => Ok(None),
    }
}

/// True when `username` belongs to a user other than `except_user_id`
pub async fn username_taken(
    pool: &SqlitePool,
    username: &str,
    except_user_id: Option<&str>,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE username = ? AND (? IS NULL OR id != ?)",
    )
    .bind(username)
    .bind(except_user_id)
    .bind(except_user_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub async fn email_taken(pool: &SqlitePool, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

/// Update display name and, when given, bio
pub async fn update_identity(
    pool: &SqlitePool,
    id: &str,
    username: &str,
    bio: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, bio = COALESCE(?, bio), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(username)
    .bind(bio)
    .bind(time::now_db())
    .bind(id)
    .execute(pool)
    .await
    .map_err(unique_violation_as_conflict)?;

    Ok(())
}

/// Escape LIKE wildcards so the search term matches literally
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

const SEARCH_FILTER: &str =
    "(username LIKE ?1 ESCAPE '\\' OR COALESCE(email, '') LIKE ?1 ESCAPE '\\')";

/// Case-insensitive substring search over username and email
pub async fn search_users(
    pool: &SqlitePool,
    search: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<UserSummary>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT u.id, u.username, u.email, u.image, u.bio,
               COALESCE(mp.favorite_genres, '[]') AS favorite_genres,
               (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS followers,
               (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following,
               (SELECT COUNT(*) FROM playlists p WHERE p.creator_id = u.id) AS playlists
        FROM users u
        LEFT JOIN music_profiles mp ON mp.user_id = u.id
        WHERE {}
        ORDER BY u.username ASC
        LIMIT ?2 OFFSET ?3
        "#,
        SEARCH_FILTER
    ))
    .bind(like_pattern(search))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let genres: String = row.try_get("favorite_genres")?;
            Ok(UserSummary {
                id: row.try_get("id")?,
                name: row.try_get("username")?,
                email: row.try_get("email")?,
                image: row.try_get("image")?,
                bio: row.try_get("bio")?,
                favorite_genres: decode_string_list(&genres)?,
                counts: UserCounts {
                    followers: row.try_get("followers")?,
                    following: row.try_get("following")?,
                    playlists: row.try_get("playlists")?,
                },
            })
        })
        .collect()
}

pub async fn count_users(pool: &SqlitePool, search: &str) -> Result<i64> {
    let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {}", SEARCH_FILTER))
        .bind(like_pattern(search))
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Follow `following_id`; following twice is a no-op
pub async fn follow(pool: &SqlitePool, follower_id: &str, following_id: &str) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(follower_id)
    .bind(following_id)
    .bind(time::now_db())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn unfollow(pool: &SqlitePool, follower_id: &str, following_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
        .bind(follower_id)
        .bind(following_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reso_common::db::init_memory_database;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "ada", Some("ada@example.com"), "h")
            .await
            .unwrap();

        let found = find_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(found, user);

        let profile_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM music_profiles WHERE user_id = ?")
                .bind(&user.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(profile_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_conflict() {
        let pool = init_memory_database().await.unwrap();
        create_user(&pool, "ada", Some("ada@example.com"), "h").await.unwrap();

        match create_user(&pool, "ada", None, "h").await {
            Err(Error::Conflict(msg)) => assert_eq!(msg, "Username is already taken"),
            other => panic!("expected conflict, got {:?}", other),
        }
        match create_user(&pool, "grace", Some("ada@example.com"), "h").await {
            Err(Error::Conflict(msg)) => assert_eq!(msg, "Email is already registered"),
            other => panic!("expected conflict, got {:?}", other),
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM music_profiles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_username_taken_excludes_self() {
        let pool = init_memory_database().await.unwrap();
        let ada = create_user(&pool, "ada", None, "h").await.unwrap();

        assert!(username_taken(&pool, "ada", None).await.unwrap());
        assert!(!username_taken(&pool, "ada", Some(&ada.id)).await.unwrap());
        assert!(!username_taken(&pool, "grace", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_literal() {
        let pool = init_memory_database().await.unwrap();
        create_user(&pool, "Ada_L", None, "h").await.unwrap();
        create_user(&pool, "adam", Some("ADAM@example.com"), "h").await.unwrap();
        create_user(&pool, "grace", None, "h").await.unwrap();

        let found = search_users(&pool, "ada", 10, 0).await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Ada_L", "adam"]);

        // Underscore is not a wildcard
        let found = search_users(&pool, "a_l", 10, 0).await.unwrap();
        assert_eq!(found.len(), 1);

        assert_eq!(count_users(&pool, "example.com").await.unwrap(), 1);
        assert_eq!(count_users(&pool, "").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_follow_counts() {
        let pool = init_memory_database().await.unwrap();
        let ada = create_user(&pool, "ada", None, "h").await.unwrap();
        let grace = create_user(&pool, "grace", None, "h").await.unwrap();

        follow(&pool, &ada.id, &grace.id).await.unwrap();
        follow(&pool, &ada.id, &grace.id).await.unwrap();

        let found = search_users(&pool, "grace", 10, 0).await.unwrap();
        assert_eq!(found[0].counts.followers, 1);
        assert_eq!(found[0].counts.following, 0);

        unfollow(&pool, &ada.id, &grace.id).await.unwrap();
        let found = search_users(&pool, "grace", 10, 0).await.unwrap();
        assert_eq!(found[0].counts.followers, 0);
    }
}
