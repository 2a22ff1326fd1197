//! Session persistence

use chrono::{DateTime, Duration, Utc};
use reso_common::{time, Result};
use sqlx::{Row, SqlitePool};

/// Session row joined to nothing; the user is loaded separately
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub spotify_access_token: Option<String>,
    pub expires_at: String,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires_at) => expires_at.with_timezone(&Utc) <= now,
            Err(_) => true,
        }
    }
}

pub async fn create_session(
    pool: &SqlitePool,
    token: &str,
    user_id: &str,
    ttl: Duration,
) -> Result<Session> {
    let now = time::now();
    let expires_at = time::to_db(now + ttl);

    sqlx::query(
        "INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(token)
    .bind(user_id)
    .bind(&expires_at)
    .bind(time::to_db(now))
    .execute(pool)
    .await?;

    Ok(Session {
        token: token.to_string(),
        user_id: user_id.to_string(),
        spotify_access_token: None,
        expires_at,
    })
}

pub async fn find_session(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        "SELECT token, user_id, spotify_access_token, expires_at FROM sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(Session {
            token: row.try_get("token")?,
            user_id: row.try_get("user_id")?,
            spotify_access_token: row.try_get("spotify_access_token")?,
            expires_at: row.try_get("expires_at")?,
        })),
        None => Ok(None),
    }
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove every session past its expiry; returns how many were removed
pub async fn delete_expired(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(time::now_db())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn set_spotify_token(pool: &SqlitePool, token: &str, access_token: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET spotify_access_token = ? WHERE token = ?")
        .bind(access_token)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}
