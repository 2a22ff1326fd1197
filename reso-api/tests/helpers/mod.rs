//! Shared setup for reso-api integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use reso_api::api::rate_limit::RateLimitPolicy;
use async_trait::async_trait;
use reso_api::kv::{KvError, KvStore, MemoryKv};
use reso_api::services::{PlaylistGenerator, SongInfoClient, SpotifyClient};
use reso_api::{build_router, AppState};
use reso_common::config::JinaSettings;
use reso_common::db::init_memory_database;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;
use wiremock::MockServer;

pub const PASSWORD: &str = "correct horse";

/// Router over an in-memory database with mock upstreams
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub spotify: MockServer,
    pub jina: MockServer,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `name=value` part of the session cookie
    pub fn session_cookie(&self) -> Option<String> {
        self.header(header::SET_COOKIE.as_str())
            .and_then(|c| c.split(';').next())
            .map(str::to_string)
    }
}

pub struct TestOptions {
    pub rate_limits: RateLimitPolicy,
    pub jina_key: Option<String>,
    /// Store behind the app; a fresh `MemoryKv` when `None`
    pub kv: Option<Arc<dyn KvStore>>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            rate_limits: RateLimitPolicy::default(),
            jina_key: None,
            kv: None,
        }
    }
}

/// Key-value store whose every command fails as if the remote were down
pub struct UnreachableKv;

#[async_trait]
impl KvStore for UnreachableKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Err(KvError::Network("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), KvError> {
        Err(KvError::Network("connection refused".to_string()))
    }

    async fn incr(&self, _key: &str) -> Result<i64, KvError> {
        Err(KvError::Network("connection refused".to_string()))
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool, KvError> {
        Err(KvError::Network("connection refused".to_string()))
    }

    async fn del(&self, _key: &str) -> Result<bool, KvError> {
        Err(KvError::Network("connection refused".to_string()))
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    pub async fn spawn_with(options: TestOptions) -> Self {
        let pool = init_memory_database().await.expect("in-memory database");
        let spotify = MockServer::start().await;
        let jina = MockServer::start().await;

        let kv: Arc<dyn KvStore> = options.kv.unwrap_or_else(|| Arc::new(MemoryKv::new()));
        let song_info = SongInfoClient::new(&JinaSettings {
            api_url: jina.uri(),
            api_key: options.jina_key,
        })
        .expect("song info client")
        .with_cache(kv.clone())
        .with_batch_pause(Duration::ZERO);

        let state = AppState::new(
            pool.clone(),
            kv,
            PlaylistGenerator::mock_only(),
            SpotifyClient::new(spotify.uri()).expect("spotify client"),
            song_info,
            chrono::Duration::hours(1),
        )
        .with_rate_limits(options.rate_limits);

        Self {
            router: build_router(state),
            pool,
            spotify,
            jina,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        self.request_with_headers(method, uri, body, cookie, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
        extra_headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Register `username` and return its session cookie
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .request(
                "POST",
                "/api/auth/register",
                Some(json!({
                    "username": username,
                    "password": PASSWORD,
                    "email": format!("{}@example.com", username),
                })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.session_cookie().expect("session cookie")
    }

    /// Id of the user behind `cookie`
    pub async fn user_id(&self, cookie: &str) -> String {
        let response = self.request("GET", "/api/users/profile", None, Some(cookie)).await;
        response.body["id"].as_str().expect("profile id").to_string()
    }

    /// Store a Spotify token on the session behind `cookie`
    pub async fn connect_spotify(&self, cookie: &str, token: &str) {
        let response = self
            .request(
                "PUT",
                "/api/auth/spotify-token",
                Some(json!({ "accessToken": token })),
                Some(cookie),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

/// Insert a session row directly, bypassing login
///
/// Foreign keys are switched off for the insert so that `user_id` may name
/// a user that does not exist.
pub async fn seed_session(pool: &SqlitePool, token: &str, user_id: &str, expires_at: &str) {
    let mut conn = pool.acquire().await.expect("connection");
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await
        .expect("disable foreign keys");
    sqlx::query(
        "INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .bind(reso_common::time::now_db())
    .execute(&mut *conn)
    .await
    .expect("insert session");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await
        .expect("enable foreign keys");
}

pub async fn session_exists(pool: &SqlitePool, token: &str) -> bool {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_one(pool)
        .await
        .expect("count sessions");
    count > 0
}

/// Insert a catalogue song directly
pub async fn seed_song(pool: &SqlitePool, title: &str, artist: &str, genres: &[&str]) -> String {
    let genres: Vec<String> = genres.iter().map(|g| g.to_string()).collect();
    let mut conn = pool.acquire().await.expect("connection");
    let song = reso_api::db::songs::insert_song(
        &mut conn,
        &reso_api::db::songs::NewSong {
            title,
            artist,
            album: None,
            external_id: None,
            external_url: None,
            genres: &genres,
        },
    )
    .await
    .expect("insert song");
    song.id
}
