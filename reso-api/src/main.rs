//! reso-api - social music discovery HTTP service

use anyhow::Result;
use clap::Parser;
use reso_common::config::{ConfigOverrides, ServiceConfig};
use reso_common::db::init_database;
use reso_common::LogArea;
use reso_api::db::sessions;
use reso_api::kv::{KvStore, MemoryKv, UpstashKv, DEFAULT_CLEANUP_INTERVAL};
use reso_api::services::{LlmClient, PlaylistGenerator, SongInfoClient, SpotifyClient};
use reso_api::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "reso-api", version, about = "Social music discovery service")]
struct Args {
    /// Path to config.toml
    #[arg(short, long, env = "RESO_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let overrides = ConfigOverrides {
        config_file: args.config,
        bind_address: args.bind,
        port: args.port,
        database_path: args.database,
    };

    // Config comes first so its log level can seed the filter; RUST_LOG wins
    let config = ServiceConfig::load(&overrides)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        area = %LogArea::AppStartup,
        "Starting reso-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config.log_summary();

    let pool = match init_database(&config.database_path).await {
        Ok(pool) => {
            info!(area = %LogArea::AppStartup, "Database ready");
            pool
        }
        Err(e) => {
            error!(area = %LogArea::AppStartup, error = %e, "Failed to open database");
            return Err(e.into());
        }
    };

    match sessions::delete_expired(&pool).await {
        Ok(removed) => info!(area = %LogArea::AppStartup, removed, "Removed expired sessions"),
        Err(e) => error!(area = %LogArea::AppStartup, error = %e, "Failed to remove expired sessions"),
    }

    let kv: Arc<dyn KvStore> = match &config.kv {
        Some(settings) => Arc::new(UpstashKv::new(&settings.rest_url, &settings.rest_token)?),
        None => {
            let memory = Arc::new(MemoryKv::new());
            memory.clone().spawn_cleanup(DEFAULT_CLEANUP_INTERVAL);
            info!(area = %LogArea::AppStartup, "No key-value store configured, using process memory");
            memory
        }
    };

    let llm = match &config.llm.api_key {
        Some(key) => Some(LlmClient::new(&config.llm, key.clone())?),
        None => None,
    };
    let generator = PlaylistGenerator::new(llm);
    let spotify = SpotifyClient::new(&config.spotify_api_url)?;
    let song_info = SongInfoClient::new(&config.jina)?.with_cache(kv.clone());

    let state = AppState::new(
        pool,
        kv,
        generator,
        spotify,
        song_info,
        chrono::Duration::hours(config.session_ttl_hours),
    );
    let app = build_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(area = %LogArea::AppStartup, "reso-api listening on http://{}", addr);
    info!(area = %LogArea::AppStartup, "Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
