//! Configuration loading
//!
//! Each setting is resolved with the priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing default config file is not an error; the service starts with
//! defaults and logs a warning.

use crate::{Error, LogArea, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5740;
/// Default bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
/// Default session lifetime (30 days)
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 720;
/// OpenRouter chat completions endpoint
pub const DEFAULT_LLM_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
/// Model used for playlist generation
pub const DEFAULT_LLM_MODEL: &str = "perplexity/pplx-70b-online";
/// Referer reported to the LLM provider
pub const DEFAULT_APP_REFERER: &str = "https://reso.app";
/// Spotify Web API base URL
pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
/// Jina Reader API base URL
pub const DEFAULT_JINA_API_URL: &str = "https://r.jina.ai/reader/v1";

/// Contents of `config.toml`
///
/// Every key is optional; absent keys fall through to the compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub session_ttl_hours: Option<i64>,
    pub llm_api_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub app_referer: Option<String>,
    pub kv_rest_url: Option<String>,
    pub kv_rest_token: Option<String>,
    pub spotify_api_url: Option<String>,
    pub jina_api_url: Option<String>,
    pub jina_api_key: Option<String>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
}

/// LLM provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_url: String,
    /// `None` selects the mock playlist generator
    pub api_key: Option<String>,
    pub model: String,
    pub referer: String,
}

/// Remote key-value store (Upstash-compatible REST) settings
#[derive(Debug, Clone, PartialEq)]
pub struct KvSettings {
    pub rest_url: String,
    pub rest_token: String,
}

/// Jina Reader settings
#[derive(Debug, Clone, PartialEq)]
pub struct JinaSettings {
    pub api_url: String,
    pub api_key: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub log_level: String,
    pub session_ttl_hours: i64,
    pub llm: LlmSettings,
    /// `None` selects the in-process store
    pub kv: Option<KvSettings>,
    pub spotify_api_url: String,
    pub jina: JinaSettings,
}

impl ServiceConfig {
    /// Resolve configuration from CLI overrides, the process environment and
    /// the TOML file named by `--config` (or the default location).
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = match &overrides.config_file {
            Some(path) => load_toml_config(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => load_toml_config(&path)?,
                Some(path) => {
                    warn!(
                        area = %LogArea::AppStartup,
                        "Config file not found at {}, using defaults",
                        path.display()
                    );
                    TomlConfig::default()
                }
                None => TomlConfig::default(),
            },
        };

        Self::resolve(overrides, &toml_config, |name| std::env::var(name).ok())
    }

    /// Apply the CLI > ENV > TOML > default precedence
    ///
    /// `env` looks up an environment variable by name.
    pub fn resolve<F>(overrides: &ConfigOverrides, toml: &TomlConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_nonempty = |name: &str| env(name).filter(|v| is_valid_key(v));

        let bind_address = overrides
            .bind_address
            .clone()
            .or_else(|| env_nonempty("RESO_BIND_ADDRESS"))
            .or_else(|| toml.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let port = match overrides.port {
            Some(port) => port,
            None => match env_nonempty("RESO_PORT") {
                Some(raw) => raw
                    .trim()
                    .parse::<u16>()
                    .map_err(|e| Error::Config(format!("Invalid RESO_PORT '{}': {}", raw, e)))?,
                None => toml.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let database_path = overrides
            .database_path
            .clone()
            .or_else(|| env_nonempty("RESO_DATABASE_PATH").map(PathBuf::from))
            .or_else(|| toml.database_path.clone())
            .unwrap_or_else(default_database_path);

        let log_level = env_nonempty("RESO_LOG_LEVEL")
            .or_else(|| toml.log_level.clone())
            .unwrap_or_else(|| "info".to_string());

        let session_ttl_hours = match env_nonempty("RESO_SESSION_TTL_HOURS") {
            Some(raw) => raw.trim().parse::<i64>().map_err(|e| {
                Error::Config(format!("Invalid RESO_SESSION_TTL_HOURS '{}': {}", raw, e))
            })?,
            None => toml.session_ttl_hours.unwrap_or(DEFAULT_SESSION_TTL_HOURS),
        };
        if session_ttl_hours <= 0 {
            return Err(Error::Config(format!(
                "session_ttl_hours must be positive, got {}",
                session_ttl_hours
            )));
        }

        let llm = LlmSettings {
            api_url: env_nonempty("RESO_LLM_API_URL")
                .or_else(|| toml.llm_api_url.clone())
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            api_key: env_nonempty("OPENROUTER_API_KEY")
                .or_else(|| toml.llm_api_key.clone().filter(|k| is_valid_key(k))),
            model: env_nonempty("RESO_LLM_MODEL")
                .or_else(|| toml.llm_model.clone())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            referer: toml
                .app_referer
                .clone()
                .unwrap_or_else(|| DEFAULT_APP_REFERER.to_string()),
        };

        let kv_url = env_nonempty("KV_REST_API_URL")
            .or_else(|| toml.kv_rest_url.clone().filter(|v| is_valid_key(v)));
        let kv_token = env_nonempty("KV_REST_API_TOKEN")
            .or_else(|| toml.kv_rest_token.clone().filter(|v| is_valid_key(v)));
        let kv = match (kv_url, kv_token) {
            (Some(rest_url), Some(rest_token)) => Some(KvSettings {
                rest_url,
                rest_token,
            }),
            (Some(_), None) | (None, Some(_)) => {
                warn!(
                    area = %LogArea::AppStartup,
                    "Key-value store URL and token must both be set; using in-process store"
                );
                None
            }
            (None, None) => None,
        };

        let spotify_api_url = env_nonempty("RESO_SPOTIFY_API_URL")
            .or_else(|| toml.spotify_api_url.clone())
            .unwrap_or_else(|| DEFAULT_SPOTIFY_API_URL.to_string());

        let jina = JinaSettings {
            api_url: env_nonempty("RESO_JINA_API_URL")
                .or_else(|| toml.jina_api_url.clone())
                .unwrap_or_else(|| DEFAULT_JINA_API_URL.to_string()),
            api_key: env_nonempty("JINA_READER_API_KEY")
                .or_else(|| toml.jina_api_key.clone().filter(|k| is_valid_key(k))),
        };

        Ok(Self {
            bind_address,
            port,
            database_path,
            log_level,
            session_ttl_hours,
            llm,
            kv,
            spotify_api_url,
            jina,
        })
    }

    /// `host:port` string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Log which integrations are active without printing secrets
    pub fn log_summary(&self) {
        info!(area = %LogArea::AppStartup, "Database path: {}", self.database_path.display());
        info!(
            area = %LogArea::AppStartup,
            "LLM provider: {} ({})",
            self.llm.model,
            if self.llm.api_key.is_some() { "configured" } else { "mock fallback" }
        );
        match &self.kv {
            Some(kv) => info!(area = %LogArea::AppStartup, "Key-value store: {}", kv.rest_url),
            None => warn!(area = %LogArea::AppStartup, "Key-value store not configured, rate limits are per-process"),
        }
        if self.jina.api_key.is_none() {
            info!(area = %LogArea::AppStartup, "Jina Reader API key not configured, song extraction disabled");
        }
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Platform config location: `<config_dir>/reso/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reso").join("config.toml"))
}

/// Platform data location: `<data_local_dir>/reso/reso.db`
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("reso"))
        .unwrap_or_else(|| PathBuf::from("./reso_data"))
        .join("reso.db")
}

/// Validate a secret or URL value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
