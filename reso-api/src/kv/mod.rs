//! Key-value store used for rate limiting and short-lived caches
//!
//! Two backends implement [`KvStore`]:
//! - [`UpstashKv`]: Redis commands over the Upstash REST protocol
//! - [`MemoryKv`]: process-local map, used when no remote store is configured

mod memory;
mod upstash;

pub use memory::{MemoryKv, DEFAULT_CLEANUP_INTERVAL};
pub use upstash::UpstashKv;

use async_trait::async_trait;
use reso_common::LogArea;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Key-value store errors
#[derive(Debug, Error)]
pub enum KvError {
    /// Transport failure talking to the remote store
    #[error("Key-value store request failed: {0}")]
    Network(String),

    /// Remote store answered with an error
    #[error("Key-value store error: {0}")]
    Api(String),

    /// Stored value has the wrong shape for the operation
    #[error("Key-value store value error: {0}")]
    Value(String),
}

/// Minimal Redis-like command set
#[async_trait]
pub trait KvStore: Send + Sync {
    /// GET: `None` when the key is absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// SET with optional expiry
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError>;

    /// INCR: absent keys start at 0; returns the new value
    async fn incr(&self, key: &str) -> Result<i64, KvError>;

    /// EXPIRE: returns false when the key does not exist
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError>;

    /// DEL: returns true when a key was removed
    async fn del(&self, key: &str) -> Result<bool, KvError>;
}

/// Read a JSON value from the store
///
/// Undecodable entries are logged and treated as a miss.
pub async fn cache_get<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, KvError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(area = %LogArea::ExtKv, key, error = %e, "Failed to parse cached data");
            Ok(None)
        }
    }
}

/// Store a value as JSON, optionally expiring
pub async fn cache_set<T: Serialize>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), KvError> {
    let raw = serde_json::to_string(value).map_err(|e| KvError::Value(e.to_string()))?;
    store.set(key, &raw, ttl).await
}

pub async fn cache_delete(store: &dyn KvStore, key: &str) -> Result<bool, KvError> {
    store.del(key).await
}
