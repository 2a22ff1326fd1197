//! Process-local key-value store

use super::{KvError, KvStore};
use async_trait::async_trait;
use reso_common::LogArea;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Map size above which writes start sweeping expired entries
const SWEEP_THRESHOLD: usize = 1024;

/// Minimum time between sweeps while the map is not growing
const SWEEP_SPACING: Duration = Duration::from_secs(60);

/// Default period for [`MemoryKv::spawn_cleanup`]
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug)]
struct Entries {
    map: HashMap<String, Entry>,
    /// Size at which the next write sweeps regardless of spacing
    sweep_at: usize,
    last_sweep: Instant,
}

impl Default for Entries {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            sweep_at: SWEEP_THRESHOLD,
            last_sweep: Instant::now(),
        }
    }
}

impl Entries {
    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_live(now));
        self.sweep_at = (self.map.len() * 2).max(SWEEP_THRESHOLD);
        self.last_sweep = now;
        before - self.map.len()
    }

    /// Sweep before inserting once the map is past the threshold and has
    /// either doubled since the last sweep or not been swept for a while
    fn sweep_if_large(&mut self, now: Instant) {
        let len = self.map.len();
        if len < SWEEP_THRESHOLD {
            return;
        }
        if len >= self.sweep_at || now.duration_since(self.last_sweep) >= SWEEP_SPACING {
            let removed = self.purge_expired(now);
            debug!(area = %LogArea::ExtKv, removed, remaining = self.map.len(), "Swept expired keys");
        }
    }
}

/// In-memory [`KvStore`] with per-key expiry
///
/// Expired entries are dropped on access, by a sweep on write once the map
/// passes a size threshold, and by [`MemoryKv::cleanup_expired`].
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<Entries>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.lock().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every expired entry; returns how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        self.entries.lock().await.purge_expired(Instant::now())
    }

    /// Run [`MemoryKv::cleanup_expired`] every `period` until the task is aborted
    pub fn spawn_cleanup(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.cleanup_expired().await;
                if removed > 0 {
                    debug!(area = %LogArea::ExtKv, removed, "Removed expired keys");
                }
            }
        })
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.map.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.sweep_if_large(now);
        entries.map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|d| now + d),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let (current, expires_at) = match entries.map.get(key) {
            Some(entry) if entry.is_live(now) => {
                let current = entry.value.parse::<i64>().map_err(|_| {
                    KvError::Value(format!("value at '{}' is not an integer", key))
                })?;
                (current, entry.expires_at)
            }
            _ => (0, None),
        };

        let next = current + 1;
        entries.sweep_if_large(now);
        entries.map.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.map.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            Some(_) => {
                entries.map.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn del(&self, key: &str) -> Result<bool, KvError> {
        let mut entries = self.entries.lock().await;
        Ok(entries.map.remove(key).is_some())
    }
}
