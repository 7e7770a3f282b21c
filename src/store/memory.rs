//! In-memory store backend for single-process operation.
//!
//! Lock-based. An expired entry is dropped the next time its key is touched,
//! and every `PURGE_EVERY_WRITES` writes the whole map is swept, so keys that
//! are never read again do not accumulate. State is not shared between
//! processes or kept across restarts.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{KvStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Writes between two sweeps of expired entries.
const PURGE_EVERY_WRITES: usize = 64;

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, Entry>,
    writes_since_purge: usize,
}

impl Entries {
    fn insert(&mut self, key: &str, entry: Entry, now: Instant) {
        self.map.insert(key.to_string(), entry);
        self.writes_since_purge += 1;
        if self.writes_since_purge >= PURGE_EVERY_WRITES {
            self.map.retain(|_, e| !e.is_expired(now));
            self.writes_since_purge = 0;
        }
    }
}

/// Process-local `KvStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining time-to-live of `key`, `None` when missing or persistent.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries
            .map
            .get(key)
            .filter(|e| !e.is_expired(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.map.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let (current, expires_at) = match entries.map.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let current = entry.value.parse::<i64>().map_err(|_| {
                    StoreError::Rejected(format!("value at '{key}' is not an integer"))
                })?;
                (current, entry.expires_at)
            }
            _ => (0, None),
        };

        let next = current + 1;
        entries.insert(
            key,
            Entry {
                value: next.to_string(),
                expires_at,
            },
            now,
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.map.get_mut(key) {
            if !entry.is_expired(now) {
                entry.expires_at = Some(now + ttl);
            }
        }
        Ok(())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
            now,
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.map.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.map.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
