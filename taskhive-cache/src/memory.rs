//! In-memory cache backend.
//!
//! Backs tests and single-node deployments. Entries carry an expiry
//! deadline; expired entries read as absent and are removed lazily on the
//! read that observes them.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::store::{CacheError, KvStore};

struct StoredEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// HashMap-backed [`KvStore`] with lazy TTL expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries physically present, expired or not.
    ///
    /// Test observability only; use `keys_with_prefix` for live counts.
    pub fn raw_len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Backend("store lock poisoned".into()))?;
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let expired = {
            let entries = self
                .entries
                .read()
                .map_err(|_| CacheError::Backend("store lock poisoned".into()))?;
            match entries.get(key) {
                Some(entry) if entry.is_expired(now) => true,
                Some(entry) => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
            }
        };

        // Expired: drop it so stats don't count dead entries forever.
        if expired {
            let mut entries = self
                .entries
                .write()
                .map_err(|_| CacheError::Backend("store lock poisoned".into()))?;
            if entries.get(key).map(|e| e.is_expired(now)).unwrap_or(false) {
                entries.remove(key);
            }
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Backend("store lock poisoned".into()))?;
        Ok(entries.remove(key).is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        let entries = self
            .entries
            .read()
            .map_err(|_| CacheError::Backend("store lock poisoned".into()))?;
        Ok(entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
