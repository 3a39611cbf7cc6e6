//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) so cached aggregates
//! survive process restarts on single-node deployments.
//!
//! # Value Layout
//!
//! Each stored value is `[expires_at_millis: 8 bytes LE][payload]`. The
//! deadline travels with the value because LMDB has no native TTL; a read
//! that observes a past deadline treats the entry as absent and deletes it.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions: read transactions for `get` and key
//! enumeration, write transactions for `set` and `delete`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::store::{CacheError, KvStore};

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for CacheError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Io(io) => CacheError::Io(io),
            other => CacheError::Backend(other.to_string()),
        }
    }
}

/// LMDB-backed [`KvStore`] with deadline-encoded TTLs.
pub struct LmdbStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Str, Bytes>,
}

impl LmdbStore {
    /// Open (or create) an LMDB store at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self { env, db })
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Split a stored value into its deadline and payload.
    ///
    /// Returns `None` for values too short to carry a deadline; treating
    /// them as absent lets a layout change invalidate old entries instead
    /// of corrupting reads.
    fn decode(bytes: &[u8]) -> Option<(i64, &[u8])> {
        if bytes.len() < 8 {
            return None;
        }
        let deadline_bytes: [u8; 8] = bytes[0..8].try_into().ok()?;
        Some((i64::from_le_bytes(deadline_bytes), &bytes[8..]))
    }

    fn encode(payload: &[u8], ttl: Duration) -> Vec<u8> {
        let deadline = Self::now_millis().saturating_add(ttl.as_millis() as i64);
        let mut bytes = Vec::with_capacity(8 + payload.len());
        bytes.extend_from_slice(&deadline.to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn remove_key(&self, key: &str) -> Result<bool, LmdbStoreError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, key)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(deleted)
    }
}

#[async_trait]
impl KvStore for LmdbStore {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let encoded = Self::encode(value, ttl);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, key, &encoded)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let expired = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

            match self
                .db
                .get(&rtxn, key)
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
            {
                Some(bytes) => match Self::decode(bytes) {
                    Some((deadline, payload)) if deadline > Self::now_millis() => {
                        return Ok(Some(payload.to_vec()));
                    }
                    // Past deadline or undecodable: fall through to removal.
                    _ => true,
                },
                None => return Ok(None),
            }
        };

        if expired {
            self.remove_key(key)?;
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.remove_key(key)?)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = Self::now_millis();
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        for result in iter {
            let (key, value) = match result {
                Ok(pair) => pair,
                Err(_) => continue,
            };
            if !key.starts_with(prefix) {
                continue;
            }
            if matches!(Self::decode(value), Some((deadline, _)) if deadline > now) {
                keys.push(key.to_string());
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbStore::open(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _temp_dir) = create_test_store();

        store
            .set("taskhive:task:a", b"payload", Duration::from_secs(60))
            .await
            .expect("set should succeed");

        let value = store.get("taskhive:task:a").await.expect("get should succeed");
        assert_eq!(value.as_deref(), Some(b"payload".as_slice()));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _temp_dir) = create_test_store();

        let value = store.get("taskhive:task:missing").await.expect("get should succeed");
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let (store, _temp_dir) = create_test_store();

        store
            .set("taskhive:task:short", b"v", Duration::from_millis(10))
            .await
            .expect("set should succeed");

        tokio::time::sleep(Duration::from_millis(30)).await;

        let value = store.get("taskhive:task:short").await.expect("get should succeed");
        assert!(value.is_none());

        // Expired entries are also invisible to enumeration.
        let keys = store
            .keys_with_prefix("taskhive:task:")
            .await
            .expect("keys should succeed");
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let (store, _temp_dir) = create_test_store();

        store
            .set("taskhive:task:a", b"v", Duration::from_secs(60))
            .await
            .expect("set should succeed");

        assert!(store.delete("taskhive:task:a").await.expect("delete should succeed"));
        assert!(!store.delete("taskhive:task:a").await.expect("delete should succeed"));
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let (store, _temp_dir) = create_test_store();

        store
            .set("taskhive:task:a", b"v", Duration::from_secs(60))
            .await
            .expect("set should succeed");
        store
            .set("taskhive:task:b", b"v", Duration::from_secs(60))
            .await
            .expect("set should succeed");
        store
            .set("taskhive:user_tasks:c", b"v", Duration::from_secs(60))
            .await
            .expect("set should succeed");

        let mut keys = store
            .keys_with_prefix("taskhive:task:")
            .await
            .expect("keys should succeed");
        keys.sort();
        assert_eq!(
            keys,
            vec!["taskhive:task:a".to_string(), "taskhive:task:b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");

        {
            let store =
                LmdbStore::open(temp_dir.path(), 10).expect("store creation should succeed");
            store
                .set("taskhive:task:a", b"persisted", Duration::from_secs(60))
                .await
                .expect("set should succeed");
        }

        let store = LmdbStore::open(temp_dir.path(), 10).expect("reopen should succeed");
        let value = store.get("taskhive:task:a").await.expect("get should succeed");
        assert_eq!(value.as_deref(), Some(b"persisted".as_slice()));
    }
}
