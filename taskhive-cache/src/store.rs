//! Cache backend trait and error taxonomy.
//!
//! Backends are plain byte-oriented key-value stores with per-entry TTLs.
//! Single-key set/get/delete atomicity of the backend is the only
//! concurrency primitive the cache layer relies on.

use std::time::Duration;

use async_trait::async_trait;

/// Error type for cache backend operations.
///
/// These never propagate past the [`TaskCache`](crate::TaskCache) read
/// path; the write path surfaces them as typed errors for callers to log
/// and drop.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend rejected or failed the operation.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// The value could not be serialized for storage.
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// A stored value could not be deserialized.
    #[error("Cache deserialization error: {0}")]
    Deserialization(String),

    /// I/O error from a file-backed store.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pluggable key-value cache backend.
///
/// Implementations must be thread-safe and honor TTLs: an entry past its
/// deadline reads as absent, whether or not it has been physically removed.
///
/// # Key Format
///
/// Keys are the rendered [`CacheKey`](crate::CacheKey) strings; backends
/// treat them as opaque, but the `taskhive:<namespace>:` convention makes
/// `keys_with_prefix` enumeration by kind possible.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Store `value` under `key` for at most `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Fetch the value under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Delete `key`. Returns whether an entry was present.
    ///
    /// A missing key is not an error.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Enumerate every unexpired key starting with `prefix`.
    ///
    /// Used for stats reporting only, never on a request path.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}
