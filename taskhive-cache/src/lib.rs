//! Cache layer for Taskhive aggregate reads.
//!
//! This crate provides a namespace-keyed, TTL-bounded cache fronting the
//! task read paths, with pluggable storage backends and injected metrics.
//!
//! # Design Philosophy
//!
//! The cache is a best-effort accelerator, never a source of truth. Every
//! failure mode degrades to the single fallback the callers already have:
//! read the source of truth. Backend errors on the read path are folded
//! into miss semantics; backend errors on the write path surface as a
//! typed [`CacheError`] that callers treat as non-fatal.
//!
//! # Key Namespaces
//!
//! Keys follow the `taskhive:<namespace>:<uuid>` convention, partitioning
//! the keyspace by entity kind ([`CacheNamespace`]) so bulk enumeration and
//! targeted invalidation need no separate index. Keys can only be built
//! through [`CacheKey::new`], so an unprefixed key cannot reach a backend.
//!
//! # Example
//!
//! ```ignore
//! let cache = TaskCache::new(Arc::new(MemoryStore::new()), Arc::new(NoopMetrics));
//!
//! cache.cache_task(task.task_id, &task).await?;
//! if let Some(hit) = cache.get_task(task.task_id).await {
//!     return Ok(hit);
//! }
//! // miss: fall back to the repository, then repopulate
//! ```

pub mod key;
pub mod lmdb;
pub mod memory;
pub mod metrics;
pub mod store;
pub mod task_cache;

pub use key::{CacheKey, CacheNamespace};
pub use lmdb::{LmdbStore, LmdbStoreError};
pub use memory::MemoryStore;
pub use metrics::{CacheMetrics, CountingMetrics, NoopMetrics};
pub use store::{CacheError, KvStore};
pub use task_cache::{CacheKeyStats, CacheTtlConfig, EvictionOutcome, TaskCache};
