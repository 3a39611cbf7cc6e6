//! API Configuration Module
//!
//! Configuration is loaded from environment variables with sensible
//! defaults for development.

use std::path::PathBuf;
use std::time::Duration;

use taskhive_cache::CacheTtlConfig;

/// Which key-value backend the cache uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Process-local HashMap store.
    Memory,
    /// LMDB store persisted on disk.
    Lmdb,
}

impl CacheBackendKind {
    /// Parse the `TASKHIVE_CACHE_BACKEND` value. Unknown values map to the
    /// memory backend so a typo degrades rather than failing startup.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "lmdb" => CacheBackendKind::Lmdb,
            _ => CacheBackendKind::Memory,
        }
    }
}

/// API configuration for the server, cache, and gate.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Which cache backend to construct at startup.
    pub cache_backend: CacheBackendKind,

    /// Directory for LMDB files (lmdb backend only).
    pub lmdb_path: PathBuf,

    /// Maximum LMDB map size in megabytes.
    pub lmdb_max_size_mb: usize,

    /// TTL for single-task cache entries, in seconds.
    pub task_ttl_secs: u64,

    /// TTL for list-view cache entries, in seconds.
    pub list_ttl_secs: u64,

    /// URL embedded in upgrade-required denials.
    pub upgrade_url: String,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            cache_backend: CacheBackendKind::Memory,
            lmdb_path: PathBuf::from("./data/cache"),
            lmdb_max_size_mb: 256,
            task_ttl_secs: 900,
            list_ttl_secs: 600,
            upgrade_url: "https://taskhive.dev/upgrade".to_string(),
            cors_origins: Vec::new(), // Empty = allow all
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TASKHIVE_BIND_ADDR`: Listen address (default: 127.0.0.1:8080)
    /// - `TASKHIVE_CACHE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `TASKHIVE_LMDB_PATH`: LMDB directory (default: ./data/cache)
    /// - `TASKHIVE_LMDB_MAX_SIZE_MB`: LMDB map size (default: 256)
    /// - `TASKHIVE_TASK_TTL_SECS`: Single-task TTL (default: 900)
    /// - `TASKHIVE_LIST_TTL_SECS`: List-view TTL (default: 600)
    /// - `TASKHIVE_UPGRADE_URL`: Upgrade URL for denial payloads
    /// - `TASKHIVE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("TASKHIVE_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let cache_backend = std::env::var("TASKHIVE_CACHE_BACKEND")
            .map(|s| CacheBackendKind::parse(&s))
            .unwrap_or(defaults.cache_backend);

        let lmdb_path = std::env::var("TASKHIVE_LMDB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.lmdb_path);

        let lmdb_max_size_mb = std::env::var("TASKHIVE_LMDB_MAX_SIZE_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.lmdb_max_size_mb);

        let task_ttl_secs = std::env::var("TASKHIVE_TASK_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.task_ttl_secs);

        let list_ttl_secs = std::env::var("TASKHIVE_LIST_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.list_ttl_secs);

        let upgrade_url = std::env::var("TASKHIVE_UPGRADE_URL").unwrap_or(defaults.upgrade_url);

        let cors_origins = std::env::var("TASKHIVE_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            bind_addr,
            cache_backend,
            lmdb_path,
            lmdb_max_size_mb,
            task_ttl_secs,
            list_ttl_secs,
            upgrade_url,
            cors_origins,
        }
    }

    /// Convert the TTL settings into the cache layer's config type.
    pub fn ttl_config(&self) -> CacheTtlConfig {
        CacheTtlConfig::new()
            .with_task_ttl(Duration::from_secs(self.task_ttl_secs))
            .with_list_ttl(Duration::from_secs(self.list_ttl_secs))
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}
