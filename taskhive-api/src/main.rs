//! Taskhive API Server Entry Point
//!
//! Bootstraps configuration, constructs the cache backend and metrics
//! recorders, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use taskhive_api::routes::api_router;
use taskhive_api::subscription::InMemorySubscriptionProvider;
use taskhive_api::telemetry::{HttpMetrics, PrometheusCacheMetrics};
use taskhive_api::{ApiConfig, ApiError, ApiResult, AppState, CacheBackendKind};
use taskhive_cache::{CacheMetrics, KvStore, LmdbStore, MemoryStore, TaskCache};
use taskhive_core::{PlanType, SubscriptionStatus};

use taskhive_api::repo::InMemoryTaskRepository;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing();

    let config = ApiConfig::from_env();

    let store = build_store(&config);
    let cache_metrics: Arc<dyn CacheMetrics> = Arc::new(PrometheusCacheMetrics::new()?);
    let http_metrics = Arc::new(HttpMetrics::new()?);

    let cache = Arc::new(TaskCache::with_config(
        store,
        cache_metrics,
        config.ttl_config(),
    ));

    // Fresh users land on a trial; production swaps in a store-backed
    // provider here.
    let subscriptions = Arc::new(InMemorySubscriptionProvider::with_fallback(
        SubscriptionStatus::Trial,
        PlanType::Free,
        14,
    ));

    let state = AppState {
        repo: Arc::new(InMemoryTaskRepository::new()),
        cache,
        subscriptions,
        config: Arc::new(config.clone()),
        start_time: std::time::Instant::now(),
    };

    let app = api_router(state, http_metrics);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", config.bind_addr, e)))?;
    tracing::info!(%addr, backend = ?config.cache_backend, "Starting Taskhive API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("taskhive=info,tower_http=info"));

    let json_logs = std::env::var("TASKHIVE_LOG_JSON")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Construct the configured cache backend.
///
/// An LMDB open failure falls back to the in-memory store with a warning
/// instead of failing startup - a degraded cache is still a cache.
fn build_store(config: &ApiConfig) -> Arc<dyn KvStore> {
    match config.cache_backend {
        CacheBackendKind::Memory => Arc::new(MemoryStore::new()),
        CacheBackendKind::Lmdb => {
            match LmdbStore::open(&config.lmdb_path, config.lmdb_max_size_mb) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::warn!(
                        path = %config.lmdb_path.display(),
                        error = %e,
                        "failed to open LMDB cache, falling back to in-memory store"
                    );
                    Arc::new(MemoryStore::new())
                }
            }
        }
    }
}
