//! Shared application state for Axum routers.

use std::sync::Arc;

use taskhive_cache::{CacheMetrics, KvStore, TaskCache};

use crate::config::ApiConfig;
use crate::repo::TaskRepository;
use crate::subscription::SubscriptionProvider;

/// Type alias for the cache used by the API.
///
/// The backend and recorder are chosen at startup from configuration
/// (memory or LMDB; Prometheus or noop), so both sides are trait objects.
pub type ApiTaskCache = TaskCache<dyn KvStore, dyn CacheMetrics>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Source-of-truth task store.
    pub repo: Arc<dyn TaskRepository>,
    /// Cache fronting the task read paths.
    ///
    /// Read routes should consult the cache first and repopulate on miss;
    /// write routes evict the four related entries after committing.
    pub cache: Arc<ApiTaskCache>,
    /// Subscription state provider consulted by the premium gate.
    pub subscriptions: Arc<dyn SubscriptionProvider>,
    /// Loaded configuration.
    pub config: Arc<ApiConfig>,
    pub start_time: std::time::Instant,
}

// Use macro to reduce boilerplate for FromRef implementations
crate::impl_from_ref!(Arc<dyn TaskRepository>, repo);
crate::impl_from_ref!(Arc<ApiTaskCache>, cache);
crate::impl_from_ref!(Arc<dyn SubscriptionProvider>, subscriptions);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(std::time::Instant, start_time);
