//! Operational endpoints: cache observability.

use axum::{extract::State, Json};

use taskhive_cache::CacheKeyStats;

use crate::state::AppState;

/// GET /api/v1/cache/stats - live key counts per namespace.
///
/// Enumeration failures surface as zero counts, never as an error; this
/// endpoint observes the cache, it does not depend on it.
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheKeyStats> {
    Json(state.cache.stats().await)
}
