//! Taskhive API - HTTP Layer
//!
//! Axum-based HTTP surface over the Taskhive cache layer:
//! - Task read routes that consult the cache first and repopulate on miss
//! - Task write routes that invalidate the four related cache entries
//! - A per-route premium subscription gate with fail-open semantics
//! - Health, cache stats, and Prometheus metrics endpoints

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod macros;
pub mod repo;
pub mod routes;
pub mod state;
pub mod subscription;
pub mod telemetry;

pub use auth::{identity_middleware, AuthContext, CurrentUser};
pub use config::{ApiConfig, CacheBackendKind};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use gate::{decide, GateConfig, GateDecision, PremiumGateState, UpgradeRequired};
pub use state::{ApiTaskCache, AppState};
