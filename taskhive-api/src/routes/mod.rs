//! REST API Routes Module
//!
//! Assembles the Taskhive router:
//! - Task CRUD routes (cache-fronted reads, invalidating writes)
//! - Subscription and plan catalog routes
//! - Health check endpoints (Kubernetes-compatible)
//! - Cache stats and Prometheus /metrics
//!
//! Premium gates are explicit middleware composition registered per route,
//! not discovered by reflection: each gated route names its feature and
//! whether read-only degradation applies.

pub mod admin;
pub mod health;
pub mod subscription;
pub mod task;

use std::sync::Arc;

use axum::{
    http::Method,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::auth::identity_middleware;
use crate::gate::{premium_gate, GateConfig, PremiumGateState};
use crate::state::AppState;
use crate::telemetry::{http_metrics_middleware, metrics_handler, HttpMetrics};

/// Feature flag on the task list views: free users keep read access with
/// an upgrade warning once their subscription lapses.
const INSIGHTS_FEATURE: &str = "workspace_insights";

/// Feature flag on task writes: no degraded mode, lapsed users get the
/// 402 upgrade payload.
const WORKSPACE_FEATURE: &str = "premium_workspace";

/// Build the full application router.
pub fn api_router(state: AppState, http_metrics: Arc<HttpMetrics>) -> Router {
    let upgrade_url = state.config.upgrade_url.clone();

    let insights_gate = middleware::from_fn_with_state(
        PremiumGateState::new(
            Arc::clone(&state.subscriptions),
            GateConfig::new(INSIGHTS_FEATURE).allow_read_only(),
            upgrade_url.clone(),
        ),
        premium_gate,
    );

    let workspace_gate = middleware::from_fn_with_state(
        PremiumGateState::new(
            Arc::clone(&state.subscriptions),
            GateConfig::new(WORKSPACE_FEATURE),
            upgrade_url,
        ),
        premium_gate,
    );

    Router::new()
        // --- task routes ---
        .route(
            "/api/v1/tasks",
            post(task::create_task).route_layer(workspace_gate.clone()),
        )
        .route(
            "/api/v1/tasks/:id",
            get(task::get_task)
                .merge(patch(task::update_task).route_layer(workspace_gate)),
        )
        .route(
            "/api/v1/users/:id/tasks",
            get(task::list_user_tasks).route_layer(insights_gate.clone()),
        )
        .route(
            "/api/v1/teams/:id/tasks",
            get(task::list_team_tasks).route_layer(insights_gate.clone()),
        )
        .route(
            "/api/v1/projects/:id/tasks",
            get(task::list_project_tasks).route_layer(insights_gate),
        )
        // --- subscription routes ---
        .route("/api/v1/subscription", get(subscription::get_subscription))
        .route("/api/v1/plans", get(subscription::list_plans))
        // --- observability ---
        .route("/api/v1/cache/stats", get(admin::cache_stats))
        .route("/health/ping", get(health::ping))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics_handler))
        // --- cross-cutting layers (outermost last) ---
        .layer(middleware::from_fn(identity_middleware))
        .layer(middleware::from_fn_with_state(
            http_metrics,
            http_metrics_middleware,
        ))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

/// CORS policy: permissive in dev (no configured origins), explicit
/// allowlist in production.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<axum::http::HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}
