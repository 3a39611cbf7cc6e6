//! Subscription and plan catalog routes.

use axum::{extract::State, Json};

use taskhive_core::{plan_catalog, SubscriptionAccessInfo, SubscriptionLookupError, SubscriptionPlan};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/v1/subscription - the caller's current access view.
pub async fn get_subscription(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<SubscriptionAccessInfo>> {
    let user_id = user
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("x-user-id header required"))?;

    let info = state
        .subscriptions
        .check_access(user_id)
        .await
        .map_err(|e| match e {
            SubscriptionLookupError::UnknownUser { user_id } => {
                ApiError::entity_not_found(format!("No subscription for user {}", user_id))
            }
            other => ApiError::service_unavailable(other.to_string()),
        })?;

    Ok(Json(info))
}

/// GET /api/v1/plans - the static plan catalog.
pub async fn list_plans() -> Json<&'static [SubscriptionPlan]> {
    Json(plan_catalog())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{identity_middleware, USER_ID_HEADER};
    use crate::repo::InMemoryTaskRepository;
    use crate::subscription::InMemorySubscriptionProvider;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use std::sync::Arc;
    use taskhive_cache::{CacheMetrics, KvStore, MemoryStore, NoopMetrics, TaskCache};
    use taskhive_core::{PlanType, UserId};
    use tower::ServiceExt; // for `oneshot`

    fn test_app(provider: Arc<InMemorySubscriptionProvider>) -> Router {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let metrics: Arc<dyn CacheMetrics> = Arc::new(NoopMetrics);
        let state = AppState {
            repo: Arc::new(InMemoryTaskRepository::new()),
            cache: Arc::new(TaskCache::new(store, metrics)),
            subscriptions: provider,
            config: Arc::new(crate::config::ApiConfig::default()),
            start_time: std::time::Instant::now(),
        };

        Router::new()
            .route("/api/v1/subscription", get(get_subscription))
            .route("/api/v1/plans", get(list_plans))
            .layer(middleware::from_fn(identity_middleware))
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read should succeed");
        serde_json::from_slice(&bytes).expect("body should be json")
    }

    #[tokio::test]
    async fn test_subscription_requires_identity() {
        let app = test_app(Arc::new(InMemorySubscriptionProvider::new()));
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/v1/subscription")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_subscription_returns_access_view() {
        let provider = Arc::new(InMemorySubscriptionProvider::new());
        let user = UserId::generate();
        provider.upsert(SubscriptionAccessInfo::active(user, PlanType::Yearly, 200));

        let app = test_app(provider);
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/v1/subscription")
                    .header(USER_ID_HEADER, user.to_string())
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ACTIVE");
        assert_eq!(body["plan_type"], "YEARLY");
        assert_eq!(body["has_access"], true);
    }

    #[tokio::test]
    async fn test_plans_catalog() {
        let app = test_app(Arc::new(InMemorySubscriptionProvider::new()));
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/v1/plans")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().map(|plans| plans.len()), Some(3));
    }
}
