//! Premium subscription gate middleware.
//!
//! Intercepts routes declared as premium-gated, decides access from the
//! caller's current subscription state, and either proceeds, proceeds with
//! a degraded-access warning attached to the response body, or
//! short-circuits with an HTTP 402 upgrade-required payload.
//!
//! # Fail-Open Policy
//!
//! Any error while resolving identity or subscription state maps to
//! Proceed. This is a deliberate availability-over-enforcement trade-off:
//! an enforcement outage must never become a user-facing outage. Do not
//! "fix" this by propagating the error.
//!
//! # Registration
//!
//! The gate is explicit middleware composition, registered per route:
//!
//! ```ignore
//! let gate = PremiumGateState::new(
//!     provider,
//!     GateConfig::new("workspace_insights").allow_read_only(),
//!     upgrade_url,
//! );
//! Router::new()
//!     .route("/reports", get(reports))
//!     .layer(middleware::from_fn_with_state(gate, premium_gate));
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use taskhive_core::{
    plan_catalog, upgrade_message, PlanType, SubscriptionAccessInfo, SubscriptionPlan,
    SubscriptionStatus,
};

use crate::auth::AuthContext;
use crate::subscription::SubscriptionProvider;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Per-route gate parameters.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Name of the gated feature, echoed in warnings and denials.
    pub feature: &'static str,
    /// Custom denial/warning message; overrides the computed default.
    pub message: Option<String>,
    /// Whether GET requests may proceed in degraded (warned) mode.
    pub allow_read_only: bool,
}

impl GateConfig {
    /// Gate a feature with default wording and no read-only degradation.
    pub fn new(feature: &'static str) -> Self {
        Self {
            feature,
            message: None,
            allow_read_only: false,
        }
    }

    /// Override the computed message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Permit degraded read-only access for GET requests.
    pub fn allow_read_only(mut self) -> Self {
        self.allow_read_only = true;
        self
    }
}

// ============================================================================
// DECISION TYPES
// ============================================================================

/// Warning attached to responses served in degraded read-only mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessWarning {
    pub message: String,
    pub status: SubscriptionStatus,
    pub plan_type: PlanType,
    pub show_upgrade_banner: bool,
    pub feature: String,
}

/// Payload returned with HTTP 402 when a gated operation is denied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeRequired {
    pub success: bool,
    pub requires_upgrade: bool,
    pub message: String,
    pub status: SubscriptionStatus,
    pub plan_type: PlanType,
    pub days_remaining: u32,
    pub feature: String,
    pub upgrade_url: String,
    pub plans: Vec<SubscriptionPlan>,
}

/// Terminal outcome of one gated request. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Execute the operation unmodified.
    Proceed,
    /// Execute the operation, then annotate the response.
    ProceedWithWarning(AccessWarning),
    /// Short-circuit without executing the operation.
    Deny(UpgradeRequired),
}

/// Decide the outcome for a resolved subscription state.
///
/// Pure function: identity-absent and lookup-error cases are handled by
/// the middleware before this point (both map to Proceed).
pub fn decide(
    access: &SubscriptionAccessInfo,
    method: &Method,
    config: &GateConfig,
    upgrade_url: &str,
) -> GateDecision {
    if access.has_access {
        return GateDecision::Proceed;
    }

    let message = config
        .message
        .clone()
        .unwrap_or_else(|| upgrade_message(access.status, access.days_remaining));

    // Only GET qualifies as a read for degradation purposes.
    if config.allow_read_only && method == Method::GET {
        return GateDecision::ProceedWithWarning(AccessWarning {
            message,
            status: access.status,
            plan_type: access.plan_type,
            show_upgrade_banner: true,
            feature: config.feature.to_string(),
        });
    }

    GateDecision::Deny(UpgradeRequired {
        success: false,
        requires_upgrade: true,
        message,
        status: access.status,
        plan_type: access.plan_type,
        days_remaining: access.days_remaining,
        feature: config.feature.to_string(),
        upgrade_url: upgrade_url.to_string(),
        plans: plan_catalog().to_vec(),
    })
}

// ============================================================================
// MIDDLEWARE
// ============================================================================

/// Shared state for one gated route.
#[derive(Clone)]
pub struct PremiumGateState {
    pub provider: Arc<dyn SubscriptionProvider>,
    pub config: GateConfig,
    pub upgrade_url: String,
}

impl PremiumGateState {
    /// Bundle a provider and per-route config into middleware state.
    pub fn new(
        provider: Arc<dyn SubscriptionProvider>,
        config: GateConfig,
        upgrade_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            config,
            upgrade_url: upgrade_url.into(),
        }
    }
}

/// Axum middleware enforcing the premium gate on one route.
pub async fn premium_gate(
    State(state): State<PremiumGateState>,
    request: Request,
    next: Next,
) -> Response {
    // Unresolved identity: authentication is enforced elsewhere, the gate
    // only adds a subscription check on top of a resolved principal.
    let Some(auth) = request.extensions().get::<AuthContext>().copied() else {
        return next.run(request).await;
    };

    let access = match state.provider.check_access(auth.user_id).await {
        Ok(access) => access,
        Err(e) => {
            tracing::warn!(
                user_id = %auth.user_id,
                feature = state.config.feature,
                error = %e,
                "subscription lookup failed, failing open"
            );
            return next.run(request).await;
        }
    };

    match decide(&access, request.method(), &state.config, &state.upgrade_url) {
        GateDecision::Proceed => next.run(request).await,
        GateDecision::Deny(payload) => {
            tracing::info!(
                user_id = %auth.user_id,
                feature = state.config.feature,
                status = ?access.status,
                "gated operation denied"
            );
            (StatusCode::PAYMENT_REQUIRED, Json(payload)).into_response()
        }
        GateDecision::ProceedWithWarning(warning) => {
            let response = next.run(request).await;
            attach_warning(response, warning).await
        }
    }
}

/// Attach a warning object to a JSON-object response body.
///
/// Non-object bodies (arrays, scalars, non-JSON) pass through unchanged so
/// degraded mode never changes a response's shape, only annotates it.
async fn attach_warning(response: Response, warning: AccessWarning) -> Response {
    let (mut parts, body) = response.into_parts();

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer response for warning attachment");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let annotated = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(serde_json::Value::Object(mut map)) => {
            match serde_json::to_value(&warning) {
                Ok(warning_value) => {
                    map.insert("subscription_warning".to_string(), warning_value);
                    serde_json::to_vec(&map).ok()
                }
                Err(_) => None,
            }
        }
        _ => None,
    };

    match annotated {
        Some(new_body) => {
            // Length changed; let the transport recompute it.
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(new_body))
        }
        None => Response::from_parts(parts, Body::from(bytes)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{identity_middleware, USER_ID_HEADER};
    use crate::subscription::InMemorySubscriptionProvider;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskhive_core::{SubscriptionLookupError, UserId};
    use tower::ServiceExt; // for `oneshot`

    struct FailingProvider;

    #[async_trait]
    impl SubscriptionProvider for FailingProvider {
        async fn check_access(
            &self,
            _user_id: UserId,
        ) -> Result<SubscriptionAccessInfo, SubscriptionLookupError> {
            Err(SubscriptionLookupError::Unavailable {
                reason: "injected".to_string(),
            })
        }
    }

    fn gated_app(
        provider: Arc<dyn SubscriptionProvider>,
        config: GateConfig,
        calls: Arc<AtomicUsize>,
    ) -> Router {
        let gate = PremiumGateState::new(provider, config, "https://taskhive.dev/upgrade");

        let get_calls = Arc::clone(&calls);
        let post_calls = calls;

        Router::new()
            .route(
                "/gated",
                get(move || {
                    let calls = Arc::clone(&get_calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Json(json!({"items": [1, 2, 3]}))
                    }
                })
                .post(move || {
                    let calls = Arc::clone(&post_calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Json(json!({"created": true}))
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(gate, premium_gate))
            .layer(middleware::from_fn(identity_middleware))
    }

    fn request(method: Method, user: Option<UserId>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method(method).uri("/gated");
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        builder.body(Body::empty()).expect("request should build")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read should succeed");
        serde_json::from_slice(&bytes).expect("body should be json")
    }

    #[tokio::test]
    async fn test_active_user_proceeds_without_warning() {
        let provider = Arc::new(InMemorySubscriptionProvider::new());
        let user = UserId::generate();
        provider.upsert(SubscriptionAccessInfo::active(user, PlanType::Monthly, 20));

        let calls = Arc::new(AtomicUsize::new(0));
        let app = gated_app(provider, GateConfig::new("reports"), Arc::clone(&calls));

        let response = app
            .oneshot(request(Method::GET, Some(user)))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let body = body_json(response).await;
        assert!(body.get("subscription_warning").is_none());
        assert_eq!(body["items"], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_expired_user_write_is_denied_with_402() {
        let provider = Arc::new(InMemorySubscriptionProvider::new());
        let user = UserId::generate();
        provider.upsert(SubscriptionAccessInfo::expired(user, PlanType::Monthly));

        let calls = Arc::new(AtomicUsize::new(0));
        let app = gated_app(provider, GateConfig::new("reports"), Arc::clone(&calls));

        let response = app
            .oneshot(request(Method::POST, Some(user)))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        // The wrapped operation never executed.
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["requires_upgrade"], json!(true));
        assert_eq!(body["status"], json!("EXPIRED"));
        assert_eq!(body["feature"], json!("reports"));
        assert_eq!(body["upgrade_url"], json!("https://taskhive.dev/upgrade"));
        assert!(body["message"]
            .as_str()
            .expect("message should be a string")
            .to_lowercase()
            .contains("expired"));
        assert_eq!(
            body["plans"].as_array().map(|plans| plans.len()),
            Some(plan_catalog().len())
        );
    }

    #[tokio::test]
    async fn test_trial_user_read_only_gets_warning() {
        let provider = Arc::new(InMemorySubscriptionProvider::new());
        let user = UserId::generate();
        // Trialing with days left, but this feature is outside the trial:
        // no access, and reads may degrade.
        let access = SubscriptionAccessInfo::derive(
            user,
            SubscriptionStatus::Trial,
            PlanType::Free,
            2,
        );
        provider.upsert(SubscriptionAccessInfo {
            has_access: false,
            ..access
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let app = gated_app(
            provider,
            GateConfig::new("reports").allow_read_only(),
            Arc::clone(&calls),
        );

        let response = app
            .oneshot(request(Method::GET, Some(user)))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let body = body_json(response).await;
        assert_eq!(body["items"], json!([1, 2, 3]));
        let warning = &body["subscription_warning"];
        assert_eq!(warning["status"], json!("TRIAL"));
        assert_eq!(warning["feature"], json!("reports"));
        assert_eq!(warning["show_upgrade_banner"], json!(true));
        assert!(warning["message"]
            .as_str()
            .expect("message should be a string")
            .contains('2'));
    }

    #[tokio::test]
    async fn test_read_only_does_not_cover_writes() {
        let provider = Arc::new(InMemorySubscriptionProvider::new());
        let user = UserId::generate();
        provider.upsert(SubscriptionAccessInfo::expired(user, PlanType::Yearly));

        let calls = Arc::new(AtomicUsize::new(0));
        let app = gated_app(
            provider,
            GateConfig::new("reports").allow_read_only(),
            Arc::clone(&calls),
        );

        let response = app
            .oneshot(request(Method::POST, Some(user)))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_error_fails_open() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = gated_app(
            Arc::new(FailingProvider),
            GateConfig::new("reports"),
            Arc::clone(&calls),
        );

        let response = app
            .oneshot(request(Method::POST, Some(UserId::generate())))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        // The wrapped operation executed exactly once.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let body = body_json(response).await;
        assert!(body.get("subscription_warning").is_none());
    }

    #[tokio::test]
    async fn test_unresolved_identity_proceeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = gated_app(
            Arc::new(InMemorySubscriptionProvider::new()),
            GateConfig::new("reports"),
            Arc::clone(&calls),
        );

        let response = app
            .oneshot(request(Method::GET, None))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_message_overrides_default() {
        let provider = Arc::new(InMemorySubscriptionProvider::new());
        let user = UserId::generate();
        provider.upsert(SubscriptionAccessInfo::expired(user, PlanType::Monthly));

        let app = gated_app(
            provider,
            GateConfig::new("reports").with_message("Reports need a Pro plan."),
            Arc::new(AtomicUsize::new(0)),
        );

        let response = app
            .oneshot(request(Method::POST, Some(user)))
            .await
            .expect("request should succeed");

        let body = body_json(response).await;
        assert_eq!(body["message"], json!("Reports need a Pro plan."));
    }

    // ------------------------------------------------------------------
    // decide() unit tests (no HTTP involved)
    // ------------------------------------------------------------------

    #[test]
    fn test_decide_trial_days_in_message() {
        let user = UserId::generate();
        let access =
            SubscriptionAccessInfo::derive(user, SubscriptionStatus::Trial, PlanType::Free, 0);
        // days_remaining forced to a non-zero value but access already lapsed
        let access = SubscriptionAccessInfo {
            days_remaining: 2,
            has_access: false,
            ..access
        };

        let decision = decide(
            &access,
            &Method::POST,
            &GateConfig::new("reports"),
            "https://example.test/upgrade",
        );

        match decision {
            GateDecision::Deny(payload) => {
                assert!(payload.message.contains('2'));
                assert_eq!(payload.days_remaining, 2);
            }
            other => panic!("expected Deny, got {:?}", other),
        }
    }

    #[test]
    fn test_decide_access_wins_over_read_only() {
        let user = UserId::generate();
        let access = SubscriptionAccessInfo::active(user, PlanType::Yearly, 300);

        let decision = decide(
            &access,
            &Method::GET,
            &GateConfig::new("reports").allow_read_only(),
            "https://example.test/upgrade",
        );

        assert_eq!(decision, GateDecision::Proceed);
    }

    #[test]
    fn test_decide_head_is_not_a_read() {
        let user = UserId::generate();
        let access = SubscriptionAccessInfo::expired(user, PlanType::Monthly);

        let decision = decide(
            &access,
            &Method::HEAD,
            &GateConfig::new("reports").allow_read_only(),
            "https://example.test/upgrade",
        );

        assert!(matches!(decision, GateDecision::Deny(_)));
    }
}
