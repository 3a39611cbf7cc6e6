//! Identity resolution middleware and extractor.
//!
//! Authentication itself is enforced upstream of this core; this module
//! only resolves an already-authenticated principal from the `x-user-id`
//! header into request extensions so the subscription gate and the
//! subscription routes can see who is calling. A request without a
//! resolvable identity is not an error here.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use uuid::Uuid;

use taskhive_core::UserId;

/// Header carrying the authenticated principal's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolved principal for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
}

/// Axum middleware that resolves the request identity.
///
/// Parses `x-user-id` (when present and a valid UUID) into an
/// [`AuthContext`] request extension. Malformed values are logged and
/// ignored rather than rejected - enforcement lives upstream.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    if let Some(raw) = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
    {
        match Uuid::parse_str(raw) {
            Ok(id) => {
                request.extensions_mut().insert(AuthContext {
                    user_id: UserId::new(id),
                });
            }
            Err(_) => {
                tracing::debug!(header = USER_ID_HEADER, "ignoring malformed user id header");
            }
        }
    }

    next.run(request).await
}

/// Typed extractor for the optional request identity.
///
/// Yields `None` when no identity was resolved; it never rejects, so
/// handlers decide for themselves whether anonymous access is acceptable.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Option<AuthContext>);

impl CurrentUser {
    /// The resolved user id, if any.
    pub fn user_id(&self) -> Option<UserId> {
        self.0.map(|ctx| ctx.user_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(parts.extensions.get::<AuthContext>().copied()))
    }
}
