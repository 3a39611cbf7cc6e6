//! Error types shared across Taskhive crates.

use thiserror::Error;
use uuid::Uuid;

/// Failure to resolve a user's subscription state.
///
/// The gate converts every variant into fail-open passthrough; the variants
/// exist so providers can report what actually went wrong in logs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscriptionLookupError {
    #[error("Subscription store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("No subscription record for user {user_id}")]
    UnknownUser { user_id: Uuid },

    #[error("Subscription lookup failed: {reason}")]
    LookupFailed { reason: String },
}
