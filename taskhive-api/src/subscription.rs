//! Subscription status provider seam.
//!
//! The gate queries this fresh on every request and never caches the
//! result, so an access decision can never outlive the subscription state
//! it came from. Production wires a store-backed provider; the in-memory
//! implementation backs tests and single-node deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use taskhive_core::{
    PlanType, SubscriptionAccessInfo, SubscriptionLookupError, SubscriptionStatus, UserId,
};

/// Source of per-user subscription state.
#[async_trait]
pub trait SubscriptionProvider: Send + Sync {
    /// Compute the current access view for `user_id`.
    async fn check_access(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionAccessInfo, SubscriptionLookupError>;
}

/// Default state handed to users with no explicit record.
#[derive(Debug, Clone, Copy)]
struct FallbackSubscription {
    status: SubscriptionStatus,
    plan_type: PlanType,
    days_remaining: u32,
}

/// RwLock-map provider for tests and single-node deployments.
pub struct InMemorySubscriptionProvider {
    records: RwLock<HashMap<UserId, SubscriptionAccessInfo>>,
    fallback: Option<FallbackSubscription>,
}

impl InMemorySubscriptionProvider {
    /// Create a provider with no records; unknown users are lookup errors.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            fallback: None,
        }
    }

    /// Create a provider that derives the given state for unknown users.
    ///
    /// Used by the dev wiring so fresh users land on a trial instead of a
    /// lookup error.
    pub fn with_fallback(
        status: SubscriptionStatus,
        plan_type: PlanType,
        days_remaining: u32,
    ) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            fallback: Some(FallbackSubscription {
                status,
                plan_type,
                days_remaining,
            }),
        }
    }

    /// Insert or replace a user's subscription record.
    pub fn upsert(&self, info: SubscriptionAccessInfo) {
        if let Ok(mut records) = self.records.write() {
            records.insert(info.user_id, info);
        }
    }

    /// Remove a user's record, reverting them to the fallback (if any).
    pub fn remove(&self, user_id: UserId) {
        if let Ok(mut records) = self.records.write() {
            records.remove(&user_id);
        }
    }
}

impl Default for InMemorySubscriptionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionProvider for InMemorySubscriptionProvider {
    async fn check_access(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionAccessInfo, SubscriptionLookupError> {
        let records = self
            .records
            .read()
            .map_err(|_| SubscriptionLookupError::Unavailable {
                reason: "subscription store lock poisoned".to_string(),
            })?;

        if let Some(info) = records.get(&user_id) {
            return Ok(info.clone());
        }

        match self.fallback {
            Some(fallback) => Ok(SubscriptionAccessInfo::derive(
                user_id,
                fallback.status,
                fallback.plan_type,
                fallback.days_remaining,
            )),
            None => Err(SubscriptionLookupError::UnknownUser {
                user_id: user_id.as_uuid(),
            }),
        }
    }
}
