//! Subscription state types and the static plan catalog.
//!
//! `SubscriptionAccessInfo` is a point-in-time view computed fresh for every
//! gated request; nothing in this module is ever cached, so an access
//! decision can never outlive the subscription state it was derived from.

use serde::{Deserialize, Serialize};

use crate::identity::UserId;

// ============================================================================
// STATUS AND PLAN ENUMS
// ============================================================================

/// Current standing of a user's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Inside the free trial window.
    Trial,
    /// Paid and in good standing.
    Active,
    /// Lapsed: the paid period ended without renewal.
    Expired,
    /// Explicitly cancelled by the user.
    Cancelled,
}

/// Billing plan a subscription is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    Free,
    Monthly,
    Quarterly,
    Yearly,
}

// ============================================================================
// ACCESS INFO
// ============================================================================

/// Point-in-time view of a user's subscription, as consumed by the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionAccessInfo {
    pub user_id: UserId,
    pub status: SubscriptionStatus,
    pub plan_type: PlanType,
    /// Days left in the current trial or paid period. Zero once lapsed.
    pub days_remaining: u32,
    /// Derived: whether gated operations may execute for this user.
    pub has_access: bool,
}

impl SubscriptionAccessInfo {
    /// Build an access view, deriving `has_access` from status and days.
    pub fn derive(
        user_id: UserId,
        status: SubscriptionStatus,
        plan_type: PlanType,
        days_remaining: u32,
    ) -> Self {
        let has_access = match status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Trial => days_remaining > 0,
            SubscriptionStatus::Expired | SubscriptionStatus::Cancelled => false,
        };
        Self {
            user_id,
            status,
            plan_type,
            days_remaining,
            has_access,
        }
    }

    /// An active paid subscription.
    pub fn active(user_id: UserId, plan_type: PlanType, days_remaining: u32) -> Self {
        Self::derive(user_id, SubscriptionStatus::Active, plan_type, days_remaining)
    }

    /// A trial subscription with the given number of days left.
    pub fn trial(user_id: UserId, days_remaining: u32) -> Self {
        Self::derive(user_id, SubscriptionStatus::Trial, PlanType::Free, days_remaining)
    }

    /// A lapsed subscription.
    pub fn expired(user_id: UserId, plan_type: PlanType) -> Self {
        Self::derive(user_id, SubscriptionStatus::Expired, plan_type, 0)
    }
}

// ============================================================================
// PLAN CATALOG
// ============================================================================

/// A purchasable plan, as embedded in upgrade-required payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub plan_type: PlanType,
    pub price_cents: u32,
    pub duration_days: u32,
}

const PLAN_CATALOG: [SubscriptionPlan; 3] = [
    SubscriptionPlan {
        plan_type: PlanType::Monthly,
        price_cents: 999,
        duration_days: 30,
    },
    SubscriptionPlan {
        plan_type: PlanType::Quarterly,
        price_cents: 2499,
        duration_days: 90,
    },
    SubscriptionPlan {
        plan_type: PlanType::Yearly,
        price_cents: 7999,
        duration_days: 365,
    },
];

/// The static catalog of purchasable plans.
pub fn plan_catalog() -> &'static [SubscriptionPlan] {
    &PLAN_CATALOG
}

// ============================================================================
// DENIAL MESSAGE SELECTION
// ============================================================================

/// Pick the human-facing wording for an upgrade-required denial.
///
/// A caller-supplied custom message takes precedence over all of these at
/// the gate; this function only computes the default.
pub fn upgrade_message(status: SubscriptionStatus, days_remaining: u32) -> String {
    match status {
        SubscriptionStatus::Trial if days_remaining > 0 => format!(
            "You have {} day(s) left in your trial. Upgrade to keep premium access after it ends.",
            days_remaining
        ),
        SubscriptionStatus::Trial => {
            "Your trial has expired. Upgrade to a paid plan to continue.".to_string()
        }
        SubscriptionStatus::Expired => {
            "Your subscription has expired. Renew to continue using premium features.".to_string()
        }
        SubscriptionStatus::Active | SubscriptionStatus::Cancelled => {
            "A premium subscription is required for this feature.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_derivation() {
        let user = UserId::generate();
        assert!(SubscriptionAccessInfo::active(user, PlanType::Monthly, 12).has_access);
        assert!(SubscriptionAccessInfo::trial(user, 3).has_access);
        assert!(!SubscriptionAccessInfo::trial(user, 0).has_access);
        assert!(!SubscriptionAccessInfo::expired(user, PlanType::Yearly).has_access);
        assert!(
            !SubscriptionAccessInfo::derive(
                user,
                SubscriptionStatus::Cancelled,
                PlanType::Monthly,
                5
            )
            .has_access
        );
    }

    #[test]
    fn test_trial_message_includes_days() {
        let msg = upgrade_message(SubscriptionStatus::Trial, 2);
        assert!(msg.contains('2'));
        assert!(msg.to_lowercase().contains("trial"));
    }

    #[test]
    fn test_trial_expired_wording() {
        let msg = upgrade_message(SubscriptionStatus::Trial, 0);
        assert!(msg.to_lowercase().contains("expired"));
    }

    #[test]
    fn test_expired_wording_mentions_renewal() {
        let msg = upgrade_message(SubscriptionStatus::Expired, 0);
        assert!(msg.to_lowercase().contains("expired"));
        assert!(msg.to_lowercase().contains("renew"));
    }

    #[test]
    fn test_catalog_covers_paid_plans() {
        let plans = plan_catalog();
        assert_eq!(plans.len(), 3);
        assert!(plans.iter().any(|p| p.plan_type == PlanType::Monthly));
        assert!(plans.iter().any(|p| p.plan_type == PlanType::Quarterly));
        assert!(plans.iter().any(|p| p.plan_type == PlanType::Yearly));
        assert!(plans.iter().all(|p| p.price_cents > 0 && p.duration_days > 0));
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::Trial).expect("serialize");
        assert_eq!(json, "\"TRIAL\"");
    }
}
