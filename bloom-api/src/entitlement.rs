//! Entitlement gate: may this user use a feature requiring tier T?
//!
//! The decision is pure and read-only. Admission never throws past this
//! boundary: a store failure while loading the user is logged and reported
//! as denied, so callers always receive a definite answer.

use bloom_common::db::models::{Role, User};
use bloom_common::Tier;
use sqlx::SqlitePool;
use tracing::warn;

use crate::db;

/// The access level a decision was made at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveAccess {
    /// Admin override; bypasses ordinal comparison entirely
    Admin,
    /// Ordinary account, ranked by tier
    Tier(Tier),
}

impl EffectiveAccess {
    /// Label reported to callers. Admin is a sentinel distinct from the
    /// ordinal tier labels.
    pub fn label(self) -> &'static str {
        match self {
            EffectiveAccess::Admin => "admin",
            EffectiveAccess::Tier(tier) => tier.as_str(),
        }
    }
}

/// Outcome of an admission-control query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub granted: bool,
    /// None when no authenticated user was present
    pub effective: Option<EffectiveAccess>,
}

impl AccessDecision {
    fn denied_anonymous() -> Self {
        Self { granted: false, effective: None }
    }
}

/// Decide access for an (optional) user against a required tier.
///
/// Rules, in order:
/// 1. No user: denied.
/// 2. Admin role: granted unconditionally.
/// 3. Otherwise: granted iff the subscription is active AND the plan's
///    tier ranks at or above `required`. A missing or unknown plan label
///    counts as Seedling.
pub fn check_access(user: Option<&User>, required: Tier) -> AccessDecision {
    let Some(user) = user else {
        return AccessDecision::denied_anonymous();
    };

    if user.role == Role::Admin {
        return AccessDecision {
            granted: true,
            effective: Some(EffectiveAccess::Admin),
        };
    }

    let current = user
        .subscription_plan
        .as_deref()
        .map(Tier::parse_or_default)
        .unwrap_or(Tier::Seedling);

    AccessDecision {
        granted: user.has_active_subscription() && current.meets(required),
        effective: Some(EffectiveAccess::Tier(current)),
    }
}

/// Entitlement gate bound to the live user store.
#[derive(Clone)]
pub struct EntitlementGate {
    db: SqlitePool,
}

impl EntitlementGate {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Load the live user record for `email` and decide access. Store
    /// errors degrade to denial rather than propagating.
    pub async fn check_for_email(&self, email: Option<&str>, required: Tier) -> AccessDecision {
        let Some(email) = email else {
            return AccessDecision::denied_anonymous();
        };

        match db::users::find_by_email(&self.db, email).await {
            Ok(user) => check_access(user.as_ref(), required),
            Err(e) => {
                warn!(email, error = %e, "User lookup failed during entitlement check; denying");
                AccessDecision::denied_anonymous()
            }
        }
    }
}
