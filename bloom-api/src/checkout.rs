//! Checkout session orchestration
//!
//! Builds a payment-provider checkout session for a user and plan. The
//! session itself is never persisted locally: the metadata embedded here is
//! the only thread connecting the provider's later webhook events back to
//! the originating user, so it must carry the application identity, the
//! user's email, and the plan name.
//!
//! Provider calls are never auto-retried. Client retries are absorbed by
//! an idempotency key derived from user, plan, and a 10-minute time
//! bucket, so a double-clicked upgrade button cannot mint two
//! subscriptions.

use async_trait::async_trait;
use bloom_common::db::models::{Role, User};
use bloom_common::Tier;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::entitlement::check_access;

/// Width of the idempotency time bucket, in minutes.
const IDEMPOTENCY_BUCKET_MINUTES: i64 = 10;

/// Metadata key names echoed back in provider webhook payloads.
const META_APP: &str = "app";
const META_USER_EMAIL: &str = "user_email";
const META_PLAN_NAME: &str = "plan_name";

/// Checkout orchestration errors.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// priceId missing from the request; checked before any provider call
    #[error("priceId is required")]
    MissingPrice,

    /// planName is not a known tier
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    /// The user's active plan already covers the requested one
    #[error("Subscription already covers plan: {0}")]
    AlreadyCovered(String),

    /// Provider failure, surfaced with the provider's message and never
    /// auto-retried
    #[error("{0}")]
    Provider(String),
}

/// Payment gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Api(String),

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// Correlation metadata embedded in every checkout session.
///
/// Reconciliation of an asynchronously delivered payment confirmation
/// depends entirely on this bag surviving the round trip through the
/// provider, so the mapping must be lossless both ways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub app: String,
    pub user_email: String,
    pub plan_name: String,
}

impl CheckoutMetadata {
    /// Flatten into the provider's opaque string map.
    pub fn to_map(&self) -> HashMap<String, String> {
        HashMap::from([
            (META_APP.to_string(), self.app.clone()),
            (META_USER_EMAIL.to_string(), self.user_email.clone()),
            (META_PLAN_NAME.to_string(), self.plan_name.clone()),
        ])
    }

    /// Recover the originating identity from an echoed metadata map.
    /// Returns None when any required key is absent.
    pub fn from_map(map: &HashMap<String, String>) -> Option<CheckoutMetadata> {
        Some(CheckoutMetadata {
            app: map.get(META_APP)?.clone(),
            user_email: map.get(META_USER_EMAIL)?.clone(),
            plan_name: map.get(META_PLAN_NAME)?.clone(),
        })
    }
}

/// Everything the gateway needs to create one hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub price_id: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub idempotency_key: String,
    pub metadata: HashMap<String, String>,
}

/// The hosted checkout URL; the only thing exposed to the caller.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub url: String,
}

/// Payment provider abstraction. Exactly one external call per checkout
/// request; implementations must not retry internally.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CreatedSession, GatewayError>;
}

/// Fallback gateway used when no payment provider credentials are
/// configured; every session attempt fails cleanly at request time.
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn create_checkout_session(
        &self,
        _params: CheckoutSessionParams,
    ) -> Result<CreatedSession, GatewayError> {
        Err(GatewayError::Api("payment provider not configured".to_string()))
    }
}

/// Checkout request after identity has been established upstream.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub plan_name: String,
    /// Origin of the inbound request; redirect targets are derived from it
    /// so the session returns the user to the deployment that issued it
    pub origin: String,
}

/// Orchestrates checkout session creation against the payment gateway.
pub struct CheckoutOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    app_name: String,
}

impl CheckoutOrchestrator {
    pub fn new(gateway: Arc<dyn PaymentGateway>, app_name: impl Into<String>) -> Self {
        Self { gateway, app_name: app_name.into() }
    }

    /// Create a hosted checkout session for `user`.
    ///
    /// Validation happens strictly before the provider call: a missing
    /// price, an unknown plan, or a plan the user's active subscription
    /// already covers all fail without any external side effect.
    pub async fn create_session(
        &self,
        user: &User,
        request: &CheckoutRequest,
    ) -> Result<CreatedSession, CheckoutError> {
        if request.price_id.trim().is_empty() {
            return Err(CheckoutError::MissingPrice);
        }

        let requested = Tier::parse(&request.plan_name)
            .ok_or_else(|| CheckoutError::UnknownPlan(request.plan_name.clone()))?;

        // Plan applicability: buying a plan the current subscription already
        // covers would duplicate billing. Admins keep their override for
        // access but purchase like anyone else, so the entitlement check is
        // only consulted for ordinary accounts.
        if user.role != Role::Admin && check_access(Some(user), requested).granted {
            return Err(CheckoutError::AlreadyCovered(request.plan_name.clone()));
        }

        let metadata = CheckoutMetadata {
            app: self.app_name.clone(),
            user_email: user.email.clone(),
            plan_name: request.plan_name.clone(),
        };

        let origin = request.origin.trim_end_matches('/');
        let params = CheckoutSessionParams {
            price_id: request.price_id.clone(),
            customer_email: user.email.clone(),
            success_url: format!("{}/upgrade?checkout=success&plan={}", origin, requested),
            cancel_url: format!("{}/upgrade?checkout=cancelled", origin),
            idempotency_key: derive_idempotency_key(&user.email, requested, Utc::now()),
            metadata: metadata.to_map(),
        };

        let session = self
            .gateway
            .create_checkout_session(params)
            .await
            .map_err(|e| CheckoutError::Provider(e.to_string()))?;

        info!(email = %user.email, plan = %requested, "Checkout session created");

        Ok(session)
    }
}

/// Derive the idempotency key for a checkout attempt: SHA-256 over user
/// email, canonical plan label, and a 10-minute time bucket. Retries
/// within the bucket map to the same key; a genuine later attempt gets a
/// fresh one.
pub fn derive_idempotency_key(email: &str, plan: Tier, now: DateTime<Utc>) -> String {
    let bucket = now.timestamp() / 60 / IDEMPOTENCY_BUCKET_MINUTES;
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b"|");
    hasher.update(plan.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(bucket.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}
