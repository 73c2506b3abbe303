//! bloom-api library: the Bloom Planner entitlement and transactional
//! workflow engine behind an axum HTTP surface.

pub mod api;
pub mod assistant;
pub mod checkout;
pub mod db;
pub mod entitlement;
pub mod error;
pub mod scanner;
pub mod stripe;
pub mod tracker;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::assistant::Assistant;
use crate::checkout::{CheckoutOrchestrator, PaymentGateway};
use crate::entitlement::EntitlementGate;

/// Application identity embedded in checkout metadata so webhook events
/// can be attributed back to this deployment.
pub const APP_NAME: &str = "bloom-planner";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Admission-control gate over the live user store
    pub gate: EntitlementGate,
    /// Checkout orchestration against the payment gateway
    pub orchestrator: Arc<CheckoutOrchestrator>,
    /// Conversation agent for chat records
    pub assistant: Arc<dyn Assistant>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
        assistant: Arc<dyn Assistant>,
    ) -> Self {
        Self {
            gate: EntitlementGate::new(db.clone()),
            orchestrator: Arc::new(CheckoutOrchestrator::new(gateway, APP_NAME)),
            db,
            assistant,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::api_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
