//! HTTP API handlers

pub mod ads;
pub mod chat;
pub mod checkout;
pub mod entitlement;
pub mod health;
pub mod identity;
pub mod notifications;

pub use health::health_routes;
pub use identity::Identity;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

/// Build the /api route tree.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/entitlement/check", get(entitlement::check_entitlement))
        .route("/api/ads/visibility", get(ads::ad_visibility))
        .route("/api/checkout/session", post(checkout::create_checkout_session))
        .route("/api/chat/messages", post(chat::submit_message).get(chat::list_messages))
        .route("/api/notifications/check", post(notifications::run_check))
}
