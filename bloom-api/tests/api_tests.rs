//! Integration tests for the bloom-api HTTP surface
//!
//! Exercises routing, identity handling, validation ordering, and the
//! JSON contract with an in-memory database and stub collaborators.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bloom_api::assistant::{Assistant, AssistantError};
use bloom_api::checkout::{
    CheckoutSessionParams, CreatedSession, GatewayError, PaymentGateway,
};
use bloom_api::{build_router, AppState};
use bloom_common::db::create_schema;
use bloom_common::db::models::{Role, SpecialEvent, SubscriptionStatus, Task, User};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

/// Counts calls; never contacts anything external.
#[derive(Default)]
struct StubGateway {
    calls: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_checkout_session(
        &self,
        _params: CheckoutSessionParams,
    ) -> Result<CreatedSession, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedSession { url: "https://checkout.example/session/cs_123".to_string() })
    }
}

struct StubAssistant;

#[async_trait]
impl Assistant for StubAssistant {
    async fn respond(&self, _: &str, _: &str, _: &str) -> Result<String, AssistantError> {
        Ok("noted".to_string())
    }
}

async fn setup() -> (axum::Router, SqlitePool, Arc<StubGateway>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    create_schema(&pool).await.expect("Schema creation failed");

    let gateway = Arc::new(StubGateway::default());
    let state = AppState::new(pool.clone(), gateway.clone(), Arc::new(StubAssistant));

    (build_router(state), pool, gateway)
}

async fn seed_user(
    pool: &SqlitePool,
    email: &str,
    role: Role,
    status: Option<SubscriptionStatus>,
    plan: Option<&str>,
    notification_enabled: bool,
) {
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        role,
        subscription_status: status,
        subscription_plan: plan.map(str::to_string),
        notification_enabled,
        timezone: None,
        created_at: Utc::now(),
    };
    bloom_api::db::users::create(pool, &user).await.unwrap();
}

fn get_request(uri: &str, identity: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(email) = identity {
        builder = builder.header("x-bloom-user", email);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, identity: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("origin", "https://bloom.example");
    if let Some(email) = identity {
        builder = builder.header("x-bloom-user", email);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (app, _pool, _gateway) = setup().await;

    let response = app.oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "bloom-api");
    assert!(body["version"].is_string());
}

// =============================================================================
// Entitlement
// =============================================================================

#[tokio::test]
async fn entitlement_denies_anonymous_with_settled_response() {
    let (app, _pool, _gateway) = setup().await;

    let response = app
        .oneshot(get_request("/api/entitlement/check?required=flourish", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["granted"], false);
    assert_eq!(body["effectiveTier"], Value::Null);
    assert_eq!(body["settled"], true);
}

#[tokio::test]
async fn entitlement_grants_active_plan_at_or_above_required() {
    let (app, pool, _gateway) = setup().await;
    seed_user(
        &pool,
        "fern@example.com",
        Role::Ordinary,
        Some(SubscriptionStatus::Active),
        Some("Nurturer"),
        true,
    )
    .await;

    // Nurturer requesting Flourish: denied
    let response = app
        .clone()
        .oneshot(get_request(
            "/api/entitlement/check?required=flourish",
            Some("fern@example.com"),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["granted"], false);
    assert_eq!(body["effectiveTier"], "nurturer");

    // Nurturer requesting Nurturer: granted (case-insensitive label)
    let response = app
        .oneshot(get_request(
            "/api/entitlement/check?required=NURTURER",
            Some("fern@example.com"),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["granted"], true);
}

#[tokio::test]
async fn entitlement_reports_admin_sentinel() {
    let (app, pool, _gateway) = setup().await;
    seed_user(&pool, "root@example.com", Role::Admin, None, None, true).await;

    let response = app
        .oneshot(get_request(
            "/api/entitlement/check?required=radiant",
            Some("root@example.com"),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["granted"], true);
    assert_eq!(body["effectiveTier"], "admin");
}

// =============================================================================
// Ads
// =============================================================================

#[tokio::test]
async fn ads_show_for_anonymous_and_hide_for_paid_tiers() {
    let (app, pool, _gateway) = setup().await;
    seed_user(
        &pool,
        "moss@example.com",
        Role::Ordinary,
        Some(SubscriptionStatus::Active),
        Some("Radiant"),
        true,
    )
    .await;

    let response = app
        .clone()
        .oneshot(get_request("/api/ads/visibility", None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["showAds"], true);

    let response = app
        .oneshot(get_request("/api/ads/visibility", Some("moss@example.com")))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["showAds"], false);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn checkout_requires_identity_before_any_provider_call() {
    let (app, _pool, gateway) = setup().await;

    let response = app
        .oneshot(post_json(
            "/api/checkout/session",
            None,
            json!({"priceId": "price_123", "planName": "Flourish"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn checkout_rejects_unknown_identity() {
    let (app, _pool, gateway) = setup().await;

    let response = app
        .oneshot(post_json(
            "/api/checkout/session",
            Some("stranger@example.com"),
            json!({"priceId": "price_123", "planName": "Flourish"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn checkout_missing_price_is_a_validation_error() {
    let (app, pool, gateway) = setup().await;
    seed_user(&pool, "fern@example.com", Role::Ordinary, None, None, true).await;

    let response = app
        .oneshot(post_json(
            "/api/checkout/session",
            Some("fern@example.com"),
            json!({"planName": "Flourish"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "priceId is required");
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn checkout_returns_only_the_session_url() {
    let (app, pool, gateway) = setup().await;
    seed_user(&pool, "fern@example.com", Role::Ordinary, None, None, true).await;

    let response = app
        .oneshot(post_json(
            "/api/checkout/session",
            Some("fern@example.com"),
            json!({"priceId": "price_123", "planName": "Flourish"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["sessionUrl"], "https://checkout.example/session/cs_123");
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn chat_submission_requires_a_message() {
    let (app, _pool, _gateway) = setup().await;

    let response = app
        .oneshot(post_json("/api/chat/messages", None, json!({"message": "  "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "message is required");
}

#[tokio::test]
async fn anonymous_chat_gets_guest_author_and_generated_key() {
    let (app, pool, _gateway) = setup().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/chat/messages",
            None,
            json!({"message": "remind me to repot the basil"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "pending");
    let session_key = body["sessionKey"].as_str().unwrap().to_string();
    assert!(!session_key.is_empty());

    // Visible through the read path regardless of processing progress
    let records = bloom_api::db::records::list_by_session(&pool, &session_key)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].author, "Guest");
    assert_eq!(records[0].payload, "remind me to repot the basil");
}

#[tokio::test]
async fn chat_listing_requires_a_session_key() {
    let (app, _pool, _gateway) = setup().await;

    let response = app.oneshot(get_request("/api/chat/messages", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Notifications
// =============================================================================

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn seed_task(pool: &SqlitePool, owner: &str, title: &str, due: &str, completed: bool) {
    let task = Task {
        id: Uuid::new_v4(),
        title: title.to_string(),
        due_date: Some(date(due)),
        completed,
        created_by: owner.to_string(),
        created_at: Utc::now(),
    };
    bloom_api::db::tasks::create(pool, &task).await.unwrap();
}

async fn seed_event(pool: &SqlitePool, owner: &str, title: &str, on: &str) {
    let event = SpecialEvent {
        id: Uuid::new_v4(),
        title: title.to_string(),
        event_date: Some(date(on)),
        created_by: owner.to_string(),
        created_at: Utc::now(),
    };
    bloom_api::db::events::create(pool, &event).await.unwrap();
}

#[tokio::test]
async fn notifications_skip_anonymous_callers_explicitly() {
    let (app, _pool, _gateway) = setup().await;

    let response = app
        .oneshot(post_json("/api/notifications/check", None, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["skipped"], true);
    assert_eq!(body["reason"], "unauthenticated");
}

#[tokio::test]
async fn notifications_skip_is_distinct_from_empty_success() {
    let (app, pool, _gateway) = setup().await;
    seed_user(&pool, "quiet@example.com", Role::Ordinary, None, None, false).await;
    seed_task(&pool, "quiet@example.com", "due today", "2026-03-14", false).await;

    let response = app
        .oneshot(post_json(
            "/api/notifications/check",
            Some("quiet@example.com"),
            json!({"referenceDate": "2026-03-14"}),
        ))
        .await
        .unwrap();

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["skipped"], true);
    assert_eq!(body["reason"], "notifications_disabled");
    assert!(body.get("tasks").is_none(), "skipped result carries no item lists");
}

#[tokio::test]
async fn notifications_return_only_items_in_the_two_day_window() {
    let (app, pool, _gateway) = setup().await;
    seed_user(&pool, "fern@example.com", Role::Ordinary, None, None, true).await;

    seed_task(&pool, "fern@example.com", "water ferns", "2026-03-14", false).await;
    seed_task(&pool, "fern@example.com", "prune roses", "2026-03-15", false).await;
    seed_task(&pool, "fern@example.com", "order seeds", "2026-03-21", false).await;
    seed_task(&pool, "fern@example.com", "already done", "2026-03-14", true).await;
    seed_task(&pool, "other@example.com", "not mine", "2026-03-14", false).await;
    seed_event(&pool, "fern@example.com", "garden show", "2026-03-15").await;
    seed_event(&pool, "fern@example.com", "far away", "2026-04-01").await;

    let response = app
        .oneshot(post_json(
            "/api/notifications/check",
            Some("fern@example.com"),
            json!({"referenceDate": "2026-03-14"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["skipped"], false);

    let tasks: Vec<&str> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(tasks, vec!["water ferns", "prune roses"]);

    let events: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(events, vec!["garden show"]);

    // The check itself ran through the record tracker and completed
    let status: String = sqlx::query_scalar(
        "SELECT status FROM async_records WHERE kind = 'notification_check'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "completed");
}
