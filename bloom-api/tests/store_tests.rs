//! Entity store and scanner tests
//!
//! Exercises the typed filter / create / update operations per entity
//! kind, and the due-item scan against real store contents.

use bloom_api::db::{events, records, tasks, users};
use bloom_api::entitlement::EntitlementGate;
use bloom_api::scanner::{self, ScanOutcome, SkipReason};
use bloom_api::tracker::{self, Submission};
use bloom_common::db::create_schema;
use bloom_common::db::models::{
    RecordKind, Role, SpecialEvent, SubscriptionStatus, Task, User,
};
use bloom_common::Tier;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    create_schema(&pool).await.expect("Schema creation failed");
    pool
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn new_user(email: &str, status: Option<SubscriptionStatus>, plan: Option<&str>) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        role: Role::Ordinary,
        subscription_status: status,
        subscription_plan: plan.map(str::to_string),
        notification_enabled: true,
        timezone: Some("Europe/Lisbon".to_string()),
        created_at: Utc::now(),
    }
}

fn new_task(owner: &str, title: &str, due: Option<&str>, completed: bool) -> Task {
    Task {
        id: Uuid::new_v4(),
        title: title.to_string(),
        due_date: due.map(date),
        completed,
        created_by: owner.to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn user_round_trips_through_the_store() {
    let pool = setup_pool().await;
    let user = new_user("fern@example.com", Some(SubscriptionStatus::Active), Some("Nurturer"));
    users::create(&pool, &user).await.unwrap();

    let found = users::find_by_email(&pool, "fern@example.com").await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(found.role, Role::Ordinary);
    assert_eq!(found.subscription_status, Some(SubscriptionStatus::Active));
    assert_eq!(found.subscription_plan.as_deref(), Some("Nurturer"));
    assert_eq!(found.timezone.as_deref(), Some("Europe/Lisbon"));

    assert!(users::find_by_email(&pool, "nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn subscription_update_changes_the_live_gate_decision() {
    let pool = setup_pool().await;
    let user = new_user("fern@example.com", Some(SubscriptionStatus::Active), Some("Nurturer"));
    users::create(&pool, &user).await.unwrap();

    let gate = EntitlementGate::new(pool.clone());

    // Nurturer requesting Flourish: denied
    let decision = gate.check_for_email(Some("fern@example.com"), Tier::Flourish).await;
    assert!(!decision.granted);

    // A reconciled upgrade flips the same query to granted
    users::update_subscription(&pool, "fern@example.com", SubscriptionStatus::Active, "Flourish")
        .await
        .unwrap();
    let decision = gate.check_for_email(Some("fern@example.com"), Tier::Flourish).await;
    assert!(decision.granted);
}

#[tokio::test]
async fn subscription_update_for_unknown_user_is_not_found() {
    let pool = setup_pool().await;

    let err = users::update_subscription(
        &pool,
        "ghost@example.com",
        SubscriptionStatus::Active,
        "Radiant",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, bloom_common::Error::NotFound(_)));
}

#[tokio::test]
async fn tasks_filter_by_owner_and_date_set() {
    let pool = setup_pool().await;

    tasks::create(&pool, &new_task("fern@example.com", "today", Some("2026-03-14"), false))
        .await
        .unwrap();
    tasks::create(&pool, &new_task("fern@example.com", "tomorrow", Some("2026-03-15"), false))
        .await
        .unwrap();
    tasks::create(&pool, &new_task("fern@example.com", "next week", Some("2026-03-21"), false))
        .await
        .unwrap();
    tasks::create(&pool, &new_task("fern@example.com", "undated", None, false))
        .await
        .unwrap();
    tasks::create(&pool, &new_task("moss@example.com", "not mine", Some("2026-03-14"), false))
        .await
        .unwrap();

    let found = tasks::due_on_dates(
        &pool,
        "fern@example.com",
        &[date("2026-03-14"), date("2026-03-15")],
    )
    .await
    .unwrap();

    let titles: Vec<&str> = found.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["today", "tomorrow"]);

    // Empty date set short-circuits without touching the store
    let none = tasks::due_on_dates(&pool, "fern@example.com", &[]).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn completing_a_task_removes_it_from_the_scan() {
    let pool = setup_pool().await;
    let user = new_user("fern@example.com", None, None);
    users::create(&pool, &user).await.unwrap();

    let task = new_task("fern@example.com", "water ferns", Some("2026-03-14"), false);
    tasks::create(&pool, &task).await.unwrap();

    let outcome = scanner::find_due_items(&pool, Some(&user), date("2026-03-14")).await.unwrap();
    match outcome {
        ScanOutcome::Due { tasks, .. } => assert_eq!(tasks.len(), 1),
        ScanOutcome::Skipped { .. } => panic!("expected a due result"),
    }

    tasks::set_completed(&pool, task.id, true).await.unwrap();

    let outcome = scanner::find_due_items(&pool, Some(&user), date("2026-03-14")).await.unwrap();
    match outcome {
        ScanOutcome::Due { tasks, .. } => assert!(tasks.is_empty()),
        ScanOutcome::Skipped { .. } => panic!("expected a due result"),
    }
}

#[tokio::test]
async fn scanner_skips_are_explicit() {
    let pool = setup_pool().await;

    // Anonymous
    let outcome = scanner::find_due_items(&pool, None, date("2026-03-14")).await.unwrap();
    assert!(matches!(
        outcome,
        ScanOutcome::Skipped { reason: SkipReason::Unauthenticated }
    ));

    // Notifications disabled, even with items due
    let mut user = new_user("quiet@example.com", None, None);
    user.notification_enabled = false;
    users::create(&pool, &user).await.unwrap();
    tasks::create(&pool, &new_task("quiet@example.com", "due", Some("2026-03-14"), false))
        .await
        .unwrap();

    let outcome = scanner::find_due_items(&pool, Some(&user), date("2026-03-14")).await.unwrap();
    assert!(matches!(
        outcome,
        ScanOutcome::Skipped { reason: SkipReason::NotificationsDisabled }
    ));
}

#[tokio::test]
async fn events_filter_by_owner_and_date_set() {
    let pool = setup_pool().await;

    let event = SpecialEvent {
        id: Uuid::new_v4(),
        title: "garden show".to_string(),
        event_date: Some(date("2026-03-15")),
        created_by: "fern@example.com".to_string(),
        created_at: Utc::now(),
    };
    events::create(&pool, &event).await.unwrap();

    let found = events::on_dates(
        &pool,
        "fern@example.com",
        &[date("2026-03-14"), date("2026-03-15")],
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "garden show");

    let other = events::on_dates(&pool, "moss@example.com", &[date("2026-03-15")]).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn session_listing_returns_records_oldest_first() {
    let pool = setup_pool().await;

    let first = tracker::submit(
        &pool,
        Submission {
            kind: RecordKind::ChatMessage,
            payload: "first".to_string(),
            author: Some("fern@example.com".to_string()),
            session_key: Some("conv-1".to_string()),
        },
    )
    .await
    .unwrap();

    // Ensure distinct stored timestamps (millisecond precision)
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let second = tracker::submit(
        &pool,
        Submission {
            kind: RecordKind::ChatMessage,
            payload: "second".to_string(),
            author: Some("fern@example.com".to_string()),
            session_key: Some("conv-1".to_string()),
        },
    )
    .await
    .unwrap();

    let listed = records::list_by_session(&pool, "conv-1").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[1].id, second.id);
}
