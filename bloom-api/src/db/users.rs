//! User store operations
//!
//! The engine treats user identity as read-mostly: it looks accounts up by
//! email and updates only subscription-related fields, never identity.

use bloom_common::db::models::{Role, SubscriptionStatus, User};
use bloom_common::{time, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| bloom_common::Error::Internal(format!("Failed to parse user id: {}", e)))?;

    let role: String = row.get("role");
    let subscription_status: Option<String> = row.get("subscription_status");
    let created_at: String = row.get("created_at");

    Ok(User {
        id,
        email: row.get("email"),
        role: Role::parse(&role),
        subscription_status: subscription_status.as_deref().map(SubscriptionStatus::parse),
        subscription_plan: row.get("subscription_plan"),
        notification_enabled: row.get::<i64, _>("notification_enabled") != 0,
        timezone: row.get("timezone"),
        created_at: time::parse_rfc3339(&created_at)?,
    })
}

/// Look up a user by email (the stable identity the platform hands us).
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, role, subscription_status, subscription_plan,
               notification_enabled, timezone, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_user(&row)?)),
        None => Ok(None),
    }
}

/// Insert a user record.
pub async fn create(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (
            id, email, role, subscription_status, subscription_plan,
            notification_enabled, timezone, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(user.role.as_str())
    .bind(user.subscription_status.map(|s| s.as_str()))
    .bind(&user.subscription_plan)
    .bind(user.notification_enabled as i64)
    .bind(&user.timezone)
    .bind(time::format_rfc3339(user.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Update subscription state after a reconciled payment event. Identity
/// fields are never touched.
pub async fn update_subscription(
    pool: &SqlitePool,
    email: &str,
    status: SubscriptionStatus,
    plan: &str,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE users SET subscription_status = ?, subscription_plan = ? WHERE email = ?",
    )
    .bind(status.as_str())
    .bind(plan)
    .bind(email)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(bloom_common::Error::NotFound(format!("User not found: {}", email)));
    }

    Ok(())
}
