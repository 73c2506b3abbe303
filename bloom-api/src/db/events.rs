//! Special event store operations

use bloom_common::db::models::SpecialEvent;
use bloom_common::{time, Result};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<SpecialEvent> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| bloom_common::Error::Internal(format!("Failed to parse event id: {}", e)))?;

    let event_date: Option<String> = row.get("event_date");
    let event_date = event_date
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
                bloom_common::Error::Internal(format!("Failed to parse event_date '{}': {}", raw, e))
            })
        })
        .transpose()?;

    let created_at: String = row.get("created_at");

    Ok(SpecialEvent {
        id,
        title: row.get("title"),
        event_date,
        created_by: row.get("created_by"),
        created_at: time::parse_rfc3339(&created_at)?,
    })
}

/// Insert a special event record.
pub async fn create(pool: &SqlitePool, event: &SpecialEvent) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO special_events (id, title, event_date, created_by, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id.to_string())
    .bind(&event.title)
    .bind(event.event_date.map(|d| d.format(DATE_FORMAT).to_string()))
    .bind(&event.created_by)
    .bind(time::format_rfc3339(event.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Events owned by `created_by` falling on one of `dates`.
pub async fn on_dates(
    pool: &SqlitePool,
    created_by: &str,
    dates: &[NaiveDate],
) -> Result<Vec<SpecialEvent>> {
    if dates.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; dates.len()].join(", ");
    let sql = format!(
        r#"
        SELECT id, title, event_date, created_by, created_at
        FROM special_events
        WHERE created_by = ? AND event_date IN ({})
        ORDER BY event_date, created_at
        "#,
        placeholders
    );

    let mut query = sqlx::query(&sql).bind(created_by);
    for date in dates {
        query = query.bind(date.format(DATE_FORMAT).to_string());
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_event).collect()
}
