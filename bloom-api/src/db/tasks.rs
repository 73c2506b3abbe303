//! Task store operations

use bloom_common::db::models::Task;
use bloom_common::{time, Result};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| bloom_common::Error::Internal(format!("Failed to parse task id: {}", e)))?;

    let due_date: Option<String> = row.get("due_date");
    let due_date = due_date
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
                bloom_common::Error::Internal(format!("Failed to parse due_date '{}': {}", raw, e))
            })
        })
        .transpose()?;

    let created_at: String = row.get("created_at");

    Ok(Task {
        id,
        title: row.get("title"),
        due_date,
        completed: row.get::<i64, _>("completed") != 0,
        created_by: row.get("created_by"),
        created_at: time::parse_rfc3339(&created_at)?,
    })
}

/// Insert a task record.
pub async fn create(pool: &SqlitePool, task: &Task) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tasks (id, title, due_date, completed, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(task.id.to_string())
    .bind(&task.title)
    .bind(task.due_date.map(|d| d.format(DATE_FORMAT).to_string()))
    .bind(task.completed as i64)
    .bind(&task.created_by)
    .bind(time::format_rfc3339(task.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Tasks owned by `created_by` whose due date falls in `dates`
/// (set-membership predicate on the indexed due_date column).
pub async fn due_on_dates(
    pool: &SqlitePool,
    created_by: &str,
    dates: &[NaiveDate],
) -> Result<Vec<Task>> {
    if dates.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; dates.len()].join(", ");
    let sql = format!(
        r#"
        SELECT id, title, due_date, completed, created_by, created_at
        FROM tasks
        WHERE created_by = ? AND due_date IN ({})
        ORDER BY due_date, created_at
        "#,
        placeholders
    );

    let mut query = sqlx::query(&sql).bind(created_by);
    for date in dates {
        query = query.bind(date.format(DATE_FORMAT).to_string());
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_task).collect()
}

/// Mark a task completed.
pub async fn set_completed(pool: &SqlitePool, id: Uuid, completed: bool) -> Result<()> {
    let result = sqlx::query("UPDATE tasks SET completed = ? WHERE id = ?")
        .bind(completed as i64)
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(bloom_common::Error::NotFound(format!("Task not found: {}", id)));
    }

    Ok(())
}
