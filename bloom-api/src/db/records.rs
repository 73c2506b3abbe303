//! Async record store operations
//!
//! The status column is guarded at the SQL level: every transition is a
//! conditional UPDATE on the expected current status, so two writers
//! racing on the same record cannot move it backward. Records are never
//! deleted here; retention is an external concern.

use bloom_common::db::models::{AsyncRecord, RecordKind, RecordStatus};
use bloom_common::{time, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<AsyncRecord> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| bloom_common::Error::Internal(format!("Failed to parse record id: {}", e)))?;

    let kind: String = row.get("kind");
    let kind = RecordKind::parse(&kind)
        .ok_or_else(|| bloom_common::Error::Internal(format!("Unknown record kind: {}", kind)))?;

    let status: String = row.get("status");
    let status = RecordStatus::parse(&status)
        .ok_or_else(|| bloom_common::Error::Internal(format!("Unknown record status: {}", status)))?;

    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(AsyncRecord {
        id,
        kind,
        session_key: row.get("session_key"),
        author: row.get("author"),
        payload: row.get("payload"),
        reply: row.get("reply"),
        status,
        error: row.get("error"),
        created_at: time::parse_rfc3339(&created_at)?,
        updated_at: time::parse_rfc3339(&updated_at)?,
    })
}

/// Insert a record. The caller constructs it in pending status; the insert
/// is the durable write that must land before any processing starts.
pub async fn create(pool: &SqlitePool, record: &AsyncRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO async_records (
            id, kind, session_key, author, payload, reply, status, error,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.kind.as_str())
    .bind(&record.session_key)
    .bind(&record.author)
    .bind(&record.payload)
    .bind(&record.reply)
    .bind(record.status.as_str())
    .bind(&record.error)
    .bind(time::format_rfc3339(record.created_at))
    .bind(time::format_rfc3339(record.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a record by id.
pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<AsyncRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, kind, session_key, author, payload, reply, status, error,
               created_at, updated_at
        FROM async_records
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_record(&row)?)),
        None => Ok(None),
    }
}

/// Records in a conversation, oldest first. Readers see records in any
/// lifecycle state; status is the progress signal.
pub async fn list_by_session(pool: &SqlitePool, session_key: &str) -> Result<Vec<AsyncRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, kind, session_key, author, payload, reply, status, error,
               created_at, updated_at
        FROM async_records
        WHERE session_key = ?
        ORDER BY created_at, id
        "#,
    )
    .bind(session_key)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_record).collect()
}

/// Conditionally advance a record from `from` to `to`, attaching an
/// optional reply or error. Returns false when the guard missed, i.e. the
/// record was no longer in `from` (a concurrent writer won the race).
pub async fn advance(
    pool: &SqlitePool,
    id: Uuid,
    from: RecordStatus,
    to: RecordStatus,
    reply: Option<&str>,
    error: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE async_records
        SET status = ?, reply = COALESCE(?, reply), error = ?, updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(to.as_str())
    .bind(reply)
    .bind(error)
    .bind(time::now_rfc3339())
    .bind(id.to_string())
    .bind(from.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Sweep non-terminal records whose last write predates `cutoff` to
/// failed. Recovery for records orphaned by a crash mid-processing.
pub async fn fail_stuck(pool: &SqlitePool, cutoff: &str, reason: &str) -> Result<usize> {
    let result = sqlx::query(
        r#"
        UPDATE async_records
        SET status = 'failed', error = ?, updated_at = ?
        WHERE status IN ('pending', 'processing') AND updated_at < ?
        "#,
    )
    .bind(reason)
    .bind(time::now_rfc3339())
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}
