//! Async record lifecycle tracking
//!
//! Every inbound unit of asynchronous work (chat message, notification
//! check) is written durably in `pending` status before any processing
//! starts, so a crash mid-flight always leaves discoverable evidence of
//! the request. Status then only moves forward; see
//! [`RecordStatus::can_advance_to`] for the machine.
//!
//! The create / mark-processing / mark-completed sequence is three
//! independent writes, not a transaction. Readers may observe any
//! intermediate state, and that is part of the contract: status is the
//! caller's progress signal, not a hidden detail. Records orphaned between
//! writes are recovered by [`fail_stuck_records`].

use bloom_common::db::models::{AsyncRecord, RecordKind, RecordStatus};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assistant::Assistant;
use crate::db;

/// Author marker for anonymous submissions.
pub const GUEST_AUTHOR: &str = "Guest";

/// Tracker errors.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    /// The requested transition would move the record backward or out of
    /// a terminal state
    #[error("Illegal status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: RecordStatus, to: RecordStatus },

    /// A concurrent writer advanced the record first
    #[error("Record {0} was concurrently modified")]
    Conflict(Uuid),

    #[error(transparent)]
    Store(#[from] bloom_common::Error),
}

/// A new unit of work to track.
#[derive(Debug, Clone)]
pub struct Submission {
    pub kind: RecordKind,
    pub payload: String,
    /// Authenticated author email; None degrades to the Guest marker
    pub author: Option<String>,
    /// Conversation key; None generates a fresh one, so repeated calls
    /// without a key are independent conversations, never collapsed
    pub session_key: Option<String>,
}

/// Durably record a submission in pending status and return it.
///
/// The returned record is already visible to readers; processing has not
/// started yet.
pub async fn submit(pool: &SqlitePool, submission: Submission) -> Result<AsyncRecord, TrackerError> {
    let now = Utc::now();
    let record = AsyncRecord {
        id: Uuid::new_v4(),
        kind: submission.kind,
        session_key: submission
            .session_key
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        author: submission.author.unwrap_or_else(|| GUEST_AUTHOR.to_string()),
        payload: submission.payload,
        reply: None,
        status: RecordStatus::Pending,
        error: None,
        created_at: now,
        updated_at: now,
    };

    db::records::create(pool, &record).await?;

    info!(
        record_id = %record.id,
        kind = record.kind.as_str(),
        author = %record.author,
        "Async record submitted"
    );

    Ok(record)
}

/// Advance a record to `to`, attaching an optional reply or error.
///
/// The transition is validated against the record's current status and
/// guarded again inside the store, so a stale caller cannot move a record
/// backward.
pub async fn advance(
    pool: &SqlitePool,
    id: Uuid,
    to: RecordStatus,
    reply: Option<&str>,
    error: Option<&str>,
) -> Result<AsyncRecord, TrackerError> {
    let record = db::records::get(pool, id)
        .await?
        .ok_or(TrackerError::NotFound(id))?;

    if !record.status.can_advance_to(to) {
        return Err(TrackerError::InvalidTransition { from: record.status, to });
    }

    let advanced = db::records::advance(pool, id, record.status, to, reply, error).await?;
    if !advanced {
        return Err(TrackerError::Conflict(id));
    }

    db::records::get(pool, id)
        .await?
        .ok_or(TrackerError::NotFound(id))
}

/// Drive a pending record through processing with the assistant.
///
/// On success the record completes with the assistant's reply; on failure
/// it moves to failed with the triggering error preserved for caller
/// inspection. Either way the final record is returned.
pub async fn process(
    pool: &SqlitePool,
    record: &AsyncRecord,
    assistant: &dyn Assistant,
) -> Result<AsyncRecord, TrackerError> {
    let record = advance(pool, record.id, RecordStatus::Processing, None, None).await?;

    match assistant
        .respond(&record.author, &record.session_key, &record.payload)
        .await
    {
        Ok(reply) => advance(pool, record.id, RecordStatus::Completed, Some(&reply), None).await,
        Err(e) => {
            warn!(record_id = %record.id, error = %e, "Record processing failed");
            advance(pool, record.id, RecordStatus::Failed, None, Some(&e.to_string())).await
        }
    }
}

/// Sweep records stuck in a non-terminal status past `deadline` to failed.
///
/// A process crash between the tracker's writes leaves a record
/// permanently pending or processing; nothing will ever advance it again.
/// Run at startup (and from any scheduler tick) to keep the backlog
/// honest.
pub async fn fail_stuck_records(
    pool: &SqlitePool,
    deadline: Duration,
) -> Result<usize, TrackerError> {
    let cutoff = bloom_common::time::format_rfc3339(Utc::now() - deadline);
    let swept = db::records::fail_stuck(pool, &cutoff, "processing deadline exceeded").await?;

    if swept > 0 {
        warn!(swept, "Failed stuck async records past processing deadline");
    }

    Ok(swept)
}
