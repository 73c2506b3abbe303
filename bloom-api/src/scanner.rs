//! Due-item notification scan
//!
//! Finds tasks and events due "today" or "tomorrow" for a user. The
//! comparison window is computed once per invocation so every item in one
//! response shares the same reference instant. Users without notifications
//! enabled get an explicit skipped result, distinguishable from "nothing
//! due".

use bloom_common::db::models::{SpecialEvent, Task, User};
use bloom_common::Result;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db;

/// Why a scan did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Unauthenticated,
    NotificationsDisabled,
}

/// Outcome of a notification scan.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// Preconditions not met; no query was made
    Skipped { reason: SkipReason },
    /// Items due within the window
    Due { tasks: Vec<Task>, events: Vec<SpecialEvent> },
}

/// Find items due today or tomorrow relative to `reference_date`.
///
/// Tasks are matched by set-membership on the indexed due_date column and
/// re-filtered for incompletion at read time, in case a record was
/// completed between indexing and this read.
pub async fn find_due_items(
    pool: &SqlitePool,
    user: Option<&User>,
    reference_date: NaiveDate,
) -> Result<ScanOutcome> {
    let Some(user) = user else {
        return Ok(ScanOutcome::Skipped { reason: SkipReason::Unauthenticated });
    };

    if !user.notification_enabled {
        return Ok(ScanOutcome::Skipped { reason: SkipReason::NotificationsDisabled });
    }

    // One window for the whole invocation
    let tomorrow = reference_date
        .checked_add_days(Days::new(1))
        .unwrap_or(reference_date);
    let window = [reference_date, tomorrow];

    let mut tasks = db::tasks::due_on_dates(pool, &user.email, &window).await?;
    tasks.retain(|task| !task.completed);

    let events = db::events::on_dates(pool, &user.email, &window).await?;

    debug!(
        email = %user.email,
        reference_date = %reference_date,
        due_tasks = tasks.len(),
        due_events = events.len(),
        "Notification scan complete"
    );

    Ok(ScanOutcome::Due { tasks, events })
}
