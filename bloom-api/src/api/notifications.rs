//! Notification check endpoint
//!
//! Each eligible check runs through the async record tracker: the check is
//! durably pending before the store is queried, completed with a result
//! summary afterward, or failed with the error preserved. Ineligible
//! callers get an explicit skipped response and no record is written.

use axum::extract::State;
use axum::Json;
use bloom_common::db::models::{RecordKind, RecordStatus, SpecialEvent, Task};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::Identity;
use crate::error::{ApiError, ApiResult};
use crate::scanner::{self, ScanOutcome, SkipReason};
use crate::{db, tracker, AppState};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// Caller-supplied reference date; defaults to the current UTC date
    pub reference_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CheckResponse {
    Skipped {
        success: bool,
        skipped: bool,
        reason: SkipReason,
    },
    Due {
        success: bool,
        skipped: bool,
        tasks: Vec<Task>,
        events: Vec<SpecialEvent>,
    },
}

fn skipped(reason: SkipReason) -> Json<CheckResponse> {
    Json(CheckResponse::Skipped { success: true, skipped: true, reason })
}

/// POST /api/notifications/check
pub async fn run_check(
    State(state): State<AppState>,
    identity: Identity,
    body: Option<Json<CheckRequest>>,
) -> ApiResult<Json<CheckResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let reference_date = request.reference_date.unwrap_or_else(|| Utc::now().date_naive());

    // Eligibility gates the whole operation; no record is written for a
    // skipped check
    let Some(email) = identity.email() else {
        return Ok(skipped(SkipReason::Unauthenticated));
    };
    let Some(user) = db::users::find_by_email(&state.db, email).await? else {
        return Ok(skipped(SkipReason::Unauthenticated));
    };
    if !user.notification_enabled {
        return Ok(skipped(SkipReason::NotificationsDisabled));
    }

    let record = tracker::submit(
        &state.db,
        tracker::Submission {
            kind: RecordKind::NotificationCheck,
            payload: json!({ "referenceDate": reference_date }).to_string(),
            author: Some(user.email.clone()),
            session_key: None,
        },
    )
    .await?;

    tracker::advance(&state.db, record.id, RecordStatus::Processing, None, None).await?;

    match scanner::find_due_items(&state.db, Some(&user), reference_date).await {
        Ok(ScanOutcome::Due { tasks, events }) => {
            let summary = json!({
                "dueTasks": tasks.len(),
                "dueEvents": events.len(),
            })
            .to_string();
            tracker::advance(&state.db, record.id, RecordStatus::Completed, Some(&summary), None)
                .await?;

            Ok(Json(CheckResponse::Due { success: true, skipped: false, tasks, events }))
        }
        Ok(ScanOutcome::Skipped { reason }) => {
            // Preference changed between the eligibility gate and the scan
            let summary = json!({ "skipped": reason }).to_string();
            tracker::advance(&state.db, record.id, RecordStatus::Completed, Some(&summary), None)
                .await?;

            Ok(skipped(reason))
        }
        Err(e) => {
            let _ = tracker::advance(
                &state.db,
                record.id,
                RecordStatus::Failed,
                None,
                Some(&e.to_string()),
            )
            .await;

            Err(ApiError::Internal(e.to_string()))
        }
    }
}
