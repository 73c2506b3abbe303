//! Chat message endpoints
//!
//! Submission is anonymous-friendly: a missing identity degrades to the
//! Guest author rather than failing the request. The record lands durably
//! in pending status before the response is sent; the assistant reply is
//! produced by a background task that advances the record through the
//! lifecycle.

use axum::extract::{Query, State};
use axum::Json;
use bloom_common::db::models::{AsyncRecord, RecordKind, RecordStatus};
use serde::{Deserialize, Serialize};

use crate::api::Identity;
use crate::error::{ApiError, ApiResult};
use crate::{tracker, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageRequest {
    #[serde(default)]
    pub message: String,
    pub session_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageResponse {
    pub success: bool,
    pub record_id: uuid::Uuid,
    pub session_key: String,
    pub status: RecordStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: uuid::Uuid,
    pub author: String,
    pub message: String,
    pub reply: Option<String>,
    pub status: RecordStatus,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<AsyncRecord> for MessageView {
    fn from(record: AsyncRecord) -> Self {
        Self {
            id: record.id,
            author: record.author,
            message: record.payload,
            reply: record.reply,
            status: record.status,
            error: record.error,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    pub success: bool,
    pub session_key: String,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesQuery {
    pub session_key: Option<String>,
}

/// POST /api/chat/messages
pub async fn submit_message(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<SubmitMessageRequest>,
) -> ApiResult<Json<SubmitMessageResponse>> {
    if request.message.trim().is_empty() {
        return Err(ApiError::Validation("message is required".to_string()));
    }

    let record = tracker::submit(
        &state.db,
        tracker::Submission {
            kind: RecordKind::ChatMessage,
            payload: request.message,
            author: identity.email().map(str::to_string),
            session_key: request.session_key,
        },
    )
    .await?;

    let response = SubmitMessageResponse {
        success: true,
        record_id: record.id,
        session_key: record.session_key.clone(),
        status: record.status,
    };

    // Process in the background; the record's status is the caller's
    // progress signal from here on
    let db = state.db.clone();
    let assistant = state.assistant.clone();
    tokio::spawn(async move {
        if let Err(e) = tracker::process(&db, &record, assistant.as_ref()).await {
            tracing::error!(record_id = %record.id, error = %e, "Chat record processing failed");
        }
    });

    Ok(Json(response))
}

/// GET /api/chat/messages?sessionKey=
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<ListMessagesResponse>> {
    let session_key = query
        .session_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("sessionKey is required".to_string()))?;

    let records = crate::db::records::list_by_session(&state.db, &session_key).await?;

    Ok(Json(ListMessagesResponse {
        success: true,
        session_key,
        messages: records.into_iter().map(MessageView::from).collect(),
    }))
}
