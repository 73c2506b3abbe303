//! Database models shared across Bloom services

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role. Admin bypasses tier-based admission entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Ordinary,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Ordinary => "ordinary",
            Role::Admin => "admin",
        }
    }

    /// Parse a stored role. Unknown values degrade to Ordinary.
    pub fn parse(raw: &str) -> Role {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            _ => Role::Ordinary,
        }
    }
}

/// Subscription billing status as mirrored from the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
        }
    }

    /// Parse a stored status. Anything other than "active" is inactive.
    pub fn parse(raw: &str) -> SubscriptionStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => SubscriptionStatus::Active,
            _ => SubscriptionStatus::Inactive,
        }
    }
}

/// Platform user record. Identity fields are owned by the hosting platform;
/// this engine only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    /// None = no subscription record at all
    pub subscription_status: Option<SubscriptionStatus>,
    /// Raw plan label as stored by the billing integration; parsed
    /// case-insensitively at the admission boundary
    pub subscription_plan: Option<String>,
    pub notification_enabled: bool,
    pub timezone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// True iff the user has an active subscription record.
    pub fn has_active_subscription(&self) -> bool {
        matches!(self.subscription_status, Some(SubscriptionStatus::Active))
    }
}

/// A planner task with an optional due date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// A dated special event (birthday, anniversary, appointment).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialEvent {
    pub id: Uuid,
    pub title: String,
    pub event_date: Option<NaiveDate>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Kinds of asynchronously processed request records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    ChatMessage,
    NotificationCheck,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::ChatMessage => "chat_message",
            RecordKind::NotificationCheck => "notification_check",
        }
    }

    pub fn parse(raw: &str) -> Option<RecordKind> {
        match raw {
            "chat_message" => Some(RecordKind::ChatMessage),
            "notification_check" => Some(RecordKind::NotificationCheck),
            _ => None,
        }
    }
}

/// Lifecycle status of an async record.
///
/// The machine is strictly monotonic: `pending → processing → completed`,
/// with `failed` reachable from pending or processing. Completed and failed
/// are terminal. Readers may legitimately observe pending or processing
/// between writes; no transition ever moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Processing => "processing",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<RecordStatus> {
        match raw {
            "pending" => Some(RecordStatus::Pending),
            "processing" => Some(RecordStatus::Processing),
            "completed" => Some(RecordStatus::Completed),
            "failed" => Some(RecordStatus::Failed),
            _ => None,
        }
    }

    /// True iff the record has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Completed | RecordStatus::Failed)
    }

    /// True iff advancing from `self` to `next` is a legal forward step.
    pub fn can_advance_to(self, next: RecordStatus) -> bool {
        matches!(
            (self, next),
            (RecordStatus::Pending, RecordStatus::Processing)
                | (RecordStatus::Pending, RecordStatus::Failed)
                | (RecordStatus::Processing, RecordStatus::Completed)
                | (RecordStatus::Processing, RecordStatus::Failed)
        )
    }
}

/// A durably tracked unit of inbound work (chat message, notification check).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncRecord {
    pub id: Uuid,
    pub kind: RecordKind,
    /// Groups records into a conversation; generated when the caller
    /// supplies none
    pub session_key: String,
    /// User email, or "Guest" for anonymous submissions
    pub author: String,
    pub payload: String,
    /// Result attached when processing completes
    pub reply: Option<String>,
    pub status: RecordStatus,
    /// Triggering error preserved when processing fails
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
