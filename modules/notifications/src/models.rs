use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// STORED RECORDS
// ============================================================================

/// A persisted notification row
///
/// `recipient_id` is serialized as `recipientId` (and is `null` when the
/// notification has no recipient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub subject: String,
    pub message: String,
    #[serde(rename = "recipientId")]
    #[sqlx(rename = "recipientId")]
    pub recipient_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Validated input for a new notification. Strings are already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub subject: String,
    pub message: String,
    pub recipient_id: Option<i64>,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPatch {
    pub subject: Option<String>,
    pub message: Option<String>,
}

// ============================================================================
// OUTGOING EVENT PAYLOADS
// ============================================================================

/// Payload for the notifications.created event: the stored row plus the
/// correlation id of the request that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationCreatedEvent {
    #[serde(flatten)]
    pub notification: Notification,
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
}
