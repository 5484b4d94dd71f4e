//! Notification outbox entity model.

use serde::Serialize;
use sqlx::FromRow;
use vigia_core::types::{DbId, Timestamp};

/// A row from the `notification_outbox` table.
///
/// Rows start `pending`; the delivery loop moves them to `sent`, or to
/// `error` once retries are exhausted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OutboxNotification {
    pub id: DbId,
    pub channel: String,
    pub recipient: String,
    pub subject: String,
    pub payload: Option<serde_json::Value>,
    pub status: String,
    pub attempts: i32,
    pub next_attempt_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_by: Option<DbId>,
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for queueing a notification.
#[derive(Debug, Clone)]
pub struct NewOutboxNotification {
    pub channel: String,
    pub recipient: String,
    pub subject: String,
    pub payload: serde_json::Value,
    pub created_by: Option<DbId>,
}
