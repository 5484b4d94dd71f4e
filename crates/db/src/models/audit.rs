//! Audit log entity model.
//!
//! Audit rows have no `updated_at` (immutable records).

use serde::Serialize;
use sqlx::FromRow;
use vigia_core::audit::AuditAction;
use vigia_core::types::{DbId, Timestamp};

/// A single audit log entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub table_name: String,
    pub record_id: DbId,
    pub action: String,
    pub before_json: Option<serde_json::Value>,
    pub after_json: Option<serde_json::Value>,
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for inserting an audit entry.
#[derive(Debug, Clone)]
pub struct NewAuditLog<'a> {
    pub table_name: &'a str,
    pub record_id: DbId,
    pub action: AuditAction,
    pub before_json: Option<serde_json::Value>,
    pub after_json: Option<serde_json::Value>,
    pub user_id: Option<DbId>,
}
