//! Alert entity model.

use serde::Serialize;
use sqlx::FromRow;
use vigia_core::status::alert_status;
use vigia_core::types::{DbId, Timestamp};

/// A row from the `alerts` table: an operator-facing actionable record.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Alert {
    pub id: DbId,
    pub code: String,
    pub title: String,
    pub priority: String,
    pub status: String,
    pub course_id: Option<DbId>,
    pub student_id: Option<DbId>,
    pub event_id: Option<DbId>,
    pub rule_id: Option<DbId>,
    pub action_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
    pub created_by: Option<DbId>,
    pub closed_by: Option<DbId>,
    pub closed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Alert {
    pub fn is_open(&self) -> bool {
        self.status == alert_status::OPEN
    }
}

/// DTO for inserting an open alert.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub code: String,
    pub title: String,
    pub priority: String,
    pub course_id: Option<DbId>,
    pub student_id: Option<DbId>,
    pub event_id: DbId,
    pub rule_id: DbId,
    pub action_id: DbId,
    pub created_by: Option<DbId>,
}
