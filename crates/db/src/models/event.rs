//! Event entity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vigia_core::types::{DbId, Timestamp};

/// A row from the `events` table: one occurrence of a concept.
///
/// `active` is the open/closed flag; a closed event always carries
/// `closed_at` (enforced by `ck_events_lifecycle`).
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct Event {
    pub id: DbId,
    pub concept_id: DbId,
    pub student_id: Option<DbId>,
    pub course_id: Option<DbId>,
    pub origin: String,
    pub origin_user_id: Option<DbId>,
    pub data: Option<serde_json::Value>,
    pub active: bool,
    pub closed_at: Option<Timestamp>,
    pub closed_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Event {
    pub fn is_open(&self) -> bool {
        self.active
    }
}

/// DTO for inserting an event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub concept_id: DbId,
    pub student_id: Option<DbId>,
    pub course_id: Option<DbId>,
    pub origin: String,
    pub origin_user_id: Option<DbId>,
    pub data: Option<serde_json::Value>,
}

/// An event joined with its concept, student and course labels.
///
/// Used as the broadcast payload so listeners need no follow-up lookups.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub concept_code: String,
    pub concept_name: String,
    pub student_name: Option<String>,
    pub course_name: Option<String>,
}
