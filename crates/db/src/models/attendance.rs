//! Attendance entity model.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use vigia_core::types::{DbId, Timestamp};

/// A row from the `attendance` table: one student's mark for one block.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attendance {
    pub id: DbId,
    pub student_id: DbId,
    pub course_id: DbId,
    pub block_id: DbId,
    pub date: NaiveDate,
    pub status: String,
    pub registered_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting or replacing a mark.
#[derive(Debug, Clone)]
pub struct UpsertAttendance {
    pub student_id: DbId,
    pub course_id: DbId,
    pub block_id: DbId,
    pub date: NaiveDate,
    pub status: String,
    pub registered_by: DbId,
}
