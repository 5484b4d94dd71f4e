//! Course entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vigia_core::types::{DbId, Timestamp};

/// A row from the `courses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourse {
    pub name: String,
}
