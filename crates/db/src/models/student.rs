//! Student entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vigia_core::types::{DbId, Timestamp};

/// A row from the `students` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub id: DbId,
    pub course_id: DbId,
    pub first_name: String,
    pub last_name: String,
    /// Special-case students are shielded from `caso_especial` rules.
    pub special_case: bool,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// DTO for creating a student.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudent {
    pub course_id: DbId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub special_case: bool,
}
