//! Concept entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vigia_core::types::{DbId, Timestamp};

/// A row from the `concepts` table: a catalogued category of occurrence.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Concept {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// DTO for creating a concept.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConcept {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}
