//! Action entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vigia_core::action::ActionKind;
use vigia_core::types::{DbId, Timestamp};

/// A row from the `actions` table: a side-effect template fired by rules.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Action {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub kind: String,
    pub params: serde_json::Value,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        ActionKind::parse(&self.kind)
    }
}

/// DTO for creating an action.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAction {
    pub code: String,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Value,
}
