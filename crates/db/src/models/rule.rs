//! Rule entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vigia_core::condition::{Condition, ConditionError};
use vigia_core::types::{DbId, Timestamp};

/// A row from the `rules` table.
///
/// `condition` is kept as raw JSON; [`Rule::parse_condition`] interprets it
/// at evaluation time so an unparseable rule never blocks loading the rest.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Rule {
    pub id: DbId,
    pub name: String,
    pub concept_id: DbId,
    pub condition: serde_json::Value,
    pub action_id: DbId,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Rule {
    pub fn parse_condition(&self) -> Result<Condition, ConditionError> {
        Condition::parse(&self.condition)
    }
}

/// DTO for creating a rule.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRule {
    pub name: String,
    pub concept_id: DbId,
    pub condition: serde_json::Value,
    pub action_id: DbId,
}
