//! Repository for the `rules` table.

use sqlx::PgConnection;
use vigia_core::types::DbId;

use crate::models::rule::{CreateRule, Rule};

const COLUMNS: &str =
    "id, name, concept_id, condition, action_id, active, created_at, updated_at, deleted_at";

/// Provides CRUD operations for rules.
pub struct RuleRepo;

impl RuleRepo {
    pub async fn create(conn: &mut PgConnection, input: &CreateRule) -> Result<Rule, sqlx::Error> {
        let query = format!(
            "INSERT INTO rules (name, concept_id, condition, action_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Rule>(&query)
            .bind(&input.name)
            .bind(input.concept_id)
            .bind(&input.condition)
            .bind(input.action_id)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Rule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rules WHERE id = $1");
        sqlx::query_as::<_, Rule>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Active, non-deleted rules bound to a concept.
    ///
    /// No ORDER BY: rule firing order is unspecified.
    pub async fn list_active_for_concept(
        conn: &mut PgConnection,
        concept_id: DbId,
    ) -> Result<Vec<Rule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rules \
             WHERE concept_id = $1 AND active = true AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Rule>(&query)
            .bind(concept_id)
            .fetch_all(conn)
            .await
    }

    /// Enable or disable a rule. Returns false when the rule does not exist.
    pub async fn set_active(
        conn: &mut PgConnection,
        id: DbId,
        active: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE rules SET active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
