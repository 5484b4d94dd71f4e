//! Repository for the `concepts` table.

use sqlx::PgConnection;
use vigia_core::types::DbId;

use crate::models::concept::{Concept, CreateConcept};

const COLUMNS: &str =
    "id, code, name, description, active, created_at, updated_at, deleted_at";

/// Provides lookups over the concept catalogue.
pub struct ConceptRepo;

impl ConceptRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateConcept,
    ) -> Result<Concept, sqlx::Error> {
        let query = format!(
            "INSERT INTO concepts (code, name, description) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Concept>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Concept>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM concepts WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Concept>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Find a live concept by its unique code (e.g. `"INASISTENCIA"`).
    pub async fn find_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<Concept>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM concepts WHERE code = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Concept>(&query)
            .bind(code)
            .fetch_optional(conn)
            .await
    }

    /// Soft-delete a concept. Returns `true` if a live row was marked.
    pub async fn soft_delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE concepts SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
