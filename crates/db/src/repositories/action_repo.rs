//! Repository for the `actions` table.

use sqlx::PgConnection;
use vigia_core::types::DbId;

use crate::models::action::{Action, CreateAction};

const COLUMNS: &str =
    "id, code, name, kind, params, active, created_at, updated_at, deleted_at";

/// Provides CRUD operations for action templates.
pub struct ActionRepo;

impl ActionRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateAction,
    ) -> Result<Action, sqlx::Error> {
        let query = format!(
            "INSERT INTO actions (code, name, kind, params) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Action>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.kind)
            .bind(&input.params)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Action>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM actions WHERE id = $1");
        sqlx::query_as::<_, Action>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}
