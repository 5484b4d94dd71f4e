//! Repository for the `action_executions` table.

use sqlx::{PgConnection, PgPool};
use vigia_core::status::EXECUTION_OK;
use vigia_core::types::{DbId, Timestamp};

use crate::models::action_execution::{ActionExecution, DedupKey, NewActionExecution};

const COLUMNS: &str = "id, rule_id, action_id, event_id, student_id, course_id, result, detail, \
    scope_key, window_start, window_end, executed_at, created_at";

/// Provides insert and dedup lookups for action executions.
pub struct ActionExecutionRepo;

impl ActionExecutionRepo {
    /// Whether a successful execution already exists under `key`.
    pub async fn exists(
        conn: &mut PgConnection,
        rule_id: DbId,
        action_id: DbId,
        key: &DedupKey,
    ) -> Result<bool, sqlx::Error> {
        match key {
            DedupKey::Window {
                scope_key,
                start,
                end,
            } => {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS( \
                        SELECT 1 FROM action_executions \
                        WHERE rule_id = $1 AND action_id = $2 AND result = $3 \
                          AND scope_key = $4 AND window_start = $5 AND window_end = $6)",
                )
                .bind(rule_id)
                .bind(action_id)
                .bind(EXECUTION_OK)
                .bind(scope_key)
                .bind(start)
                .bind(end)
                .fetch_one(conn)
                .await
            }
            DedupKey::Event { event_id, .. } => {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS( \
                        SELECT 1 FROM action_executions \
                        WHERE rule_id = $1 AND action_id = $2 AND result = $3 \
                          AND event_id = $4)",
                )
                .bind(rule_id)
                .bind(action_id)
                .bind(EXECUTION_OK)
                .bind(event_id)
                .fetch_one(conn)
                .await
            }
        }
    }

    /// Insert an execution.
    ///
    /// Returns `None` when a unique dedup index rejected the row, meaning a
    /// concurrent transaction recorded the same firing first.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewActionExecution,
    ) -> Result<Option<ActionExecution>, sqlx::Error> {
        let (window_start, window_end) = input.dedup.window();
        let query = format!(
            "INSERT INTO action_executions \
                (rule_id, action_id, event_id, student_id, course_id, result, detail, \
                 scope_key, window_start, window_end, executed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionExecution>(&query)
            .bind(input.rule_id)
            .bind(input.action_id)
            .bind(input.event_id)
            .bind(input.student_id)
            .bind(input.course_id)
            .bind(&input.result)
            .bind(&input.detail)
            .bind(input.dedup.scope_key())
            .bind(window_start)
            .bind(window_end)
            .bind(input.executed_at)
            .fetch_optional(conn)
            .await
    }

    /// Executions triggered by an event, oldest first.
    pub async fn list_by_event(
        conn: &mut PgConnection,
        event_id: DbId,
    ) -> Result<Vec<ActionExecution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM action_executions WHERE event_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, ActionExecution>(&query)
            .bind(event_id)
            .fetch_all(conn)
            .await
    }

    /// Executions recorded for a rule, oldest first.
    pub async fn list_by_rule(
        conn: &mut PgConnection,
        rule_id: DbId,
    ) -> Result<Vec<ActionExecution>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM action_executions WHERE rule_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, ActionExecution>(&query)
            .bind(rule_id)
            .fetch_all(conn)
            .await
    }

    /// Delete executions created before `cutoff`. Returns rows removed.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM action_executions WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
