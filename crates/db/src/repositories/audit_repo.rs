//! Repository for the `audit_logs` table.

use sqlx::{PgConnection, PgPool};
use vigia_core::types::{DbId, Timestamp};

use crate::models::audit::{AuditLog, NewAuditLog};

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str =
    "id, table_name, record_id, action, before_json, after_json, user_id, created_at";

/// Provides append and query operations for the audit trail.
pub struct AuditRepo;

impl AuditRepo {
    /// Append an audit entry, returning its id.
    pub async fn insert(conn: &mut PgConnection, entry: &NewAuditLog<'_>) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO audit_logs \
                (table_name, record_id, action, before_json, after_json, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(entry.table_name)
        .bind(entry.record_id)
        .bind(entry.action.as_str())
        .bind(&entry.before_json)
        .bind(&entry.after_json)
        .bind(entry.user_id)
        .fetch_one(conn)
        .await
    }

    /// Entries for one record, oldest first.
    pub async fn list_for_record(
        conn: &mut PgConnection,
        table_name: &str,
        record_id: DbId,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs \
             WHERE table_name = $1 AND record_id = $2 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(table_name)
            .bind(record_id)
            .fetch_all(conn)
            .await
    }

    pub async fn count_for_table(
        conn: &mut PgConnection,
        table_name: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_logs WHERE table_name = $1")
            .bind(table_name)
            .fetch_one(conn)
            .await
    }

    /// Delete entries created before `cutoff`. Returns rows removed.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
