//! Repository for the `alerts` table.

use sqlx::{PgConnection, PgPool};
use vigia_core::status::alert_status;
use vigia_core::types::{DbId, Timestamp};

use crate::models::alert::{Alert, NewAlert};

const COLUMNS: &str = "id, code, title, priority, status, course_id, student_id, event_id, \
    rule_id, action_id, assigned_to, created_by, closed_by, closed_at, created_at, updated_at";

/// Provides lifecycle operations for alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Whether an open alert exists for the (event, action) pair.
    pub async fn has_open(
        conn: &mut PgConnection,
        event_id: DbId,
        action_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS( \
                SELECT 1 FROM alerts WHERE event_id = $1 AND action_id = $2 AND status = $3)",
        )
        .bind(event_id)
        .bind(action_id)
        .bind(alert_status::OPEN)
        .fetch_one(conn)
        .await
    }

    /// Insert an open alert.
    ///
    /// Returns `None` if `uq_alerts_open_event_action` rejected it (an open
    /// alert for the same pair was committed concurrently).
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewAlert,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts \
                (code, title, priority, status, course_id, student_id, event_id, \
                 rule_id, action_id, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(&input.code)
            .bind(&input.title)
            .bind(&input.priority)
            .bind(alert_status::OPEN)
            .bind(input.course_id)
            .bind(input.student_id)
            .bind(input.event_id)
            .bind(input.rule_id)
            .bind(input.action_id)
            .bind(input.created_by)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1");
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Close an open alert. Returns `None` if it was not open.
    pub async fn close(
        conn: &mut PgConnection,
        id: DbId,
        closed_by: DbId,
        closed_at: Timestamp,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts \
             SET status = $2, closed_by = $3, closed_at = $4, updated_at = $4 \
             WHERE id = $1 AND status = $5 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .bind(alert_status::CLOSED)
            .bind(closed_by)
            .bind(closed_at)
            .bind(alert_status::OPEN)
            .fetch_optional(conn)
            .await
    }

    /// Assign an alert to a user. Returns `None` if the alert does not exist.
    pub async fn assign(
        conn: &mut PgConnection,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET assigned_to = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(conn)
            .await
    }

    /// Alerts raised for an event, oldest first.
    pub async fn list_by_event(
        conn: &mut PgConnection,
        event_id: DbId,
    ) -> Result<Vec<Alert>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE event_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, Alert>(&query)
            .bind(event_id)
            .fetch_all(conn)
            .await
    }

    /// Open alerts, most recent first.
    pub async fn list_open(conn: &mut PgConnection) -> Result<Vec<Alert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts WHERE status = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(alert_status::OPEN)
            .fetch_all(conn)
            .await
    }

    /// Delete closed alerts not touched since `cutoff`. Returns rows removed.
    pub async fn delete_closed_older_than(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM alerts WHERE status = $1 AND updated_at < $2")
            .bind(alert_status::CLOSED)
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
