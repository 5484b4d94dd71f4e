//! Repository for the `notification_outbox` table.

use sqlx::{PgConnection, PgPool};
use vigia_core::status::outbox_status;
use vigia_core::types::{DbId, Timestamp};

use crate::models::notification::{NewOutboxNotification, OutboxNotification};

const COLUMNS: &str = "id, channel, recipient, subject, payload, status, attempts, \
    next_attempt_at, last_error, created_by, sent_at, created_at, updated_at";

/// Provides queueing and delivery bookkeeping for outbox notifications.
pub struct NotificationOutboxRepo;

impl NotificationOutboxRepo {
    /// Queue a pending notification.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewOutboxNotification,
    ) -> Result<OutboxNotification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_outbox \
                (channel, recipient, subject, payload, status, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutboxNotification>(&query)
            .bind(&input.channel)
            .bind(&input.recipient)
            .bind(&input.subject)
            .bind(&input.payload)
            .bind(outbox_status::PENDING)
            .bind(input.created_by)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<OutboxNotification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_outbox WHERE id = $1");
        sqlx::query_as::<_, OutboxNotification>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Lock up to `limit` pending rows that are due, oldest first.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` so concurrent delivery loops never
    /// claim the same row. Must run inside a transaction.
    pub async fn claim_due(
        conn: &mut PgConnection,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<OutboxNotification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_outbox \
             WHERE status = $1 AND (next_attempt_at IS NULL OR next_attempt_at <= $2) \
             ORDER BY created_at ASC \
             LIMIT $3 \
             FOR UPDATE SKIP LOCKED"
        );
        sqlx::query_as::<_, OutboxNotification>(&query)
            .bind(outbox_status::PENDING)
            .bind(now)
            .bind(limit)
            .fetch_all(conn)
            .await
    }

    pub async fn mark_sent(
        conn: &mut PgConnection,
        id: DbId,
        sent_at: Timestamp,
    ) -> Result<OutboxNotification, sqlx::Error> {
        let query = format!(
            "UPDATE notification_outbox \
             SET status = $2, sent_at = $3, attempts = attempts + 1, \
                 last_error = NULL, next_attempt_at = NULL, updated_at = $3 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutboxNotification>(&query)
            .bind(id)
            .bind(outbox_status::SENT)
            .bind(sent_at)
            .fetch_one(conn)
            .await
    }

    /// Record a failed attempt. The row stays `pending` with a retry time
    /// until `max_attempts` is reached, then moves to `error`.
    pub async fn mark_failed(
        conn: &mut PgConnection,
        id: DbId,
        error: &str,
        next_attempt_at: Timestamp,
        max_attempts: i32,
    ) -> Result<OutboxNotification, sqlx::Error> {
        let query = format!(
            "UPDATE notification_outbox \
             SET attempts = attempts + 1, \
                 last_error = $2, \
                 next_attempt_at = $3, \
                 status = CASE WHEN attempts + 1 >= $4 THEN $5 ELSE status END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutboxNotification>(&query)
            .bind(id)
            .bind(error)
            .bind(next_attempt_at)
            .bind(max_attempts)
            .bind(outbox_status::ERROR)
            .fetch_one(conn)
            .await
    }

    /// Delete outbox rows created before `cutoff`. Returns rows removed.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notification_outbox WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
