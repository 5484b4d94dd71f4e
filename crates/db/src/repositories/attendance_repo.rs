//! Repository for the `attendance` table.

use chrono::NaiveDate;
use sqlx::PgConnection;
use vigia_core::types::DbId;

use crate::models::attendance::{Attendance, UpsertAttendance};

const COLUMNS: &str = "id, student_id, course_id, block_id, date, status, registered_by, \
    created_at, updated_at";

/// Provides per-block attendance marks.
pub struct AttendanceRepo;

impl AttendanceRepo {
    pub async fn find(
        conn: &mut PgConnection,
        student_id: DbId,
        block_id: DbId,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance \
             WHERE student_id = $1 AND block_id = $2 AND date = $3"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(student_id)
            .bind(block_id)
            .bind(date)
            .fetch_optional(conn)
            .await
    }

    /// Insert a mark or replace the existing one for (student, block, date).
    pub async fn upsert(
        conn: &mut PgConnection,
        input: &UpsertAttendance,
    ) -> Result<Attendance, sqlx::Error> {
        let query = format!(
            "INSERT INTO attendance \
                (student_id, course_id, block_id, date, status, registered_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (student_id, block_id, date) DO UPDATE \
             SET status = EXCLUDED.status, \
                 registered_by = EXCLUDED.registered_by, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(input.student_id)
            .bind(input.course_id)
            .bind(input.block_id)
            .bind(input.date)
            .bind(&input.status)
            .bind(input.registered_by)
            .fetch_one(conn)
            .await
    }

    /// Marks for a course block on a date.
    pub async fn list_for_block(
        conn: &mut PgConnection,
        block_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance WHERE block_id = $1 AND date = $2 ORDER BY student_id"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(block_id)
            .bind(date)
            .fetch_all(conn)
            .await
    }
}
