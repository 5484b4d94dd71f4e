//! Repository for the `events` table.

use chrono::{Duration, NaiveDate, NaiveTime};
use sqlx::PgConnection;
use vigia_core::types::{DbId, Timestamp};

use crate::models::event::{Event, EventView, NewEvent};

/// Column list for `events` queries.
const COLUMNS: &str = "id, concept_id, student_id, course_id, origin, origin_user_id, data, \
    active, closed_at, closed_by, created_at, updated_at";

/// Column list for [`EventView`] queries (aliased `e`, joined tables `c`, `s`, `co`).
const VIEW_COLUMNS: &str = "e.id, e.concept_id, e.student_id, e.course_id, e.origin, \
    e.origin_user_id, e.data, e.active, e.closed_at, e.closed_by, e.created_at, e.updated_at, \
    c.code AS concept_code, c.name AS concept_name, \
    s.first_name || ' ' || s.last_name AS student_name, \
    co.name AS course_name";

const VIEW_FROM: &str = "events e \
    JOIN concepts c ON c.id = e.concept_id \
    LEFT JOIN students s ON s.id = e.student_id \
    LEFT JOIN courses co ON co.id = e.course_id";

/// Day-membership predicate: `$3` is the ISO date, `[$4, $5)` its UTC bounds.
const ON_DATE: &str = "(data->>'date' = $3 \
    OR (data->>'date' IS NULL AND created_at >= $4 AND created_at < $5))";

/// `[00:00, 24:00)` UTC of `date`.
fn utc_day(date: NaiveDate) -> (Timestamp, Timestamp) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// The aggregation unit for windowed counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    Student(DbId),
    Course(DbId),
}

impl EventScope {
    fn column(self) -> &'static str {
        match self {
            EventScope::Student(_) => "student_id",
            EventScope::Course(_) => "course_id",
        }
    }

    fn id(self) -> DbId {
        match self {
            EventScope::Student(id) | EventScope::Course(id) => id,
        }
    }
}

/// Provides read/write operations for events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new open event stamped with `created_at`.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewEvent,
        created_at: Timestamp,
    ) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events \
                (concept_id, student_id, course_id, origin, origin_user_id, data, \
                 active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, true, $7, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(input.concept_id)
            .bind(input.student_id)
            .bind(input.course_id)
            .bind(&input.origin)
            .bind(input.origin_user_id)
            .bind(&input.data)
            .bind(created_at)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Load an event with its concept, student and course labels.
    pub async fn find_view(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<EventView>, sqlx::Error> {
        let query = format!("SELECT {VIEW_COLUMNS} FROM {VIEW_FROM} WHERE e.id = $1");
        sqlx::query_as::<_, EventView>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Mark an open event closed.
    ///
    /// Returns `None` when the event does not exist or is already closed.
    pub async fn close(
        conn: &mut PgConnection,
        id: DbId,
        closed_by: DbId,
        closed_at: Timestamp,
    ) -> Result<Option<Event>, sqlx::Error> {
        let query = format!(
            "UPDATE events \
             SET active = false, closed_at = $2, closed_by = $3, updated_at = $2 \
             WHERE id = $1 AND active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(closed_at)
            .bind(closed_by)
            .fetch_optional(conn)
            .await
    }

    /// Count events of a concept for a scope within `[since, until]`.
    pub async fn count_in_window(
        conn: &mut PgConnection,
        concept_id: DbId,
        scope: EventScope,
        since: Timestamp,
        until: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM events \
             WHERE concept_id = $1 AND {} = $2 AND created_at >= $3 AND created_at <= $4",
            scope.column()
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(concept_id)
            .bind(scope.id())
            .bind(since)
            .bind(until)
            .fetch_one(conn)
            .await
    }

    /// Count distinct UTC calendar days within `[since, until]` that hold at
    /// least one event of a concept for a scope.
    pub async fn count_distinct_days_in_window(
        conn: &mut PgConnection,
        concept_id: DbId,
        scope: EventScope,
        since: Timestamp,
        until: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(DISTINCT (created_at AT TIME ZONE 'UTC')::date) FROM events \
             WHERE concept_id = $1 AND {} = $2 AND created_at >= $3 AND created_at <= $4",
            scope.column()
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(concept_id)
            .bind(scope.id())
            .bind(since)
            .bind(until)
            .fetch_one(conn)
            .await
    }

    /// Count a student's events of a concept that belong to `date`.
    ///
    /// An event belongs to the date stored in its `data.date` or, when it
    /// carries none, to the UTC day it was created on.
    pub async fn count_for_student_on_date(
        conn: &mut PgConnection,
        concept_id: DbId,
        student_id: DbId,
        date: NaiveDate,
    ) -> Result<i64, sqlx::Error> {
        let (from, to) = utc_day(date);
        sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM events \
             WHERE concept_id = $1 AND student_id = $2 AND {ON_DATE}"
        ))
        .bind(concept_id)
        .bind(student_id)
        .bind(date.to_string())
        .bind(from)
        .bind(to)
        .fetch_one(conn)
        .await
    }

    /// Open events of a concept for a student that belong to `date`, oldest first.
    pub async fn list_open_for_student_on_date(
        conn: &mut PgConnection,
        concept_id: DbId,
        student_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let (from, to) = utc_day(date);
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             WHERE concept_id = $1 AND student_id = $2 AND active = true AND {ON_DATE} \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(concept_id)
            .bind(student_id)
            .bind(date.to_string())
            .bind(from)
            .bind(to)
            .fetch_all(conn)
            .await
    }

    /// Most recent open event of a concept for a student, if any.
    pub async fn find_open_for_student(
        conn: &mut PgConnection,
        concept_id: DbId,
        student_id: DbId,
    ) -> Result<Option<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             WHERE concept_id = $1 AND student_id = $2 AND active = true \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(concept_id)
            .bind(student_id)
            .fetch_optional(conn)
            .await
    }

    /// All open events, newest first.
    pub async fn list_open(conn: &mut PgConnection) -> Result<Vec<EventView>, sqlx::Error> {
        let query = format!(
            "SELECT {VIEW_COLUMNS} FROM {VIEW_FROM} \
             WHERE e.active = true \
             ORDER BY e.created_at DESC"
        );
        sqlx::query_as::<_, EventView>(&query).fetch_all(conn).await
    }

    /// A student's events, newest first.
    pub async fn list_by_student(
        conn: &mut PgConnection,
        student_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EventView>, sqlx::Error> {
        let query = format!(
            "SELECT {VIEW_COLUMNS} FROM {VIEW_FROM} \
             WHERE e.student_id = $1 \
             ORDER BY e.created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, EventView>(&query)
            .bind(student_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
            .await
    }
}
