//! Repository for the `students` table.

use sqlx::PgConnection;
use vigia_core::types::DbId;

use crate::models::student::{CreateStudent, Student};

const COLUMNS: &str =
    "id, course_id, first_name, last_name, special_case, active, created_at, updated_at";

/// Provides CRUD operations for students.
pub struct StudentRepo;

impl StudentRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateStudent,
    ) -> Result<Student, sqlx::Error> {
        let query = format!(
            "INSERT INTO students (course_id, first_name, last_name, special_case) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(input.course_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.special_case)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE id = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Flag or unflag a student as a special case.
    pub async fn set_special_case(
        conn: &mut PgConnection,
        id: DbId,
        special_case: bool,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!(
            "UPDATE students SET special_case = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .bind(special_case)
            .fetch_optional(conn)
            .await
    }
}
