//! Repository for the `courses` table.

use sqlx::PgConnection;
use vigia_core::types::DbId;

use crate::models::course::{Course, CreateCourse};

const COLUMNS: &str = "id, name, created_at, updated_at";

/// Provides CRUD operations for courses.
pub struct CourseRepo;

impl CourseRepo {
    pub async fn create(conn: &mut PgConnection, input: &CreateCourse) -> Result<Course, sqlx::Error> {
        let query = format!("INSERT INTO courses (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Course>(&query)
            .bind(&input.name)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Course>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM courses WHERE id = $1");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}
