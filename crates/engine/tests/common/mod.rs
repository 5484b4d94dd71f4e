//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::Value;
use sqlx::PgPool;
use vigia_core::clock::FixedClock;
use vigia_core::status::event_origin;
use vigia_core::types::{DbId, Timestamp};
use vigia_db::models::action::{Action, CreateAction};
use vigia_db::models::course::CreateCourse;
use vigia_db::models::event::NewEvent;
use vigia_db::models::rule::{CreateRule, Rule};
use vigia_db::models::student::{CreateStudent, Student};
use vigia_db::repositories::{ActionRepo, ConceptRepo, CourseRepo, RuleRepo, StudentRepo};
use vigia_engine::Orchestrator;
use vigia_events::{BroadcastMessage, EventBus};

pub const TEACHER: DbId = 100;

pub fn at(day: u32, hour: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub bus: Arc<EventBus>,
    pub clock: Arc<FixedClock>,
}

pub fn harness(pool: &PgPool, now: Timestamp) -> Harness {
    let bus = Arc::new(EventBus::new(256));
    let clock = Arc::new(FixedClock::new(now));
    let orchestrator = Orchestrator::new(pool.clone(), Some(bus.clone())).with_clock(clock.clone());
    Harness {
        orchestrator,
        bus,
        clock,
    }
}

pub async fn course(pool: &PgPool, name: &str) -> DbId {
    let mut conn = pool.acquire().await.unwrap();
    CourseRepo::create(&mut conn, &CreateCourse { name: name.into() })
        .await
        .unwrap()
        .id
}

pub async fn student(pool: &PgPool, course_id: DbId, first_name: &str, special_case: bool) -> Student {
    let mut conn = pool.acquire().await.unwrap();
    StudentRepo::create(
        &mut conn,
        &CreateStudent {
            course_id,
            first_name: first_name.into(),
            last_name: "Soto".into(),
            special_case,
        },
    )
    .await
    .unwrap()
}

pub async fn concept_id(pool: &PgPool, code: &str) -> DbId {
    let mut conn = pool.acquire().await.unwrap();
    ConceptRepo::find_by_code(&mut conn, code)
        .await
        .unwrap()
        .expect("seeded concept")
        .id
}

pub async fn action(pool: &PgPool, code: &str, kind: &str, params: Value) -> Action {
    let mut conn = pool.acquire().await.unwrap();
    ActionRepo::create(
        &mut conn,
        &CreateAction {
            code: code.into(),
            name: format!("Accion {code}"),
            kind: kind.into(),
            params,
        },
    )
    .await
    .unwrap()
}

pub async fn rule(pool: &PgPool, name: &str, concept_id: DbId, condition: Value, action_id: DbId) -> Rule {
    let mut conn = pool.acquire().await.unwrap();
    RuleRepo::create(
        &mut conn,
        &CreateRule {
            name: name.into(),
            concept_id,
            condition,
            action_id,
        },
    )
    .await
    .unwrap()
}

pub fn event_for(concept_id: DbId, student: &Student) -> NewEvent {
    NewEvent {
        concept_id,
        student_id: Some(student.id),
        course_id: Some(student.course_id),
        origin: event_origin::TEACHER.into(),
        origin_user_id: Some(TEACHER),
        data: None,
    }
}

pub async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn executions_for_rule(pool: &PgPool, rule_id: DbId) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM action_executions WHERE rule_id = $1")
        .bind(rule_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Drain everything currently buffered for `rx`.
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<BroadcastMessage>) -> Vec<String> {
    let mut types = Vec::new();
    while let Ok(message) = rx.try_recv() {
        types.push(message.message_type);
    }
    types
}
