//! Integration tests for the attendance, temporary-state and alert services.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};
use serde_json::json;
use sqlx::PgPool;
use vigia_core::audit::tables;
use vigia_core::error::CoreError;
use vigia_core::status::{concept_codes, AttendanceStatus, TemporaryStateKind};
use vigia_db::repositories::{AlertRepo, AttendanceRepo, AuditRepo, EventRepo};
use vigia_engine::alerts::AlertService;
use vigia_engine::attendance::{AttendanceMark, AttendanceService, BlockRegistration, BlockSummary};
use vigia_engine::temporary_state::TemporaryStateService;
use vigia_engine::EngineError;

use common::*;

fn may_10() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

fn block(course_id: i64, block_id: i64, marks: &[(i64, AttendanceStatus)]) -> BlockRegistration {
    BlockRegistration {
        course_id,
        block_id,
        date: may_10(),
        marks: marks
            .iter()
            .map(|(student_id, status)| AttendanceMark {
                student_id: *student_id,
                status: *status,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Attendance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn absent_marks_create_one_absence_event_per_day(pool: PgPool) {
    let h = harness(&pool, at(10, 8));
    let service = AttendanceService::new(h.orchestrator.clone());
    let course = course(&pool, "1A").await;
    let ana = student(&pool, course, "Ana", false).await;
    let bruno = student(&pool, course, "Bruno", false).await;
    let absence = concept_id(&pool, concept_codes::ABSENCE).await;

    let mut rx = h.bus.subscribe();
    let summary = service
        .register_block(
            &block(course, 1, &[(ana.id, AttendanceStatus::Absent), (bruno.id, AttendanceStatus::Present)]),
            TEACHER,
        )
        .await
        .unwrap();
    assert_eq!(
        summary,
        BlockSummary {
            present: 1,
            absent: 1,
            justified: 0,
            events_created: 1,
            events_closed: 0
        }
    );

    // Second block the same day: still absent, no new event.
    h.clock.advance(Duration::hours(1));
    let summary = service
        .register_block(&block(course, 2, &[(ana.id, AttendanceStatus::Absent)]), TEACHER)
        .await
        .unwrap();
    assert_eq!(summary.events_created, 0);

    let mut conn = pool.acquire().await.unwrap();
    let events = EventRepo::list_by_student(&mut conn, ana.id, 10, 0).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.concept_id, absence);
    assert_eq!(events[0].event.data.as_ref().unwrap()["block_id"], 1);
    assert!(EventRepo::list_by_student(&mut conn, bruno.id, 10, 0).await.unwrap().is_empty());

    let types = drain(&mut rx);
    assert_eq!(types.iter().filter(|t| *t == "asistencia_bloque_registrada").count(), 2);
    assert_eq!(types.iter().filter(|t| *t == "evento_creado").count(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn present_after_absent_closes_the_days_absence(pool: PgPool) {
    let h = harness(&pool, at(10, 8));
    let service = AttendanceService::new(h.orchestrator.clone());
    let course = course(&pool, "1A").await;
    let ana = student(&pool, course, "Ana", false).await;

    service
        .register_block(&block(course, 1, &[(ana.id, AttendanceStatus::Absent)]), TEACHER)
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(15));
    let summary = service
        .register_block(&block(course, 1, &[(ana.id, AttendanceStatus::Present)]), TEACHER)
        .await
        .unwrap();
    assert_eq!(summary.events_closed, 1);

    let mut conn = pool.acquire().await.unwrap();
    let events = EventRepo::list_by_student(&mut conn, ana.id, 10, 0).await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(!events[0].event.active);
    assert_eq!(events[0].event.closed_by, Some(TEACHER));

    let mark = AttendanceRepo::find(&mut conn, ana.id, 1, may_10()).await.unwrap().unwrap();
    assert_eq!(mark.status, "present");
    let audit = AuditRepo::list_for_record(&mut conn, tables::ATTENDANCE, mark.id).await.unwrap();
    let actions: Vec<&str> = audit.iter().map(|a| a.action.as_str()).collect();
    assert_eq!(actions, vec!["INSERT", "UPDATE"]);
    assert_eq!(audit[1].before_json.as_ref().unwrap()["status"], "absent");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn backdated_registrations_match_events_by_block_date(pool: PgPool) {
    let h = harness(&pool, at(10, 8));
    let service = AttendanceService::new(h.orchestrator.clone());
    let course = course(&pool, "1A").await;
    let ana = student(&pool, course, "Ana", false).await;
    let may_8 = NaiveDate::from_ymd_opt(2024, 5, 8).unwrap();
    let backdated = |status: AttendanceStatus| BlockRegistration {
        date: may_8,
        ..block(course, 3, &[(ana.id, status)])
    };

    let first = service.register_block(&backdated(AttendanceStatus::Absent), TEACHER).await.unwrap();
    assert_eq!(first.events_created, 1);

    h.clock.advance(Duration::minutes(20));
    let resubmitted = service.register_block(&backdated(AttendanceStatus::Absent), TEACHER).await.unwrap();
    assert_eq!(resubmitted.events_created, 0);

    // A same-day registration for the 10th is a different day.
    let today = service
        .register_block(&block(course, 1, &[(ana.id, AttendanceStatus::Absent)]), TEACHER)
        .await
        .unwrap();
    assert_eq!(today.events_created, 1);

    let corrected = service.register_block(&backdated(AttendanceStatus::Present), TEACHER).await.unwrap();
    assert_eq!(corrected.events_closed, 1);

    let mut conn = pool.acquire().await.unwrap();
    let events = EventRepo::list_by_student(&mut conn, ana.id, 10, 0).await.unwrap();
    assert_eq!(events.len(), 2);
    let open: Vec<_> = events.iter().filter(|e| e.event.is_open()).collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].event.data.as_ref().unwrap()["date"], "2024-05-10");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_mark_rolls_back_the_whole_block(pool: PgPool) {
    let h = harness(&pool, at(10, 8));
    let service = AttendanceService::new(h.orchestrator.clone());
    let course_a = course(&pool, "1A").await;
    let course_b = course(&pool, "1B").await;
    let ana = student(&pool, course_a, "Ana", false).await;
    let outsider = student(&pool, course_b, "Olga", false).await;

    let mut rx = h.bus.subscribe();
    let err = service
        .register_block(
            &block(
                course_a,
                1,
                &[(ana.id, AttendanceStatus::Absent), (outsider.id, AttendanceStatus::Absent)],
            ),
            TEACHER,
        )
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Validation(_)));

    for table in ["attendance", "events", "audit_logs"] {
        assert_eq!(count_rows(&pool, table).await, 0, "{table} should be empty");
    }
    assert!(drain(&mut rx).is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn absence_events_run_absence_rules(pool: PgPool) {
    let h = harness(&pool, at(10, 8));
    let service = AttendanceService::new(h.orchestrator.clone());
    let course = course(&pool, "1A").await;
    let ana = student(&pool, course, "Ana", false).await;
    let absence = concept_id(&pool, concept_codes::ABSENCE).await;
    let alert = action(&pool, "ALERTA_INASISTENCIA", "alerta", json!({})).await;
    rule(&pool, "Inasistencia", absence, json!({"tipo": "caso_especial"}), alert.id).await;

    service
        .register_block(&block(course, 1, &[(ana.id, AttendanceStatus::Absent)]), TEACHER)
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let open = AlertRepo::list_open(&mut conn).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].student_id, Some(ana.id));
    assert_eq!(open[0].course_id, Some(course));
}

// ---------------------------------------------------------------------------
// Temporary states
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn starting_the_open_kind_returns_existing_event(pool: PgPool) {
    let h = harness(&pool, at(10, 8));
    let service = TemporaryStateService::new(h.orchestrator.clone());
    let course = course(&pool, "2A").await;
    let ana = student(&pool, course, "Ana", false).await;
    let restroom = concept_id(&pool, concept_codes::RESTROOM).await;

    let first = service.start(ana.id, TemporaryStateKind::Restroom, TEACHER).await.unwrap();
    assert_eq!(first.concept_id, restroom);
    assert_eq!(first.course_id, Some(course));
    assert_eq!(first.data.as_ref().unwrap()["kind"], "restroom");

    let mut rx = h.bus.subscribe();
    let again = service.start(ana.id, TemporaryStateKind::Restroom, TEACHER).await.unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(count_rows(&pool, "events").await, 1);
    assert!(drain(&mut rx).is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn starting_another_kind_closes_the_previous_one(pool: PgPool) {
    let h = harness(&pool, at(10, 8));
    let service = TemporaryStateService::new(h.orchestrator.clone());
    let course = course(&pool, "2A").await;
    let ana = student(&pool, course, "Ana", false).await;

    let mut rx = h.bus.subscribe();
    let restroom = service.start(ana.id, TemporaryStateKind::Restroom, TEACHER).await.unwrap();
    assert_eq!(drain(&mut rx), vec!["evento_creado", "estado_temporal_creado"]);

    h.clock.advance(Duration::minutes(3));
    let infirmary = service.start(ana.id, TemporaryStateKind::Infirmary, TEACHER).await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec!["evento_cerrado", "evento_creado", "estado_temporal_creado"]
    );

    let mut conn = pool.acquire().await.unwrap();
    let restroom = EventRepo::find_by_id(&mut conn, restroom.id).await.unwrap().unwrap();
    assert!(!restroom.is_open());
    assert!(infirmary.is_open());

    h.clock.advance(Duration::minutes(10));
    let finished = service.finish(infirmary.id, TEACHER).await.unwrap();
    assert!(!finished.is_open());
    assert_eq!(finished.closed_at, Some(at(10, 8) + Duration::minutes(13)));
    assert_eq!(drain(&mut rx), vec!["evento_cerrado", "estado_temporal_cerrado"]);
    assert!(EventRepo::list_open(&mut conn).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_student_cannot_start_a_state(pool: PgPool) {
    let h = harness(&pool, at(10, 8));
    let service = TemporaryStateService::new(h.orchestrator.clone());
    let err = service.start(987_654, TemporaryStateKind::Sos, TEACHER).await.unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::NotFound { entity: "student", .. }));
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn alerts_can_be_assigned_and_closed_once(pool: PgPool) {
    let h = harness(&pool, at(10, 8));
    let alerts = AlertService::new(h.orchestrator.clone());
    let course = course(&pool, "3A").await;
    let ana = student(&pool, course, "Ana", false).await;
    let sos = concept_id(&pool, concept_codes::SOS).await;
    let alert_action = action(&pool, "ALERTA_SOS", "alerta", json!({"prioridad": "alta"})).await;
    rule(&pool, "SOS", sos, json!({"tipo": "caso_especial"}), alert_action.id).await;

    let event = h.orchestrator.create_event(&event_for(sos, &ana), Some(TEACHER)).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let alert = AlertRepo::list_by_event(&mut conn, event.id).await.unwrap().remove(0);

    let mut rx = h.bus.subscribe();
    let assigned = alerts.assign(alert.id, 55, TEACHER).await.unwrap();
    assert_eq!(assigned.assigned_to, Some(55));

    h.clock.advance(Duration::minutes(30));
    let closed = alerts.close(alert.id, 55).await.unwrap();
    assert!(!closed.is_open());
    assert_eq!(closed.closed_by, Some(55));
    assert_eq!(closed.closed_at, Some(at(10, 8) + Duration::minutes(30)));

    let again = alerts.close(alert.id, 56).await.unwrap();
    assert_eq!(again.closed_by, Some(55));

    let audit = AuditRepo::list_for_record(&mut conn, tables::ALERTS, alert.id).await.unwrap();
    let actions: Vec<&str> = audit.iter().map(|a| a.action.as_str()).collect();
    assert_eq!(actions, vec!["INSERT", "UPDATE", "UPDATE"]);

    assert_eq!(
        drain(&mut rx),
        vec!["alerta_asignada".to_string(), "alerta_cerrada".to_string()]
    );

    let missing = alerts.close(1_000_000, TEACHER).await.unwrap_err();
    assert_matches!(missing, EngineError::Core(CoreError::NotFound { entity: "alert", .. }));
}
