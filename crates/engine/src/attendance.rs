//! Per-block attendance registration.
//!
//! Marks are upserted per (student, block, date). An `absent` mark records
//! an `INASISTENCIA` event for the student (at most one per day); a
//! `present` mark replacing an `absent` one closes that day's open absence
//! events. Marks, events and all rule consequences share one unit of work.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use vigia_core::audit::tables;
use vigia_core::error::CoreError;
use vigia_core::messages;
use vigia_core::status::{concept_codes, event_origin, AttendanceStatus};
use vigia_core::types::DbId;
use vigia_db::models::attendance::UpsertAttendance;
use vigia_db::models::event::NewEvent;
use vigia_db::repositories::{AttendanceRepo, ConceptRepo, EventRepo, StudentRepo};
use vigia_events::BroadcastMessage;

use crate::audit::AuditRecorder;
use crate::error::EngineResult;
use crate::orchestrator::Orchestrator;
use crate::unit_of_work::UnitOfWork;

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceMark {
    pub student_id: DbId,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRegistration {
    pub course_id: DbId,
    pub block_id: DbId,
    pub date: NaiveDate,
    pub marks: Vec<AttendanceMark>,
}

/// Counts reported in the `asistencia_bloque_registrada` broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    pub present: usize,
    pub absent: usize,
    pub justified: usize,
    pub events_created: usize,
    pub events_closed: usize,
}

pub struct AttendanceService {
    orchestrator: Orchestrator,
}

impl AttendanceService {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Register every mark of a block. All or nothing.
    pub async fn register_block(
        &self,
        registration: &BlockRegistration,
        actor: DbId,
    ) -> EngineResult<BlockSummary> {
        let mut uow = self.orchestrator.begin().await?;
        let absence = ConceptRepo::find_by_code(uow.conn(), concept_codes::ABSENCE)
            .await?
            .ok_or_else(|| {
                CoreError::Internal(format!("concept {} is not configured", concept_codes::ABSENCE))
            })?;

        let mut summary = BlockSummary::default();
        for mark in &registration.marks {
            match mark.status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Justified => summary.justified += 1,
            }

            let previous = self.save_mark(&mut uow, registration, mark, actor).await?;

            match mark.status {
                AttendanceStatus::Absent => {
                    let existing = EventRepo::count_for_student_on_date(
                        uow.conn(),
                        absence.id,
                        mark.student_id,
                        registration.date,
                    )
                    .await?;
                    if existing == 0 {
                        let input = NewEvent {
                            concept_id: absence.id,
                            student_id: Some(mark.student_id),
                            course_id: Some(registration.course_id),
                            origin: event_origin::TEACHER.to_string(),
                            origin_user_id: Some(actor),
                            data: Some(json!({
                                "block_id": registration.block_id,
                                "date": registration.date,
                            })),
                        };
                        self.orchestrator
                            .create_event_in_tx(&mut uow, &input, Some(actor))
                            .await?;
                        summary.events_created += 1;
                    }
                }
                AttendanceStatus::Present if previous == Some(AttendanceStatus::Absent) => {
                    let open = EventRepo::list_open_for_student_on_date(
                        uow.conn(),
                        absence.id,
                        mark.student_id,
                        registration.date,
                    )
                    .await?;
                    for event in open {
                        self.orchestrator
                            .close_event_in_tx(&mut uow, event.id, actor)
                            .await?;
                        summary.events_closed += 1;
                    }
                }
                AttendanceStatus::Present | AttendanceStatus::Justified => {}
            }
        }

        uow.stage(BroadcastMessage::new(
            messages::ATTENDANCE_BLOCK_REGISTERED,
            self.orchestrator.now(),
            json!({
                "course_id": registration.course_id,
                "block_id": registration.block_id,
                "date": registration.date,
                "registered_by": actor,
                "present": summary.present,
                "absent": summary.absent,
                "justified": summary.justified,
            }),
        ));
        uow.commit().await?;

        tracing::info!(
            course_id = registration.course_id,
            block_id = registration.block_id,
            date = %registration.date,
            present = summary.present,
            absent = summary.absent,
            justified = summary.justified,
            "Attendance block registered"
        );
        Ok(summary)
    }

    /// Upsert and audit one mark. Returns the status it replaced, if any.
    async fn save_mark(
        &self,
        uow: &mut UnitOfWork,
        registration: &BlockRegistration,
        mark: &AttendanceMark,
        actor: DbId,
    ) -> EngineResult<Option<AttendanceStatus>> {
        let student = StudentRepo::find_by_id(uow.conn(), mark.student_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "student",
                id: mark.student_id,
            })?;
        if student.course_id != registration.course_id {
            return Err(CoreError::Validation(format!(
                "student {} is not enrolled in course {}",
                student.id, registration.course_id
            ))
            .into());
        }

        let previous = AttendanceRepo::find(
            uow.conn(),
            mark.student_id,
            registration.block_id,
            registration.date,
        )
        .await?;
        let saved = AttendanceRepo::upsert(
            uow.conn(),
            &UpsertAttendance {
                student_id: mark.student_id,
                course_id: registration.course_id,
                block_id: registration.block_id,
                date: registration.date,
                status: mark.status.as_str().to_string(),
                registered_by: actor,
            },
        )
        .await?;

        match &previous {
            Some(before) => {
                AuditRecorder::updated(uow.conn(), tables::ATTENDANCE, saved.id, before, &saved, Some(actor))
                    .await?;
            }
            None => {
                AuditRecorder::inserted(uow.conn(), tables::ATTENDANCE, saved.id, &saved, Some(actor))
                    .await?;
            }
        }

        Ok(previous.and_then(|p| p.status.parse().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_deserializes_lowercase_statuses() {
        let registration: BlockRegistration = serde_json::from_value(json!({
            "course_id": 1,
            "block_id": 2,
            "date": "2024-05-10",
            "marks": [
                {"student_id": 5, "status": "absent"},
                {"student_id": 6, "status": "justified"}
            ]
        }))
        .unwrap();
        assert_eq!(registration.marks.len(), 2);
        assert_eq!(registration.marks[0].status, AttendanceStatus::Absent);
    }
}
