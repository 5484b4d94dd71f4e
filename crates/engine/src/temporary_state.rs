//! Temporary student states (restroom, infirmary, SOS) as events.
//!
//! A student has at most one temporary state open at a time: starting a
//! new kind closes any other open one, and starting the kind that is
//! already open returns the existing event. Listeners hear
//! `estado_temporal_creado` / `estado_temporal_cerrado` once the change is
//! committed.

use serde_json::json;
use vigia_core::error::CoreError;
use vigia_core::messages;
use vigia_core::status::{event_origin, TemporaryStateKind};
use vigia_core::types::DbId;
use vigia_db::models::concept::Concept;
use vigia_db::models::event::{Event, NewEvent};
use vigia_db::repositories::{ConceptRepo, EventRepo, StudentRepo};

use crate::error::EngineResult;
use crate::orchestrator::Orchestrator;
use crate::unit_of_work::UnitOfWork;

pub struct TemporaryStateService {
    orchestrator: Orchestrator,
}

impl TemporaryStateService {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    pub async fn start(
        &self,
        student_id: DbId,
        kind: TemporaryStateKind,
        actor: DbId,
    ) -> EngineResult<Event> {
        let mut uow = self.orchestrator.begin().await?;
        let student = StudentRepo::find_by_id(uow.conn(), student_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "student",
                id: student_id,
            })?;

        let concept = concept_for(&mut uow, kind).await?;
        if let Some(open) = EventRepo::find_open_for_student(uow.conn(), concept.id, student_id).await?
        {
            return Ok(open);
        }

        for other in TemporaryStateKind::ALL.into_iter().filter(|k| *k != kind) {
            let other_concept = concept_for(&mut uow, other).await?;
            while let Some(open) =
                EventRepo::find_open_for_student(uow.conn(), other_concept.id, student_id).await?
            {
                self.orchestrator
                    .close_event_in_tx(&mut uow, open.id, actor)
                    .await?;
            }
        }

        let input = NewEvent {
            concept_id: concept.id,
            student_id: Some(student_id),
            course_id: Some(student.course_id),
            origin: event_origin::TEACHER.to_string(),
            origin_user_id: Some(actor),
            data: Some(json!({ "kind": kind })),
        };
        let event = self
            .orchestrator
            .create_event_in_tx(&mut uow, &input, Some(actor))
            .await?;
        uow.commit().await?;

        self.orchestrator.notify(
            messages::TEMPORARY_STATE_CREATED,
            json!({
                "event_id": event.id,
                "student_id": student_id,
                "course_id": event.course_id,
                "kind": kind,
                "started_at": event.created_at,
                "registered_by": actor,
            }),
        );
        tracing::info!(student_id, event_id = event.id, kind = ?kind, "Temporary state started");
        Ok(event)
    }

    pub async fn finish(&self, event_id: DbId, actor: DbId) -> EngineResult<Event> {
        let event = self.orchestrator.close_event(event_id, actor).await?;
        self.orchestrator.notify(
            messages::TEMPORARY_STATE_CLOSED,
            json!({
                "event_id": event.id,
                "student_id": event.student_id,
                "closed_at": event.closed_at,
            }),
        );
        Ok(event)
    }
}

async fn concept_for(uow: &mut UnitOfWork, kind: TemporaryStateKind) -> EngineResult<Concept> {
    let code = kind.concept_code();
    let concept = ConceptRepo::find_by_code(uow.conn(), code)
        .await?
        .ok_or_else(|| CoreError::Internal(format!("concept {code} is not configured")))?;
    Ok(concept)
}
