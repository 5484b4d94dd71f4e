//! Operator actions on alerts: closing and assignment.

use vigia_core::audit::tables;
use vigia_core::error::CoreError;
use vigia_core::messages;
use vigia_core::types::DbId;
use vigia_db::models::alert::Alert;
use vigia_db::repositories::AlertRepo;
use vigia_events::BroadcastMessage;

use crate::audit::AuditRecorder;
use crate::error::EngineResult;
use crate::orchestrator::Orchestrator;

pub struct AlertService {
    orchestrator: Orchestrator,
}

impl AlertService {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Close an open alert. Closing a closed alert returns it unchanged.
    pub async fn close(&self, alert_id: DbId, actor: DbId) -> EngineResult<Alert> {
        let mut uow = self.orchestrator.begin().await?;
        let before = AlertRepo::find_by_id(uow.conn(), alert_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "alert",
                id: alert_id,
            })?;
        if !before.is_open() {
            return Ok(before);
        }

        let now = self.orchestrator.now();
        let Some(closed) = AlertRepo::close(uow.conn(), alert_id, actor, now).await? else {
            return Ok(before);
        };
        AuditRecorder::updated(uow.conn(), tables::ALERTS, alert_id, &before, &closed, Some(actor))
            .await?;
        uow.stage(BroadcastMessage::new(
            messages::ALERT_CLOSED,
            now,
            serde_json::to_value(&closed)?,
        ));
        uow.commit().await?;

        tracing::info!(alert_id, closed_by = actor, "Alert closed");
        Ok(closed)
    }

    pub async fn assign(&self, alert_id: DbId, user_id: DbId, actor: DbId) -> EngineResult<Alert> {
        let mut uow = self.orchestrator.begin().await?;
        let not_found = || CoreError::NotFound {
            entity: "alert",
            id: alert_id,
        };
        let before = AlertRepo::find_by_id(uow.conn(), alert_id)
            .await?
            .ok_or_else(not_found)?;
        let assigned = AlertRepo::assign(uow.conn(), alert_id, user_id)
            .await?
            .ok_or_else(not_found)?;

        AuditRecorder::updated(uow.conn(), tables::ALERTS, alert_id, &before, &assigned, Some(actor))
            .await?;
        uow.stage(BroadcastMessage::new(
            messages::ALERT_ASSIGNED,
            self.orchestrator.now(),
            serde_json::to_value(&assigned)?,
        ));
        uow.commit().await?;

        tracing::info!(alert_id, assigned_to = user_id, "Alert assigned");
        Ok(assigned)
    }
}
