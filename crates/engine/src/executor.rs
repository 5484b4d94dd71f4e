//! Action executor.
//!
//! Records an `action_executions` row for a firing rule and performs the
//! action's side effect: an alert for `alerta`, an outbox notification for
//! `notificacion`, nothing further for other kinds. Malformed action
//! parameters fall back to the defaults.

use serde_json::json;
use vigia_core::action::{ActionKind, AlertParams, NotificationParams, CHANNEL_IN_APP};
use vigia_core::audit::tables;
use vigia_core::error::CoreError;
use vigia_core::messages;
use vigia_core::status::EXECUTION_OK;
use vigia_core::types::{DbId, Timestamp};
use vigia_db::models::action::Action;
use vigia_db::models::action_execution::{ActionExecution, DedupKey, NewActionExecution};
use vigia_db::models::alert::{Alert, NewAlert};
use vigia_db::models::event::Event;
use vigia_db::models::notification::{NewOutboxNotification, OutboxNotification};
use vigia_db::models::rule::Rule;
use vigia_db::repositories::{
    ActionExecutionRepo, ActionRepo, AlertRepo, NotificationOutboxRepo,
};
use vigia_events::BroadcastMessage;

use crate::audit::AuditRecorder;
use crate::error::EngineResult;
use crate::unit_of_work::UnitOfWork;

/// A rule firing ready to be executed.
#[derive(Debug, Clone)]
pub struct Firing<'a> {
    pub rule: &'a Rule,
    pub event: &'a Event,
    pub dedup: DedupKey,
    pub detail: serde_json::Value,
    pub actor: Option<DbId>,
    pub now: Timestamp,
}

/// What executing a firing produced.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Executed {
        execution: ActionExecution,
        alert: Option<Alert>,
        notification: Option<OutboxNotification>,
    },
    /// The dedup ledger already held this firing.
    AlreadyExecuted,
}

pub struct ActionExecutor;

impl ActionExecutor {
    pub async fn execute(uow: &mut UnitOfWork, firing: &Firing<'_>) -> EngineResult<ExecutionOutcome> {
        let rule = firing.rule;
        let event = firing.event;
        let action = ActionRepo::find_by_id(uow.conn(), rule.action_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "action",
                id: rule.action_id,
            })?;

        let inserted = ActionExecutionRepo::insert(
            uow.conn(),
            &NewActionExecution {
                rule_id: rule.id,
                action_id: action.id,
                event_id: event.id,
                student_id: event.student_id,
                course_id: event.course_id,
                result: EXECUTION_OK.to_string(),
                detail: firing.detail.clone(),
                dedup: firing.dedup.clone(),
                executed_at: firing.now,
            },
        )
        .await?;
        let Some(execution) = inserted else {
            tracing::debug!(
                rule_id = rule.id,
                event_id = event.id,
                "Execution already recorded by a concurrent transaction"
            );
            return Ok(ExecutionOutcome::AlreadyExecuted);
        };
        AuditRecorder::inserted(
            uow.conn(),
            tables::ACTION_EXECUTIONS,
            execution.id,
            &execution,
            firing.actor,
        )
        .await?;

        let mut alert = None;
        let mut notification = None;
        match action.kind() {
            ActionKind::Alert => alert = Self::raise_alert(uow, firing, &action).await?,
            ActionKind::Notification => {
                notification = Some(Self::queue_notification(uow, firing, &action).await?);
            }
            ActionKind::StateChange | ActionKind::Record | ActionKind::Other(_) => {}
        }

        uow.stage(BroadcastMessage::new(
            messages::ACTION_EXECUTED,
            firing.now,
            json!({
                "rule": rule,
                "action": action,
                "event": event,
                "execution": execution,
            }),
        ));

        tracing::info!(
            rule_id = rule.id,
            action_id = action.id,
            event_id = event.id,
            kind = %action.kind,
            "Action executed"
        );

        Ok(ExecutionOutcome::Executed {
            execution,
            alert,
            notification,
        })
    }

    /// Open an alert unless one is already open for the (event, action) pair.
    async fn raise_alert(
        uow: &mut UnitOfWork,
        firing: &Firing<'_>,
        action: &Action,
    ) -> EngineResult<Option<Alert>> {
        let params = AlertParams::from_params(&action.params).unwrap_or_else(|e| {
            tracing::warn!(action_id = action.id, error = %e, "Malformed alert params, using defaults");
            AlertParams::default()
        });
        let event = firing.event;

        if AlertRepo::has_open(uow.conn(), event.id, action.id).await? {
            return Ok(None);
        }

        let Some(alert) = AlertRepo::insert(
            uow.conn(),
            &NewAlert {
                code: action.code.clone(),
                title: action.name.clone(),
                priority: params.priority().to_string(),
                course_id: event.course_id,
                student_id: event.student_id,
                event_id: event.id,
                rule_id: firing.rule.id,
                action_id: action.id,
                created_by: firing.actor,
            },
        )
        .await?
        else {
            return Ok(None);
        };

        AuditRecorder::inserted(uow.conn(), tables::ALERTS, alert.id, &alert, firing.actor).await?;
        uow.stage(BroadcastMessage::new(
            messages::ALERT_CREATED,
            firing.now,
            serde_json::to_value(&alert)?,
        ));
        Ok(Some(alert))
    }

    async fn queue_notification(
        uow: &mut UnitOfWork,
        firing: &Firing<'_>,
        action: &Action,
    ) -> EngineResult<OutboxNotification> {
        let params = NotificationParams::from_params(&action.params).unwrap_or_else(|e| {
            tracing::warn!(
                action_id = action.id,
                error = %e,
                "Malformed notification params, using defaults"
            );
            NotificationParams::default()
        });
        let event = firing.event;

        let row = NotificationOutboxRepo::insert(
            uow.conn(),
            &NewOutboxNotification {
                channel: CHANNEL_IN_APP.to_string(),
                recipient: params.recipient().to_string(),
                subject: params.subject(&action.name).to_string(),
                payload: json!({
                    "action": action.code,
                    "event_id": event.id,
                    "course_id": event.course_id,
                    "student_id": event.student_id,
                    "template": params.template,
                    "detail": firing.detail,
                }),
                created_by: firing.actor,
            },
        )
        .await?;

        AuditRecorder::inserted(
            uow.conn(),
            tables::NOTIFICATION_OUTBOX,
            row.id,
            &row,
            firing.actor,
        )
        .await?;
        uow.stage(BroadcastMessage::new(
            messages::NOTIFICATION_CREATED,
            firing.now,
            serde_json::to_value(&row)?,
        ));
        Ok(row)
    }
}
