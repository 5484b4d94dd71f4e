//! The orchestration core.
//!
//! [`Orchestrator`] is stateless apart from its pool, bus and clock
//! handles, and is safe to share across tasks. The `_in_tx` variants run
//! inside a caller-owned [`UnitOfWork`] so callers can bundle their own
//! writes with event creation; the plain variants open and commit one.

use std::sync::Arc;

use serde_json::json;
use vigia_core::audit::{tables, AuditAction};
use vigia_core::clock::{Clock, SystemClock};
use vigia_core::error::CoreError;
use vigia_core::messages;
use vigia_core::types::{DbId, Timestamp};
use vigia_db::models::action_execution::DedupKey;
use vigia_db::models::event::{Event, NewEvent};
use vigia_db::models::rule::Rule;
use vigia_db::repositories::{ActionExecutionRepo, EventRepo, RuleRepo};
use vigia_db::DbPool;
use vigia_events::{BroadcastMessage, EventBus};

use crate::audit::AuditRecorder;
use crate::error::{EngineError, EngineResult};
use crate::evaluator::{EvalError, RuleEvaluator};
use crate::executor::{ActionExecutor, ExecutionOutcome, Firing};
use crate::unit_of_work::UnitOfWork;

/// Per-pass counters returned by [`Orchestrator::evaluate_and_execute`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    /// Active rules considered.
    pub rules: usize,
    pub fired: usize,
    pub executed: usize,
    /// Firings skipped because the dedup ledger already held them.
    pub duplicates: usize,
    /// Rules whose evaluation or execution failed and was rolled back.
    pub failed: usize,
}

enum RuleOutcome {
    NotFired,
    Duplicate,
    Executed,
}

enum RuleFailure {
    Evaluation(EvalError),
    Execution(EngineError),
}

#[derive(Clone)]
pub struct Orchestrator {
    pool: DbPool,
    bus: Option<Arc<EventBus>>,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(pool: DbPool, bus: Option<Arc<EventBus>>) -> Self {
        Self {
            pool,
            bus,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Open a unit of work publishing to this orchestrator's bus.
    pub async fn begin(&self) -> EngineResult<UnitOfWork> {
        Ok(UnitOfWork::begin(&self.pool, self.bus.clone()).await?)
    }

    // -----------------------------------------------------------------------
    // Event lifecycle
    // -----------------------------------------------------------------------

    pub async fn create_event(&self, input: &NewEvent, actor: Option<DbId>) -> EngineResult<Event> {
        let mut uow = self.begin().await?;
        let event = self.create_event_in_tx(&mut uow, input, actor).await?;
        uow.commit().await?;
        Ok(event)
    }

    /// Insert and audit an event, stage `evento_creado`, then run the rules
    /// bound to its concept.
    ///
    /// A failure writing the event itself is returned and the caller must
    /// discard the unit of work. Rule failures are contained.
    pub async fn create_event_in_tx(
        &self,
        uow: &mut UnitOfWork,
        input: &NewEvent,
        actor: Option<DbId>,
    ) -> EngineResult<Event> {
        let now = self.clock.now();
        let event = EventRepo::insert(uow.conn(), input, now).await?;
        AuditRecorder::inserted(uow.conn(), tables::EVENTS, event.id, &event, actor).await?;

        self.stage_event_view(uow, messages::EVENT_CREATED, &event, now).await?;
        tracing::debug!(event_id = event.id, concept_id = event.concept_id, "Event created");

        self.evaluate_and_execute(uow, &event, actor).await?;
        Ok(event)
    }

    pub async fn close_event(&self, event_id: DbId, actor: DbId) -> EngineResult<Event> {
        let mut uow = self.begin().await?;
        let event = self.close_event_in_tx(&mut uow, event_id, actor).await?;
        uow.commit().await?;
        Ok(event)
    }

    /// Close an open event. Closing a closed event returns it unchanged and
    /// writes nothing. Rules are not re-evaluated on close.
    pub async fn close_event_in_tx(
        &self,
        uow: &mut UnitOfWork,
        event_id: DbId,
        actor: DbId,
    ) -> EngineResult<Event> {
        let before = EventRepo::find_by_id(uow.conn(), event_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "event",
                id: event_id,
            })?;
        if !before.is_open() {
            return Ok(before);
        }

        let now = self.clock.now();
        let Some(closed) = EventRepo::close(uow.conn(), event_id, actor, now).await? else {
            // Closed by a concurrent transaction between the read and the update.
            let current = EventRepo::find_by_id(uow.conn(), event_id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "event",
                    id: event_id,
                })?;
            return Ok(current);
        };

        AuditRecorder::updated(uow.conn(), tables::EVENTS, event_id, &before, &closed, Some(actor))
            .await?;
        self.stage_event_view(uow, messages::EVENT_CLOSED, &closed, now).await?;
        tracing::debug!(event_id, closed_by = actor, "Event closed");
        Ok(closed)
    }

    async fn stage_event_view(
        &self,
        uow: &mut UnitOfWork,
        message_type: &str,
        event: &Event,
        now: Timestamp,
    ) -> EngineResult<()> {
        let payload = match EventRepo::find_view(uow.conn(), event.id).await? {
            Some(view) => serde_json::to_value(&view)?,
            None => serde_json::to_value(event)?,
        };
        uow.stage(BroadcastMessage::new(message_type, now, payload));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rule evaluation
    // -----------------------------------------------------------------------

    /// Evaluate every active rule of the event's concept and execute the
    /// ones that fire and are not already in the dedup ledger.
    ///
    /// Rules run in no particular order, each inside its own savepoint: a
    /// rule that fails is rolled back and logged (evaluation failures are
    /// also audited against the rule) and the pass moves on. Only a failure
    /// to load the rules or to manage savepoints is returned.
    pub async fn evaluate_and_execute(
        &self,
        uow: &mut UnitOfWork,
        event: &Event,
        actor: Option<DbId>,
    ) -> EngineResult<EvaluationSummary> {
        let rules = RuleRepo::list_active_for_concept(uow.conn(), event.concept_id).await?;
        let now = self.clock.now();
        let mut summary = EvaluationSummary {
            rules: rules.len(),
            ..Default::default()
        };

        for rule in &rules {
            let savepoint = uow.savepoint().await?;
            match self.process_rule(uow, rule, event, now, actor).await {
                Ok(outcome) => {
                    uow.release(savepoint).await?;
                    match outcome {
                        RuleOutcome::NotFired => {}
                        RuleOutcome::Duplicate => {
                            summary.fired += 1;
                            summary.duplicates += 1;
                        }
                        RuleOutcome::Executed => {
                            summary.fired += 1;
                            summary.executed += 1;
                        }
                    }
                }
                Err(RuleFailure::Evaluation(e)) => {
                    uow.rollback_to(savepoint).await?;
                    summary.failed += 1;
                    tracing::warn!(
                        rule_id = rule.id,
                        event_id = event.id,
                        error = %e,
                        "Rule evaluation failed, skipping rule"
                    );
                    AuditRecorder::record(
                        uow.conn(),
                        tables::RULES,
                        rule.id,
                        AuditAction::Update,
                        None,
                        Some(json!({ "error": e.to_string(), "event_id": event.id })),
                        actor,
                    )
                    .await?;
                }
                Err(RuleFailure::Execution(e)) => {
                    uow.rollback_to(savepoint).await?;
                    summary.failed += 1;
                    tracing::warn!(
                        rule_id = rule.id,
                        action_id = rule.action_id,
                        event_id = event.id,
                        error = %e,
                        "Action execution failed, skipping rule"
                    );
                }
            }
        }

        if summary.rules > 0 {
            tracing::debug!(
                event_id = event.id,
                rules = summary.rules,
                executed = summary.executed,
                duplicates = summary.duplicates,
                failed = summary.failed,
                "Rules evaluated"
            );
        }
        Ok(summary)
    }

    async fn process_rule(
        &self,
        uow: &mut UnitOfWork,
        rule: &Rule,
        event: &Event,
        now: Timestamp,
        actor: Option<DbId>,
    ) -> Result<RuleOutcome, RuleFailure> {
        let evaluation = RuleEvaluator::evaluate(uow.conn(), rule, event, now)
            .await
            .map_err(RuleFailure::Evaluation)?;
        if !evaluation.fires {
            return Ok(RuleOutcome::NotFired);
        }

        let dedup = DedupKey::for_firing(
            event.id,
            evaluation.scope_key.as_deref(),
            evaluation.window.map(|w| (w.start, w.end)),
        );
        let seen = ActionExecutionRepo::exists(uow.conn(), rule.id, rule.action_id, &dedup)
            .await
            .map_err(|e| RuleFailure::Execution(e.into()))?;
        if seen {
            return Ok(RuleOutcome::Duplicate);
        }

        let firing = Firing {
            rule,
            event,
            dedup,
            detail: evaluation.detail,
            actor,
            now,
        };
        match ActionExecutor::execute(uow, &firing)
            .await
            .map_err(RuleFailure::Execution)?
        {
            ExecutionOutcome::Executed { .. } => Ok(RuleOutcome::Executed),
            ExecutionOutcome::AlreadyExecuted => Ok(RuleOutcome::Duplicate),
        }
    }

    // -----------------------------------------------------------------------
    // Broadcast
    // -----------------------------------------------------------------------

    /// Publish a message immediately, outside any unit of work.
    pub fn notify(&self, message_type: &str, payload: serde_json::Value) {
        if let Some(bus) = &self.bus {
            bus.publish(BroadcastMessage::new(message_type, self.clock.now(), payload));
        }
    }
}
