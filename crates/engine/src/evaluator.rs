//! Rule evaluator.
//!
//! Decides whether a rule's condition holds for a triggering event and
//! reports the dedup identity (scope key and window) of the firing along
//! with a diagnostic detail blob.

use serde_json::json;
use sqlx::PgConnection;
use vigia_core::condition::{Condition, ConditionError, CountCondition, Scope, Window};
use vigia_core::types::{DbId, Timestamp};
use vigia_db::models::event::Event;
use vigia_db::models::rule::Rule;
use vigia_db::repositories::{ConceptRepo, EventRepo, EventScope, StudentRepo};

/// Rule-local evaluation failures.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of evaluating one rule against one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub fires: bool,
    /// `student:<id>` or `course:<id>`, when the condition has a scope.
    pub scope_key: Option<String>,
    /// Set only for `cantidad` conditions.
    pub window: Option<Window>,
    pub detail: serde_json::Value,
}

impl Evaluation {
    fn no_fire(detail: serde_json::Value) -> Self {
        Self {
            fires: false,
            scope_key: None,
            window: None,
            detail,
        }
    }
}

pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Evaluate `rule` for `event` as of `now`.
    ///
    /// Missing associations and unknown condition kinds are "does not
    /// fire", not errors.
    pub async fn evaluate(
        conn: &mut PgConnection,
        rule: &Rule,
        event: &Event,
        now: Timestamp,
    ) -> Result<Evaluation, EvalError> {
        let condition = rule.parse_condition()?;
        let mut detail = json!({
            "rule": rule.name,
            "rule_id": rule.id,
            "condition": rule.condition,
        });

        match condition {
            Condition::SpecialCase => Self::special_case(conn, event, detail).await,
            Condition::Count(count) => Self::count(conn, &count, event, now, detail).await,
            Condition::Unsupported => {
                detail["skipped"] = json!("unsupported condition");
                Ok(Evaluation::no_fire(detail))
            }
        }
    }

    async fn special_case(
        conn: &mut PgConnection,
        event: &Event,
        mut detail: serde_json::Value,
    ) -> Result<Evaluation, EvalError> {
        let Some(student_id) = event.student_id else {
            return Ok(Evaluation::no_fire(detail));
        };
        let Some(student) = StudentRepo::find_by_id(conn, student_id).await? else {
            return Ok(Evaluation::no_fire(detail));
        };

        detail["special_case"] = json!(student.special_case);
        if student.special_case {
            return Ok(Evaluation::no_fire(detail));
        }

        Ok(Evaluation {
            fires: true,
            scope_key: Some(Scope::Student.key(student_id)),
            window: None,
            detail,
        })
    }

    async fn count(
        conn: &mut PgConnection,
        condition: &CountCondition,
        event: &Event,
        now: Timestamp,
        mut detail: serde_json::Value,
    ) -> Result<Evaluation, EvalError> {
        let window = condition.window(now);
        detail["window_start"] = json!(window.start);
        detail["window_end"] = json!(window.end);
        detail["distinct_days"] = json!(condition.distinct_days);

        let scope = match condition.scope {
            Scope::Student => event.student_id.map(EventScope::Student),
            Scope::Course => event.course_id.map(EventScope::Course),
        };
        let Some(scope) = scope else {
            return Ok(Evaluation {
                window: Some(window),
                ..Evaluation::no_fire(detail)
            });
        };
        let scope_key = match scope {
            EventScope::Student(id) => Scope::Student.key(id),
            EventScope::Course(id) => Scope::Course.key(id),
        };

        let concept_id = Self::counted_concept(conn, condition, event).await?;
        let count = if condition.distinct_days {
            EventRepo::count_distinct_days_in_window(conn, concept_id, scope, window.start, window.end)
                .await?
        } else {
            EventRepo::count_in_window(conn, concept_id, scope, window.start, window.end).await?
        };
        detail["count"] = json!(count);

        let comparison = condition.comparison()?;
        Ok(Evaluation {
            fires: comparison.holds(count, condition.threshold),
            scope_key: Some(scope_key),
            window: Some(window),
            detail,
        })
    }

    /// The concept to count: the condition's override when it names a live
    /// concept, otherwise the triggering event's.
    async fn counted_concept(
        conn: &mut PgConnection,
        condition: &CountCondition,
        event: &Event,
    ) -> Result<DbId, sqlx::Error> {
        let Some(code) = condition.counted_concept_code() else {
            return Ok(event.concept_id);
        };
        match ConceptRepo::find_by_code(conn, code).await? {
            Some(concept) => Ok(concept.id),
            None => {
                tracing::warn!(
                    concept_code = code,
                    event_id = event.id,
                    "Unknown concept override, counting the event's concept"
                );
                Ok(event.concept_id)
            }
        }
    }
}
