//! Action execution entity model.
//!
//! Executions are append-only. They double as the dedup ledger for rule
//! firings, keyed either by scope and window or by the triggering event.

use serde::Serialize;
use sqlx::FromRow;
use vigia_core::types::{DbId, Timestamp};

/// A row from the `action_executions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActionExecution {
    pub id: DbId,
    pub rule_id: DbId,
    pub action_id: DbId,
    pub event_id: DbId,
    pub student_id: Option<DbId>,
    pub course_id: Option<DbId>,
    pub result: String,
    pub detail: Option<serde_json::Value>,
    pub scope_key: Option<String>,
    pub window_start: Option<Timestamp>,
    pub window_end: Option<Timestamp>,
    pub executed_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for inserting an execution.
#[derive(Debug, Clone)]
pub struct NewActionExecution {
    pub rule_id: DbId,
    pub action_id: DbId,
    pub event_id: DbId,
    pub student_id: Option<DbId>,
    pub course_id: Option<DbId>,
    pub result: String,
    pub detail: serde_json::Value,
    pub dedup: DedupKey,
    pub executed_at: Timestamp,
}

/// Identity under which a rule firing is recorded at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupKey {
    /// One execution per (rule, action, scope, window).
    Window {
        scope_key: String,
        start: Timestamp,
        end: Timestamp,
    },
    /// One execution per (rule, action, event); `scope_key` is still
    /// recorded when the evaluator produced one.
    Event {
        event_id: DbId,
        scope_key: Option<String>,
    },
}

impl DedupKey {
    /// Pick the key for a firing: windowed when both a scope and a window
    /// exist, otherwise per event.
    pub fn for_firing(
        event_id: DbId,
        scope_key: Option<&str>,
        window: Option<(Timestamp, Timestamp)>,
    ) -> Self {
        match (scope_key.filter(|k| !k.is_empty()), window) {
            (Some(scope_key), Some((start, end))) => DedupKey::Window {
                scope_key: scope_key.to_string(),
                start,
                end,
            },
            (scope_key, _) => DedupKey::Event {
                event_id,
                scope_key: scope_key.map(str::to_string),
            },
        }
    }

    pub fn scope_key(&self) -> Option<&str> {
        match self {
            DedupKey::Window { scope_key, .. } => Some(scope_key),
            DedupKey::Event { scope_key, .. } => scope_key.as_deref(),
        }
    }

    pub fn window(&self) -> (Option<Timestamp>, Option<Timestamp>) {
        match self {
            DedupKey::Window { start, end, .. } => (Some(*start), Some(*end)),
            DedupKey::Event { .. } => (None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn scope_and_window_give_windowed_key() {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 4, 8, 0, 0, 0).unwrap();
        let key = DedupKey::for_firing(9, Some("student:3"), Some((start, end)));
        assert_eq!(
            key,
            DedupKey::Window {
                scope_key: "student:3".into(),
                start,
                end
            }
        );
        assert_eq!(key.window(), (Some(start), Some(end)));
    }

    #[test]
    fn missing_window_falls_back_to_event() {
        let key = DedupKey::for_firing(9, Some("student:3"), None);
        assert_eq!(
            key,
            DedupKey::Event {
                event_id: 9,
                scope_key: Some("student:3".into())
            }
        );
        assert_eq!(key.scope_key(), Some("student:3"));
        assert_eq!(key.window(), (None, None));
    }

    #[test]
    fn blank_scope_falls_back_to_event() {
        let now = Utc::now();
        let key = DedupKey::for_firing(4, Some(""), Some((now, now)));
        assert_eq!(
            key,
            DedupKey::Event {
                event_id: 4,
                scope_key: None
            }
        );
    }
}
