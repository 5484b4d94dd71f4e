//! Audit trail vocabulary.
//!
//! Every mutation the engine performs is paired with an `audit_logs` row
//! holding before/after JSON snapshots. This module only names things; the
//! recorder lives in the engine crate.

use std::fmt;

/// Kind of mutation recorded in an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Insert,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Insert => "INSERT",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table names used as the audit entity type.
pub mod tables {
    pub const EVENTS: &str = "events";
    pub const RULES: &str = "rules";
    pub const ACTION_EXECUTIONS: &str = "action_executions";
    pub const ALERTS: &str = "alerts";
    pub const NOTIFICATION_OUTBOX: &str = "notification_outbox";
    pub const ATTENDANCE: &str = "attendance";
}
