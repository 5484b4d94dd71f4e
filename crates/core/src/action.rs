//! Action kinds and their parameter templates.
//!
//! Actions are reference data: a stored `kind` string plus a JSON `params`
//! object. [`ActionKind`] is the closed set the executor dispatches on, with
//! [`ActionKind::Other`] covering kinds that only get an execution record.

use serde::Deserialize;

pub const KIND_NOTIFICATION: &str = "notificacion";
pub const KIND_ALERT: &str = "alerta";
pub const KIND_STATE_CHANGE: &str = "cambio_estado";
pub const KIND_RECORD: &str = "registro";

/// Priority used when an alert action does not set one.
pub const DEFAULT_ALERT_PRIORITY: &str = "media";

/// Recipient used when a notification action does not set one.
pub const DEFAULT_NOTIFICATION_RECIPIENT: &str = "inspector";

/// Channel for notifications queued by the engine.
pub const CHANNEL_IN_APP: &str = "in_app";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Notification,
    Alert,
    StateChange,
    Record,
    Other(String),
}

impl ActionKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            KIND_NOTIFICATION => ActionKind::Notification,
            KIND_ALERT => ActionKind::Alert,
            KIND_STATE_CHANGE => ActionKind::StateChange,
            KIND_RECORD => ActionKind::Record,
            other => ActionKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Notification => KIND_NOTIFICATION,
            ActionKind::Alert => KIND_ALERT,
            ActionKind::StateChange => KIND_STATE_CHANGE,
            ActionKind::Record => KIND_RECORD,
            ActionKind::Other(other) => other,
        }
    }
}

/// Parameters of an `alerta` action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlertParams {
    #[serde(rename = "destinatario", default)]
    pub recipient: Option<String>,

    #[serde(rename = "prioridad", default)]
    pub priority: Option<String>,
}

impl AlertParams {
    pub fn from_params(params: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if params.is_null() {
            return Ok(Self::default());
        }
        AlertParams::deserialize(params)
    }

    pub fn priority(&self) -> &str {
        non_blank(self.priority.as_deref()).unwrap_or(DEFAULT_ALERT_PRIORITY)
    }
}

/// Parameters of a `notificacion` action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationParams {
    #[serde(rename = "destinatario", default)]
    pub recipient: Option<String>,

    #[serde(rename = "asunto", default)]
    pub subject: Option<String>,

    #[serde(rename = "plantilla", default)]
    pub template: Option<String>,
}

impl NotificationParams {
    pub fn from_params(params: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if params.is_null() {
            return Ok(Self::default());
        }
        NotificationParams::deserialize(params)
    }

    pub fn recipient(&self) -> &str {
        non_blank(self.recipient.as_deref()).unwrap_or(DEFAULT_NOTIFICATION_RECIPIENT)
    }

    /// Subject line, falling back to the action's name.
    pub fn subject<'a>(&'a self, action_name: &'a str) -> &'a str {
        non_blank(self.subject.as_deref()).unwrap_or(action_name)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
