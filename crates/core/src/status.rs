//! Stored status and enum-like column values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub mod alert_status {
    pub const OPEN: &str = "open";
    pub const CLOSED: &str = "closed";
}

pub mod outbox_status {
    pub const PENDING: &str = "pending";
    pub const SENT: &str = "sent";
    pub const ERROR: &str = "error";
}

pub mod event_origin {
    pub const TEACHER: &str = "teacher";
}

/// Result recorded on an action execution.
pub const EXECUTION_OK: &str = "ok";

/// Concept codes seeded with the schema.
pub mod concept_codes {
    pub const ABSENCE: &str = "INASISTENCIA";
    pub const RESTROOM: &str = "BANO";
    pub const INFIRMARY: &str = "ENFERMERIA";
    pub const SOS: &str = "SOS";
    pub const BEHAVIOUR: &str = "COMPORTAMIENTO";
    pub const DISCIPLINARY: &str = "DISCIPLINARIO";
}

// ---------------------------------------------------------------------------
// Attendance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Justified,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Justified => "justified",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "justified" => Ok(AttendanceStatus::Justified),
            other => Err(CoreError::Validation(format!(
                "unknown attendance status: {other}"
            ))),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Temporary states
// ---------------------------------------------------------------------------

/// Transient student states a teacher can open and close during a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporaryStateKind {
    Restroom,
    Infirmary,
    Sos,
}

impl TemporaryStateKind {
    pub const ALL: [TemporaryStateKind; 3] = [
        TemporaryStateKind::Restroom,
        TemporaryStateKind::Infirmary,
        TemporaryStateKind::Sos,
    ];

    pub fn concept_code(self) -> &'static str {
        match self {
            TemporaryStateKind::Restroom => concept_codes::RESTROOM,
            TemporaryStateKind::Infirmary => concept_codes::INFIRMARY,
            TemporaryStateKind::Sos => concept_codes::SOS,
        }
    }
}
