//! Rule condition vocabulary.
//!
//! Rules store their condition as a JSON object tagged by `tipo`.
//! [`Condition::parse`] maps it onto a closed sum type. Kinds that are not
//! evaluated (for example `"tiempo"`) land in [`Condition::Unsupported`],
//! which callers treat as "does not fire" rather than as an error.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rule-local condition failures. Neither variant aborts sibling rules.
#[derive(Debug, thiserror::Error)]
pub enum ConditionError {
    /// The stored JSON does not match any recognised condition shape.
    #[error("Malformed rule condition: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The `operador` field holds something other than `>=`, `<=` or `==`.
    #[error("Unsupported comparison operator: {0:?}")]
    UnsupportedOperator(String),
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// A parsed rule condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "tipo")]
pub enum Condition {
    /// Fires for any student not flagged as a special case.
    #[serde(rename = "caso_especial", alias = "special_case")]
    SpecialCase,

    /// Threshold comparison over a count of events in a trailing window.
    #[serde(rename = "cantidad", alias = "count")]
    Count(CountCondition),

    /// Any other `tipo`. Never fires.
    #[serde(other)]
    Unsupported,
}

impl Condition {
    /// Parse a condition from the rule's stored JSON.
    pub fn parse(value: &serde_json::Value) -> Result<Self, ConditionError> {
        Ok(Condition::deserialize(value)?)
    }
}

/// Parameters of a `cantidad` condition.
///
/// Field names follow the stored JSON. Missing numeric fields default to
/// zero, so a condition without `dias` gets a one-day window and one without
/// `operador` fails at comparison time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CountCondition {
    /// Descriptive label kept from older rule definitions; not evaluated.
    #[serde(rename = "campo", default)]
    pub field: Option<String>,

    #[serde(rename = "operador", default)]
    pub operator: String,

    #[serde(rename = "valor", default)]
    pub threshold: i64,

    #[serde(rename = "dias", default)]
    pub days: i64,

    #[serde(default)]
    pub scope: Scope,

    /// Count a different concept than the triggering event's.
    #[serde(rename = "concepto_codigo", default)]
    pub concept_code: Option<String>,

    /// Count distinct calendar days with at least one match instead of rows.
    #[serde(rename = "distinct_dias", alias = "distinct_days", default)]
    pub distinct_days: bool,
}

impl CountCondition {
    /// Window length in days, never less than one.
    pub fn window_days(&self) -> i64 {
        if self.days <= 0 {
            1
        } else {
            self.days
        }
    }

    /// Trailing window `[now - days, now]`.
    pub fn window(&self, now: Timestamp) -> Window {
        Window {
            start: now - chrono::Duration::days(self.window_days()),
            end: now,
        }
    }

    /// Concept code override, ignoring blank values.
    pub fn counted_concept_code(&self) -> Option<&str> {
        self.concept_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    pub fn comparison(&self) -> Result<Comparison, ConditionError> {
        self.operator.parse()
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Aggregation unit a count is evaluated over.
///
/// Only `curso`/`course` selects course scope; any other value, including
/// null, counts per student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    Student,
    Course,
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref().map(str::trim) {
            Some("curso") | Some("course") => Scope::Course,
            _ => Scope::Student,
        })
    }
}

impl Scope {
    pub fn key(self, id: DbId) -> String {
        match self {
            Scope::Student => format!("student:{id}"),
            Scope::Course => format!("course:{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    AtMost,
    Equal,
}

impl Comparison {
    pub fn holds(self, count: i64, threshold: i64) -> bool {
        match self {
            Comparison::AtLeast => count >= threshold,
            Comparison::AtMost => count <= threshold,
            Comparison::Equal => count == threshold,
        }
    }
}

impl FromStr for Comparison {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">=" => Ok(Comparison::AtLeast),
            "<=" => Ok(Comparison::AtMost),
            "==" => Ok(Comparison::Equal),
            other => Err(ConditionError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
            Comparison::Equal => "==",
        };
        f.write_str(op)
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Closed time interval a count aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Timestamp,
    pub end: Timestamp,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_count_condition_with_all_fields() {
        let cond = Condition::parse(&json!({
            "tipo": "cantidad",
            "campo": "inasistencias",
            "operador": ">=",
            "valor": 3,
            "dias": 7,
            "scope": "curso",
            "concepto_codigo": "BANO",
            "distinct_dias": true
        }))
        .unwrap();

        let Condition::Count(count) = cond else {
            panic!("expected a count condition");
        };
        assert_eq!(count.threshold, 3);
        assert_eq!(count.days, 7);
        assert_eq!(count.scope, Scope::Course);
        assert_eq!(count.counted_concept_code(), Some("BANO"));
        assert!(count.distinct_days);
        assert_eq!(count.comparison().unwrap(), Comparison::AtLeast);
    }

    #[test]
    fn english_aliases_are_accepted() {
        let cond = Condition::parse(&json!({
            "tipo": "count",
            "operador": "==",
            "valor": 1,
            "scope": "student"
        }))
        .unwrap();
        assert_matches!(cond, Condition::Count(c) if c.scope == Scope::Student);

        let special = Condition::parse(&json!({"tipo": "special_case"})).unwrap();
        assert_eq!(special, Condition::SpecialCase);
    }

    #[test]
    fn scope_defaults_to_student() {
        let cond = Condition::parse(&json!({"tipo": "cantidad", "operador": ">=", "valor": 1}))
            .unwrap();
        assert_matches!(cond, Condition::Count(c) if c.scope == Scope::Student && !c.distinct_days);
    }

    #[test]
    fn unrecognised_scope_counts_per_student() {
        for scope in [json!("grupo"), json!(""), serde_json::Value::Null] {
            let cond = Condition::parse(&json!({
                "tipo": "cantidad",
                "operador": ">=",
                "valor": 1,
                "scope": scope
            }))
            .unwrap();
            assert_matches!(cond, Condition::Count(c) if c.scope == Scope::Student);
        }
    }

    #[test]
    fn special_case_ignores_extra_fields() {
        let cond = Condition::parse(&json!({"tipo": "caso_especial", "valor": 2})).unwrap();
        assert_eq!(cond, Condition::SpecialCase);
    }

    #[test]
    fn unknown_kind_is_unsupported_not_an_error() {
        let cond = Condition::parse(&json!({"tipo": "tiempo", "minutos": 15})).unwrap();
        assert_eq!(cond, Condition::Unsupported);
    }

    #[test]
    fn missing_tag_is_malformed() {
        let err = Condition::parse(&json!({"operador": ">="})).unwrap_err();
        assert_matches!(err, ConditionError::Malformed(_));
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = Condition::parse(&json!({"tipo": "cantidad", "valor": "tres"})).unwrap_err();
        assert_matches!(err, ConditionError::Malformed(_));
    }

    #[test]
    fn blank_concept_code_is_ignored() {
        let cond = Condition::parse(&json!({"tipo": "cantidad", "concepto_codigo": "  "})).unwrap();
        assert_matches!(cond, Condition::Count(c) if c.counted_concept_code().is_none());
    }

    #[test]
    fn window_is_at_least_one_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let mut cond = CountCondition {
            field: None,
            operator: ">=".into(),
            threshold: 1,
            days: 0,
            scope: Scope::Student,
            concept_code: None,
            distinct_days: false,
        };
        assert_eq!(cond.window(now).start, now - chrono::Duration::days(1));

        cond.days = -4;
        assert_eq!(cond.window_days(), 1);

        cond.days = 7;
        let window = cond.window(now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 5, 3, 12, 0, 0).unwrap());
        assert_eq!(window.end, now);
    }

    #[test]
    fn comparison_semantics() {
        assert!(Comparison::AtLeast.holds(2, 2));
        assert!(!Comparison::AtLeast.holds(1, 2));
        assert!(Comparison::AtMost.holds(0, 2));
        assert!(!Comparison::AtMost.holds(3, 2));
        assert!(Comparison::Equal.holds(2, 2));
        assert!(!Comparison::Equal.holds(3, 2));
    }

    #[test]
    fn unsupported_operator_is_reported() {
        let err = ">".parse::<Comparison>().unwrap_err();
        assert_matches!(err, ConditionError::UnsupportedOperator(op) if op == ">");

        let err = "".parse::<Comparison>().unwrap_err();
        assert_matches!(err, ConditionError::UnsupportedOperator(_));
    }

    #[test]
    fn scope_keys() {
        assert_eq!(Scope::Student.key(42), "student:42");
        assert_eq!(Scope::Course.key(7), "course:7");
    }
}
