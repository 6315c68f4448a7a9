//! Canonicalization of evidence rows from the query layer.
//!
//! Rows arrive with snake_case, kebab-case, or short query-variable keys.
//! This module is the only place that knows those spellings; everything
//! downstream sees an [`EvidenceRow`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use spine_types::{EvidenceChannel, EvidenceRole, FailureMode};
use tracing::warn;

use crate::error::{TheoryError, TheoryResult};

const EVIDENCE_ID_KEYS: &[&str] = &["eid", "entity_id", "entity-id", "evidence_id", "evidence-id"];
const CLAIM_ID_KEYS: &[&str] = &["cid", "claim_id", "claim-id", "proposition_id", "pid"];
const SCOPE_LOCK_KEYS: &[&str] = &["scope_lock_id", "scope-lock-id", "slid"];
const CONFIDENCE_KEYS: &[&str] = &[
    "conf",
    "rs",
    "confidence_score",
    "confidence-score",
    "refutation_strength",
    "refutation-strength",
    "confidence",
];
const ROLE_KEYS: &[&str] = &["role", "evidence_role", "evidence-role"];
const FAILURE_MODE_KEYS: &[&str] = &["failure_mode", "failure-mode"];

/// Confidence assumed when a row carries none.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// First key in `keys` holding a non-null value.
fn first_present<'a>(row: &'a Map<String, Value>, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|k| row.get(*k).filter(|v| !v.is_null()).map(|v| (*k, v)))
}

/// First key in `keys` holding a non-blank string, trimmed.
fn first_string(row: &Map<String, Value>, keys: &[&'static str]) -> Option<String> {
    keys.iter().find_map(|k| match row.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Clamp `value` into [0, 1], rejecting NaN and infinities.
pub fn clamp_probability(value: f64, field: &'static str) -> TheoryResult<f64> {
    if !value.is_finite() {
        return Err(TheoryError::NonFiniteConfidence { field, value });
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        warn!(field, raw = value, clamped, "probability clamped");
    }
    Ok(clamped)
}

fn numeric(field: &'static str, value: &Value) -> TheoryResult<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| TheoryError::NonNumericConfidence {
            field,
            value: n.to_string(),
        }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| TheoryError::NonNumericConfidence {
                field,
                value: s.clone(),
            }),
        other => Err(TheoryError::NonNumericConfidence {
            field,
            value: other.to_string(),
        }),
    }
}

/// One canonical evidence row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub evidence_id: Option<String>,
    pub claim_id: Option<String>,
    pub scope_lock_id: Option<String>,
    /// Clamped to [0, 1].
    pub confidence: f64,
    pub role: Option<EvidenceRole>,
    pub failure_mode: Option<FailureMode>,
}

impl EvidenceRow {
    /// Canonicalize a raw query-layer row.
    pub fn from_value(value: &Value) -> TheoryResult<Self> {
        let row = value.as_object().ok_or(TheoryError::NotAnObject)?;

        let confidence = match first_present(row, CONFIDENCE_KEYS) {
            Some((key, raw)) => clamp_probability(numeric(key, raw)?, key)?,
            None => DEFAULT_CONFIDENCE,
        };
        let role = first_string(row, ROLE_KEYS)
            .map(|r| r.parse::<EvidenceRole>())
            .transpose()?;
        let failure_mode = first_string(row, FAILURE_MODE_KEYS)
            .map(|m| m.parse::<FailureMode>())
            .transpose()?;

        Ok(Self {
            evidence_id: first_string(row, EVIDENCE_ID_KEYS),
            claim_id: first_string(row, CLAIM_ID_KEYS),
            scope_lock_id: first_string(row, SCOPE_LOCK_KEYS),
            confidence,
            role,
            failure_mode,
        })
    }
}

/// An evidence row with its role and the channel it arrived on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEvidence {
    pub row: EvidenceRow,
    pub role: EvidenceRole,
    pub channel: EvidenceChannel,
}

impl ClassifiedEvidence {
    pub fn new(row: EvidenceRow, role: EvidenceRole, channel: EvidenceChannel) -> Self {
        Self { row, role, channel }
    }

    /// Canonicalize `value`, taking the role from the row itself.
    pub fn from_value(value: &Value, channel: EvidenceChannel, index: usize) -> TheoryResult<Self> {
        let row = EvidenceRow::from_value(value)?;
        let role = row.role.ok_or(TheoryError::MissingRole { index })?;
        Ok(Self { row, role, channel })
    }

    /// Canonicalize a batch of raw rows from one channel.
    pub fn from_values(values: &[Value], channel: EvidenceChannel) -> TheoryResult<Vec<Self>> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Self::from_value(v, channel, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kebab_and_snake_keys_canonicalize_identically() {
        let snake = json!({
            "evidence_id": "ev-1", "claim_id": "c1", "scope_lock_id": "sl-1",
            "confidence": 0.9, "role": "support"
        });
        let kebab = json!({
            "evidence-id": "ev-1", "claim-id": "c1", "scope-lock-id": "sl-1",
            "confidence": 0.9, "role": "support"
        });
        assert_eq!(
            EvidenceRow::from_value(&snake).unwrap(),
            EvidenceRow::from_value(&kebab).unwrap()
        );
    }

    #[test]
    fn query_variable_keys_take_precedence() {
        let row = json!({"eid": "ev-q", "evidence_id": "ev-long", "cid": "c9", "conf": 0.7, "confidence": 0.1});
        let r = EvidenceRow::from_value(&row).unwrap();
        assert_eq!(r.evidence_id.as_deref(), Some("ev-q"));
        assert_eq!(r.claim_id.as_deref(), Some("c9"));
        assert_eq!(r.confidence, 0.7);
    }

    #[test]
    fn zero_confidence_is_kept() {
        let r = EvidenceRow::from_value(&json!({"conf": 0.0})).unwrap();
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn missing_confidence_defaults() {
        let r = EvidenceRow::from_value(&json!({"eid": "ev-1"})).unwrap();
        assert_eq!(r.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn confidence_is_clamped_and_parsed_from_strings() {
        assert_eq!(EvidenceRow::from_value(&json!({"rs": 1.7})).unwrap().confidence, 1.0);
        assert_eq!(EvidenceRow::from_value(&json!({"conf": -3})).unwrap().confidence, 0.0);
        assert_eq!(
            EvidenceRow::from_value(&json!({"confidence-score": "0.25"})).unwrap().confidence,
            0.25
        );
    }

    #[test]
    fn non_finite_confidence_is_rejected() {
        let err = EvidenceRow::from_value(&json!({"conf": "NaN"})).unwrap_err();
        assert!(matches!(err, TheoryError::NonFiniteConfidence { field: "conf", .. }));
        let err = EvidenceRow::from_value(&json!({"conf": "inf"})).unwrap_err();
        assert!(matches!(err, TheoryError::NonFiniteConfidence { .. }));
        assert!(EvidenceRow::from_value(&json!({"conf": "high"})).is_err());
    }

    #[test]
    fn role_and_failure_mode_are_validated() {
        let r = EvidenceRow::from_value(&json!({"role": " Refute ", "failure-mode": "sign_flip"})).unwrap();
        assert_eq!(r.role, Some(EvidenceRole::Refute));
        assert_eq!(r.failure_mode, Some(FailureMode::SignFlip));
        assert!(EvidenceRow::from_value(&json!({"role": "maybe"})).is_err());
    }

    #[test]
    fn classified_rows_need_a_role() {
        let rows = vec![json!({"eid": "ev-1", "role": "support"}), json!({"eid": "ev-2"})];
        let err = ClassifiedEvidence::from_values(&rows, EvidenceChannel::Validation).unwrap_err();
        assert_eq!(err, TheoryError::MissingRole { index: 1 });
    }

    #[test]
    fn non_object_rows_are_rejected() {
        assert_eq!(EvidenceRow::from_value(&json!([1, 2])).unwrap_err(), TheoryError::NotAnObject);
    }
}
