//! Structured JSON candidates.
//!
//! A candidate is accepted only when the six top-level keys and the four
//! primary-diagnosis keys are present. Anything missing is a parse failure,
//! never something to repair. Short lists are left for the repairer.

use crate::cleaner;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use triage_core::data_model::{lenient_optional_text, lenient_text_list};
use triage_core::{SingleDiagnosis, StageError};

pub const REQUIRED_KEYS: [&str; 6] = [
    "primary_diagnosis",
    "alternative_diagnoses",
    "general_advice",
    "overall_severity_level",
    "related_symptoms",
    "recommended_actions",
];

pub const PRIMARY_KEYS: [&str; 4] = [
    "diagnosis_name",
    "confidence_percentage",
    "description",
    "reasons",
];

/// Older prompts used this name for the severity key
const SEVERITY_KEY_ALIAS: &str = "severity_level";

/// Key-complete, typed, but not yet repaired.
///
/// Past the key check, decoding never fails on content: wrong-typed values
/// are coerced and short or missing entries are left for the repairer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagnosisCandidate {
    pub primary_diagnosis: SingleDiagnosis,
    #[serde(deserialize_with = "alternative_list")]
    pub alternative_diagnoses: Vec<SingleDiagnosis>,
    #[serde(deserialize_with = "lenient_text_list")]
    pub general_advice: Vec<String>,
    /// Kept raw; mapping to the severity scale is lenient and done on repair
    #[serde(alias = "severity_level", default, deserialize_with = "lenient_optional_text")]
    pub overall_severity_level: Option<String>,
    #[serde(deserialize_with = "lenient_text_list")]
    pub related_symptoms: Vec<String>,
    #[serde(deserialize_with = "lenient_text_list")]
    pub recommended_actions: Vec<String>,
}

/// Object entries only; anything else in the list is dropped
fn alternative_list<'de, D>(deserializer: D) -> Result<Vec<SingleDiagnosis>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries,
        Value::Object(entry) => vec![Value::Object(entry)],
        _ => Vec::new(),
    };
    Ok(entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

/// Clean `raw` and decode it into a key-complete candidate
pub fn parse_candidate(raw: &str) -> Result<DiagnosisCandidate, StageError> {
    let text = cleaner::clean(raw);
    if text.is_empty() {
        return Err(StageError::Syntax("empty response".to_string()));
    }

    let value: Value =
        serde_json::from_str(&text).map_err(|e| StageError::Syntax(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| StageError::Malformed("top-level value is not an object".to_string()))?;

    check_required_keys(object)?;

    serde_json::from_value(value.clone()).map_err(|e| StageError::Malformed(e.to_string()))
}

/// Presence check only; types are checked on decode
pub fn check_required_keys(object: &Map<String, Value>) -> Result<(), StageError> {
    for key in REQUIRED_KEYS {
        let present = object.contains_key(key)
            || (key == "overall_severity_level" && object.contains_key(SEVERITY_KEY_ALIAS));
        if !present {
            return Err(StageError::MissingField(key.to_string()));
        }
    }

    let primary = object
        .get("primary_diagnosis")
        .and_then(Value::as_object)
        .ok_or_else(|| StageError::Malformed("primary_diagnosis is not an object".to_string()))?;

    for key in PRIMARY_KEYS {
        if !primary.contains_key(key) {
            return Err(StageError::MissingField(format!("primary_diagnosis.{}", key)));
        }
    }

    Ok(())
}
