//! Data Model: SymptomQuery, DiagnosisResult, Assessment, ConsultationRecord
use crate::error::TriageError;
use crate::runner::StageTrace;
use crate::MAX_PATIENT_AGE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Validated patient input. Only constructible through [`SymptomQuery::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomQuery {
    symptoms: String,
    patient_age: Option<u8>,
    patient_gender: Option<String>,
}

impl SymptomQuery {
    /// Validate raw caller input. Every problem found is reported, not just the first.
    pub fn new(
        symptoms: impl Into<String>,
        patient_age: Option<i64>,
        patient_gender: Option<String>,
    ) -> Result<Self, TriageError> {
        let symptoms = symptoms.into();
        let mut errors = Vec::new();

        if symptoms.trim().is_empty() {
            errors.push("Triệu chứng không được để trống".to_string());
        }

        let patient_age = match patient_age {
            Some(age) if !(0..=MAX_PATIENT_AGE).contains(&age) => {
                errors.push(format!("Tuổi phải từ 0 đến {}", MAX_PATIENT_AGE));
                None
            }
            Some(age) => Some(age as u8),
            None => None,
        };

        if !errors.is_empty() {
            return Err(TriageError::InvalidInput(errors));
        }

        let patient_gender = patient_gender
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());

        Ok(Self {
            symptoms: symptoms.trim().to_string(),
            patient_age,
            patient_gender,
        })
    }

    pub fn symptoms(&self) -> &str {
        &self.symptoms
    }

    pub fn patient_age(&self) -> Option<u8> {
        self.patient_age
    }

    pub fn patient_gender(&self) -> Option<&str> {
        self.patient_gender.as_deref()
    }
}

/// One ranked diagnosis as produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleDiagnosis {
    #[serde(default, deserialize_with = "lenient_text")]
    pub diagnosis_name: String,
    /// Model-supplied; not clamped or re-normalized.
    #[serde(default, deserialize_with = "deserialize_percentage")]
    pub confidence_percentage: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text_list")]
    pub reasons: Vec<String>,
}

impl SingleDiagnosis {
    pub fn new(
        diagnosis_name: &str,
        confidence_percentage: i64,
        description: &str,
        reasons: &[&str],
    ) -> Self {
        Self {
            diagnosis_name: diagnosis_name.to_string(),
            confidence_percentage,
            description: description.to_string(),
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Models emit percentages as `80`, `80.0` or `"80%"`. Anything unreadable
/// counts as 0 rather than failing the whole diagnosis.
fn deserialize_percentage<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let percentage = match &value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .ok()
            .map(|f| f.round() as i64),
        _ => None,
    };
    Ok(percentage.unwrap_or(0))
}

fn value_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// Any scalar as text; `null` is empty
pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(serde_json::Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Like [`lenient_text`], keeping `null` distinguishable
pub fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(serde_json::Value::deserialize(deserializer)?))
}

/// A list of strings. `null` is empty, a lone string becomes a one-item list.
pub fn lenient_text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<String> = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items.into_iter().filter_map(value_text).collect(),
        other => value_text(other).into_iter().collect(),
    };
    Ok(items.into_iter().filter(|item: &String| !item.is_empty()).collect())
}

/// Ordered severity scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityLevel {
    Mild,
    Moderate,
    Severe,
    Emergency,
}

/// Accepted spellings, most specific first so prefix matching picks the right level.
const SEVERITY_LABELS: &[(&str, SeverityLevel)] = &[
    ("cần chăm sóc y tế khẩn cấp", SeverityLevel::Emergency),
    ("cấp cứu", SeverityLevel::Emergency),
    ("khẩn cấp", SeverityLevel::Emergency),
    ("emergency", SeverityLevel::Emergency),
    ("critical", SeverityLevel::Emergency),
    ("nghiêm trọng", SeverityLevel::Severe),
    ("nặng", SeverityLevel::Severe),
    ("severe", SeverityLevel::Severe),
    ("high", SeverityLevel::Severe),
    ("trung bình", SeverityLevel::Moderate),
    ("moderate", SeverityLevel::Moderate),
    ("medium", SeverityLevel::Moderate),
    ("nhẹ", SeverityLevel::Mild),
    ("mild", SeverityLevel::Mild),
    ("low", SeverityLevel::Mild),
];

impl SeverityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Mild => "nhẹ",
            SeverityLevel::Moderate => "trung bình",
            SeverityLevel::Severe => "nghiêm trọng",
            SeverityLevel::Emergency => "cần chăm sóc y tế khẩn cấp",
        }
    }

    /// Lenient lookup: case-insensitive, tolerates trailing explanation
    /// such as `"Trung bình - nên gặp bác sĩ"`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        SEVERITY_LABELS
            .iter()
            .find(|(alias, _)| normalized == *alias)
            .or_else(|| {
                SEVERITY_LABELS
                    .iter()
                    .find(|(alias, _)| normalized.starts_with(alias))
            })
            .map(|(_, level)| *level)
    }

    pub fn is_at_least(&self, other: SeverityLevel) -> bool {
        *self >= other
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SeverityLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SeverityLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        SeverityLevel::from_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown severity level: {}", label)))
    }
}

/// Fully repaired structured diagnosis.
///
/// After repair `alternative_diagnoses.len() == 2` and every list field holds
/// at least three entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub primary_diagnosis: SingleDiagnosis,
    pub alternative_diagnoses: Vec<SingleDiagnosis>,
    pub general_advice: Vec<String>,
    #[serde(alias = "severity_level")]
    pub overall_severity_level: SeverityLevel,
    pub related_symptoms: Vec<String>,
    pub recommended_actions: Vec<String>,
}

/// Result of the free-text section grammar after placeholder repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeTextAssessment {
    pub possible_conditions: Vec<String>,
    pub recommendations: Vec<String>,
    pub severity: Option<String>,
    pub disclaimer: String,
}

/// What a parse strategy hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Assessment {
    Structured(DiagnosisResult),
    FreeText(FreeTextAssessment),
}

impl Assessment {
    pub fn as_structured(&self) -> Option<&DiagnosisResult> {
        match self {
            Assessment::Structured(result) => Some(result),
            Assessment::FreeText(_) => None,
        }
    }

    /// Name of the leading condition, whichever strategy produced it
    pub fn headline(&self) -> Option<&str> {
        match self {
            Assessment::Structured(result) => Some(result.primary_diagnosis.diagnosis_name.as_str()),
            Assessment::FreeText(text) => text.possible_conditions.first().map(|c| c.as_str()),
        }
    }
}

/// Orchestrator output handed by value to the HTTP response and the Persistence Gate.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisOutcome {
    pub assessment: Assessment,
    /// True when the assessment is the canned fallback rather than a model answer
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub stages: Vec<StageTrace>,
}

/// "human" sub-document of a consultation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanInput {
    pub symptoms: String,
    pub patient_age: Option<u8>,
    pub patient_gender: Option<String>,
}

impl From<&SymptomQuery> for HumanInput {
    fn from(query: &SymptomQuery) -> Self {
        Self {
            symptoms: query.symptoms().to_string(),
            patient_age: query.patient_age(),
            patient_gender: query.patient_gender().map(|g| g.to_string()),
        }
    }
}

/// Persisted consultation. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub human: HumanInput,
    pub ai: Assessment,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConsultationRecord {
    pub fn new(user_id: impl Into<String>, query: &SymptomQuery, ai: Assessment) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id: user_id.into(),
            human: HumanInput::from(query),
            ai,
            created_at: now,
            updated_at: now,
        }
    }
}
