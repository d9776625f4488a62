//! Fallback policy
//!
//! Maps the outcome of one provider attempt to the assessment handed back
//! to the caller. Every failure path yields the same constant diagnosis.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use triage_core::{Assessment, DiagnosisResult, SeverityLevel, SingleDiagnosis, StageError};

/// The canned diagnosis returned whenever the model answer is unusable
pub static FALLBACK_DIAGNOSIS: Lazy<DiagnosisResult> = Lazy::new(|| DiagnosisResult {
    primary_diagnosis: SingleDiagnosis::new(
        "Cần thêm thông tin để chẩn đoán",
        60,
        "Cần thêm thông tin để đưa ra chẩn đoán chính xác",
        &["Triệu chứng chưa rõ", "Cần thêm thông tin", "Khuyến khích gặp bác sĩ"],
    ),
    alternative_diagnoses: vec![
        SingleDiagnosis::new(
            "Stress và căng thẳng",
            45,
            "Có thể liên quan đến stress",
            &["Triệu chứng phổ biến", "Do áp lực", "Cần điều chỉnh"],
        ),
        SingleDiagnosis::new(
            "Mệt mỏi thể chất",
            30,
            "Có thể do thiếu nghỉ ngơi",
            &["Thiếu ngủ", "Hoạt động quá mức", "Cần phục hồi"],
        ),
    ],
    general_advice: vec![
        "Theo dõi triệu chứng chi tiết".to_string(),
        "Nghỉ ngơi đầy đủ 7-8 tiếng/ngày".to_string(),
        "Gặp bác sĩ nếu không cải thiện".to_string(),
    ],
    overall_severity_level: SeverityLevel::Moderate,
    related_symptoms: vec![
        "Mệt mỏi".to_string(),
        "Khó chịu".to_string(),
        "Lo lắng".to_string(),
    ],
    recommended_actions: vec![
        "Lập lịch khám bác sĩ".to_string(),
        "Theo dõi triệu chứng".to_string(),
        "Nghỉ ngơi và tránh hoạt động nặng".to_string(),
    ],
});

pub fn fallback_diagnosis() -> DiagnosisResult {
    FALLBACK_DIAGNOSIS.clone()
}

/// Outcome of calling the provider and interpreting its answer
#[derive(Debug, Clone)]
pub enum Attempt {
    /// No client could be built (e.g. API key not set)
    ClientUnavailable,
    /// The call itself failed after any retries
    TransportFailed(String),
    /// The text came back but could not be interpreted
    Unparseable(StageError),
    /// Parsed and repaired
    Parsed(Assessment),
}

/// Why a fallback was returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    ClientUnavailable,
    Transport(String),
    Parse(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::ClientUnavailable => write!(f, "client unavailable"),
            FallbackReason::Transport(msg) => write!(f, "transport: {}", msg),
            FallbackReason::Parse(msg) => write!(f, "parse: {}", msg),
        }
    }
}

/// Result of the policy: a real answer or the fallback constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept(Assessment),
    Fallback {
        reason: FallbackReason,
        assessment: Assessment,
    },
}

impl Decision {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Decision::Fallback { .. })
    }

    pub fn assessment(&self) -> &Assessment {
        match self {
            Decision::Accept(assessment) => assessment,
            Decision::Fallback { assessment, .. } => assessment,
        }
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Decision::Accept(_) => None,
            Decision::Fallback { reason, .. } => Some(reason),
        }
    }

    /// (assessment, fallback flag, reason)
    pub fn into_parts(self) -> (Assessment, bool, Option<FallbackReason>) {
        match self {
            Decision::Accept(assessment) => (assessment, false, None),
            Decision::Fallback { reason, assessment } => (assessment, true, Some(reason)),
        }
    }
}

/// Pure policy: only a parsed answer is accepted
pub fn decide(attempt: Attempt) -> Decision {
    let reason = match attempt {
        Attempt::Parsed(assessment) => return Decision::Accept(assessment),
        Attempt::ClientUnavailable => FallbackReason::ClientUnavailable,
        Attempt::TransportFailed(msg) => FallbackReason::Transport(msg),
        Attempt::Unparseable(err) => FallbackReason::Parse(err.to_string()),
    };

    Decision::Fallback {
        reason,
        assessment: Assessment::Structured(fallback_diagnosis()),
    }
}
