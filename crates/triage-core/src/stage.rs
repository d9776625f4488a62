//! Parse Strategy: single contract for every provider response interpreter
use crate::data_model::Assessment;
use serde::{Deserialize, Serialize};

/// How a provider's raw text is turned into an [`Assessment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Labelled Vietnamese sections with bullet lists
    FreeText,
    /// Single JSON object with the six diagnosis keys
    Structured,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::FreeText => "free_text",
            StrategyKind::Structured => "structured",
        }
    }
}

/// Contract of a parse strategy
pub trait ParseStrategy: Send + Sync {
    /// Unique id (e.g. "parse.structured.v1")
    fn id(&self) -> &'static str;

    fn kind(&self) -> StrategyKind;

    /// Cleans, parses and repairs the raw model text.
    ///
    /// An `Err` means the text is unusable and the caller must fall back.
    fn interpret(&self, raw: &str) -> Result<Assessment, StageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// Text is not valid JSON (or nothing was left after cleaning)
    Syntax(String),
    /// A required top-level key is absent
    MissingField(String),
    /// Keys are present but a value has the wrong shape
    Malformed(String),
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "PARSE/SYNTAX: {}", msg),
            Self::MissingField(field) => write!(f, "PARSE/MISSING: {}", field),
            Self::Malformed(msg) => write!(f, "PARSE/MALFORMED: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}

impl From<StageError> for crate::error::TriageError {
    fn from(err: StageError) -> Self {
        crate::error::TriageError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display() {
        assert_eq!(
            StageError::MissingField("general_advice".into()).to_string(),
            "PARSE/MISSING: general_advice"
        );
        assert!(StageError::Syntax("eof".into()).to_string().starts_with("PARSE/SYNTAX"));
    }

    #[test]
    fn test_strategy_kind_serde() {
        let kind: StrategyKind = serde_json::from_str("\"free_text\"").unwrap();
        assert_eq!(kind, StrategyKind::FreeText);
        assert_eq!(serde_json::to_string(&StrategyKind::Structured).unwrap(), "\"structured\"");
    }
}
