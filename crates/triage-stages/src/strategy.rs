//! Parse strategies: raw model text → repaired [`Assessment`]
use std::sync::Arc;
use tracing::{debug, info};
use triage_core::{Assessment, ParseStrategy, StageError, StrategyKind};
use triage_parse::{parse_candidate, parse_sections};
use triage_quality::{RepairReport, Repairer};

/// JSON object with the six diagnosis keys
pub struct StructuredStrategy {
    repairer: Repairer,
}

impl StructuredStrategy {
    pub fn new(repairer: Repairer) -> Self {
        Self { repairer }
    }
}

impl Default for StructuredStrategy {
    fn default() -> Self {
        Self::new(Repairer::default())
    }
}

impl ParseStrategy for StructuredStrategy {
    fn id(&self) -> &'static str {
        "parse.structured.v1"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Structured
    }

    fn interpret(&self, raw: &str) -> Result<Assessment, StageError> {
        let candidate = parse_candidate(raw)?;
        let (result, report) = self.repairer.repair_structured(candidate);

        log_report(self.id(), &report);
        debug!(
            primary = %result.primary_diagnosis.diagnosis_name,
            alternatives = result.alternative_diagnoses.len(),
            advice = result.general_advice.len(),
            related = result.related_symptoms.len(),
            actions = result.recommended_actions.len(),
            severity = %result.overall_severity_level,
            "structured result"
        );

        Ok(Assessment::Structured(result))
    }
}

/// Labelled sections with bullet lists. Never fails: empty sections
/// are filled with placeholders.
pub struct FreeTextStrategy {
    repairer: Repairer,
}

impl FreeTextStrategy {
    pub fn new(repairer: Repairer) -> Self {
        Self { repairer }
    }
}

impl Default for FreeTextStrategy {
    fn default() -> Self {
        Self::new(Repairer::default())
    }
}

impl ParseStrategy for FreeTextStrategy {
    fn id(&self) -> &'static str {
        "parse.free_text.v1"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::FreeText
    }

    fn interpret(&self, raw: &str) -> Result<Assessment, StageError> {
        let sections = parse_sections(raw);
        let (assessment, report) = self.repairer.repair_free_text(sections);

        log_report(self.id(), &report);
        Ok(Assessment::FreeText(assessment))
    }
}

fn log_report(strategy: &str, report: &RepairReport) {
    if report.is_clean() {
        debug!(strategy, profile = %report.profile, "{}", report.summary);
    } else {
        info!(strategy, profile = %report.profile, "{}", report.summary);
    }
}

/// Strategy for a configured provider
pub fn strategy_for(kind: StrategyKind) -> Arc<dyn ParseStrategy> {
    match kind {
        StrategyKind::Structured => Arc::new(StructuredStrategy::default()),
        StrategyKind::FreeText => Arc::new(FreeTextStrategy::default()),
    }
}
