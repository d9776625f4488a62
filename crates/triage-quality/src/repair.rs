//! Validator/Repairer for parsed diagnoses
//!
//! Brings a key-complete candidate up to the shape callers rely on:
//! exactly `alternative_count` alternatives and at least `min_list_len`
//! entries per list field. Repair only pads or truncates; it never turns
//! a parsed candidate into a failure.

use super::profile::RepairProfile;
use serde::{Deserialize, Serialize};
use triage_core::{DiagnosisResult, FreeTextAssessment, SeverityLevel, SingleDiagnosis};
use triage_parse::{DiagnosisCandidate, ParsedSections};

/// Single check result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    /// Field already satisfied the profile
    Ok,
    /// Field was padded, truncated or defaulted
    Repaired,
    /// Below target but left as is
    Warn,
}

impl Check {
    fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}

/// What the repairer did to one result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Individual check results
    pub checks: Vec<Check>,
    /// Profile used for repair
    pub profile: String,
    pub summary: String,
}

impl RepairReport {
    fn from_checks(checks: Vec<Check>, profile: &str) -> Self {
        let names = |status: CheckStatus| {
            checks
                .iter()
                .filter(|c| c.status == status)
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
        };
        let repaired = names(CheckStatus::Repaired);
        let warned = names(CheckStatus::Warn);

        let summary = match (repaired.is_empty(), warned.is_empty()) {
            (true, true) => "All checks passed".to_string(),
            (false, true) => format!("Repaired: {}", repaired.join(", ")),
            (true, false) => format!("Passed with warnings: {}", warned.join(", ")),
            (false, false) => format!(
                "Repaired: {}; warnings: {}",
                repaired.join(", "),
                warned.join(", ")
            ),
        };

        Self {
            checks,
            profile: profile.to_string(),
            summary,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.checks.iter().all(|c| c.status == CheckStatus::Ok)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }
}

/// Repairer applying a [`RepairProfile`]
pub struct Repairer {
    profile: RepairProfile,
}

impl Repairer {
    pub fn new(profile: RepairProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &RepairProfile {
        &self.profile
    }

    /// Repair a structured candidate into a complete [`DiagnosisResult`]
    pub fn repair_structured(&self, candidate: DiagnosisCandidate) -> (DiagnosisResult, RepairReport) {
        let mut checks = Vec::new();
        let profile = &self.profile;

        // === Alternatives ===
        let mut alternatives = candidate.alternative_diagnoses;
        let found = alternatives.len();
        if found < profile.alternative_count {
            alternatives.resize(profile.alternative_count, profile.placeholder_alternative.clone());
            checks.push(Check::new(
                "alternative_diagnoses",
                CheckStatus::Repaired,
                format!("padded {} → {}", found, profile.alternative_count),
            ));
        } else if found > profile.alternative_count {
            alternatives.truncate(profile.alternative_count);
            checks.push(Check::new(
                "alternative_diagnoses",
                CheckStatus::Repaired,
                format!("truncated {} → {}", found, profile.alternative_count),
            ));
        } else {
            checks.push(Check::new(
                "alternative_diagnoses",
                CheckStatus::Ok,
                format!("{} entries", found),
            ));
        }

        // === Reasons ===
        checks.push(self.reasons_check("primary_diagnosis.reasons", &candidate.primary_diagnosis));
        for (i, alternative) in alternatives.iter().enumerate() {
            checks.push(self.reasons_check(&format!("alternative_diagnoses[{}].reasons", i), alternative));
        }

        // === Lists ===
        let general_advice = self.pad_list(
            "general_advice",
            candidate.general_advice,
            &profile.general_advice_defaults,
            &mut checks,
        );
        let related_symptoms = self.pad_list(
            "related_symptoms",
            candidate.related_symptoms,
            &profile.related_symptoms_defaults,
            &mut checks,
        );
        let recommended_actions = self.pad_list(
            "recommended_actions",
            candidate.recommended_actions,
            &profile.recommended_actions_defaults,
            &mut checks,
        );

        // === Severity ===
        let label = candidate.overall_severity_level.unwrap_or_default();
        let overall_severity_level = match SeverityLevel::from_label(&label) {
            Some(level) => {
                checks.push(Check::new("overall_severity_level", CheckStatus::Ok, level.as_str()));
                level
            }
            None => {
                tracing::warn!(label = %label, "unknown severity level, using default");
                checks.push(Check::new(
                    "overall_severity_level",
                    CheckStatus::Repaired,
                    format!("{:?} → {}", label, profile.default_severity),
                ));
                profile.default_severity
            }
        };

        let report = RepairReport::from_checks(checks, &profile.name);
        tracing::debug!(summary = %report.summary, "structured repair");

        (
            DiagnosisResult {
                primary_diagnosis: candidate.primary_diagnosis,
                alternative_diagnoses: alternatives,
                general_advice,
                overall_severity_level,
                related_symptoms,
                recommended_actions,
            },
            report,
        )
    }

    /// Fill empty free-text sections with placeholders and attach the disclaimer
    pub fn repair_free_text(&self, sections: ParsedSections) -> (FreeTextAssessment, RepairReport) {
        let mut checks = Vec::new();
        let ParsedSections {
            mut conditions,
            mut recommendations,
            severity,
        } = sections;

        if conditions.is_empty() {
            conditions.push(self.profile.unknown_condition.clone());
            checks.push(Check::new("possible_conditions", CheckStatus::Repaired, "placeholder"));
        } else {
            checks.push(Check::new(
                "possible_conditions",
                CheckStatus::Ok,
                format!("{} entries", conditions.len()),
            ));
        }

        if recommendations.is_empty() {
            recommendations.push(self.profile.consult_doctor.clone());
            checks.push(Check::new("recommendations", CheckStatus::Repaired, "placeholder"));
        } else {
            checks.push(Check::new(
                "recommendations",
                CheckStatus::Ok,
                format!("{} entries", recommendations.len()),
            ));
        }

        if severity.is_none() {
            checks.push(Check::new("severity", CheckStatus::Warn, "section absent"));
        }

        let report = RepairReport::from_checks(checks, &self.profile.name);
        tracing::debug!(summary = %report.summary, "free-text repair");

        (
            FreeTextAssessment {
                possible_conditions: conditions,
                recommendations,
                severity,
                disclaimer: self.profile.disclaimer.clone(),
            },
            report,
        )
    }

    /// Append the first `min - len` defaults; existing entries keep their order
    fn pad_list(
        &self,
        name: &str,
        mut items: Vec<String>,
        defaults: &[String],
        checks: &mut Vec<Check>,
    ) -> Vec<String> {
        let found = items.len();
        if found < self.profile.min_list_len {
            let missing = self.profile.min_list_len - found;
            items.extend(defaults.iter().take(missing).cloned());
            checks.push(Check::new(
                name,
                CheckStatus::Repaired,
                format!("padded {} → {}", found, items.len()),
            ));
        } else {
            checks.push(Check::new(name, CheckStatus::Ok, format!("{} entries", found)));
        }
        items
    }

    fn reasons_check(&self, name: &str, diagnosis: &SingleDiagnosis) -> Check {
        if diagnosis.reasons.len() < self.profile.min_reasons {
            Check::new(
                name,
                CheckStatus::Warn,
                format!(
                    "{} reasons (expected at least {})",
                    diagnosis.reasons.len(),
                    self.profile.min_reasons
                ),
            )
        } else {
            Check::new(name, CheckStatus::Ok, format!("{} reasons", diagnosis.reasons.len()))
        }
    }
}

impl Default for Repairer {
    fn default() -> Self {
        Self::new(RepairProfile::default())
    }
}
