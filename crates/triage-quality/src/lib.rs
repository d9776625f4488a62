//! Triage Quality: repair of parsed diagnoses and the fallback policy
//!
//! # Example
//!
//! ```
//! use triage_parse::parse_candidate;
//! use triage_quality::{decide, Attempt, Repairer};
//! use triage_core::Assessment;
//!
//! let raw = r#"{"primary_diagnosis": {"diagnosis_name": "Cảm cúm", "confidence_percentage": 80,
//!   "description": "Nhiễm virus", "reasons": ["Sốt", "Ho", "Mệt"]},
//!   "alternative_diagnoses": [], "general_advice": [], "overall_severity_level": "nhẹ",
//!   "related_symptoms": [], "recommended_actions": []}"#;
//!
//! let (result, report) = Repairer::default().repair_structured(parse_candidate(raw).unwrap());
//! assert_eq!(result.alternative_diagnoses.len(), 2);
//! println!("{}", report.summary);
//!
//! let decision = decide(Attempt::Parsed(Assessment::Structured(result)));
//! assert!(!decision.is_fallback());
//! ```

pub mod fallback;
pub mod profile;
pub mod repair;

pub use fallback::{decide, fallback_diagnosis, Attempt, Decision, FallbackReason, FALLBACK_DIAGNOSIS};
pub use profile::RepairProfile;
pub use repair::{Check, CheckStatus, RepairReport, Repairer};
