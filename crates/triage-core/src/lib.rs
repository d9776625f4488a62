//! Triage Core: data model, error model, strategy contract and stage tracing
//!
//! Shared vocabulary for every crate in the workspace. Nothing in here talks
//! to the network or to storage.

pub mod config;
pub mod context;
pub mod data_model;
pub mod error;
pub mod runner;
pub mod stage;

pub use config::{ProviderSettings, Settings};
pub use context::RequestContext;
pub use data_model::{
    Assessment, ConsultationRecord, DiagnosisOutcome, DiagnosisResult, FreeTextAssessment,
    HumanInput, SeverityLevel, SingleDiagnosis, SymptomQuery,
};
pub use error::{ErrorKind, TriageError};
pub use runner::{StageTimer, StageTrace};
pub use stage::{ParseStrategy, StageError, StrategyKind};

/// Service version reported by the health endpoints
pub const TRIAGE_VERSION: &str = "1.0.0";

/// Maximum accepted patient age (inclusive)
pub const MAX_PATIENT_AGE: i64 = 150;
