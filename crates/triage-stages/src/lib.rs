//! Triage Stages: the request-level pipeline built on the lower crates.
//!
//! # Pipeline Flow
//!
//! ```text
//! SymptomQuery → Prompt → LLM → ParseStrategy → Fallback Policy → Persistence Gate
//!                  ↓        ↓          ↓                ↓                 ↓
//!              Rendered   Raw text  Assessment    DiagnosisOutcome   ConsultationRecord
//! ```
//!
//! The medicine recommender sits beside the pipeline and reads stored
//! consultations; it never takes part in a diagnosis call.

pub mod orchestrator;
pub mod persistence;
pub mod prompt;
pub mod recommend;
pub mod strategy;

pub use orchestrator::{DiagnosisOrchestrator, OrchestratorRegistry, FALLBACK_STAGE_ID};
pub use persistence::{PersistOutcome, PersistenceGate};
pub use prompt::{PromptBook, PromptsFile, RenderedPrompt};
pub use recommend::{
    MatchSource, MedicineRecommendation, MedicineRecommender, RecommendationRequest,
    RecommendationSet, ACTIVE_IN_STOCK_FILTER,
};
pub use strategy::{strategy_for, FreeTextStrategy, StructuredStrategy};
