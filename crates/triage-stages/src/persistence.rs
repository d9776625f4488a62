//! Persistence Gate: decides whether a diagnosis becomes a consultation record.
//!
//! Fallback results are never written. Storage failures are logged and
//! reported as [`PersistOutcome::Failed`]; they never fail the diagnosis.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use triage_core::{ConsultationRecord, DiagnosisOutcome, SymptomQuery, TriageError};
use triage_store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PersistOutcome {
    /// Fallback diagnosis, nothing written
    Skipped,
    /// Written under this id
    Stored(String),
    /// Write attempted and failed
    Failed(String),
}

impl PersistOutcome {
    pub fn consultation_id(&self) -> Option<&str> {
        match self {
            PersistOutcome::Stored(id) => Some(id),
            PersistOutcome::Skipped | PersistOutcome::Failed(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PersistOutcome::Skipped => "skipped",
            PersistOutcome::Stored(_) => "stored",
            PersistOutcome::Failed(_) => "failed",
        }
    }
}

pub struct PersistenceGate {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl PersistenceGate {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn persist(
        &self,
        outcome: &DiagnosisOutcome,
        query: &SymptomQuery,
        user_id: &str,
    ) -> PersistOutcome {
        if outcome.is_fallback {
            info!(user_id, "fallback diagnosis, consultation not saved");
            return PersistOutcome::Skipped;
        }

        let record = ConsultationRecord::new(user_id, query, outcome.assessment.clone());
        let document = match serde_json::to_value(&record) {
            Ok(document) => document,
            Err(e) => {
                error!(user_id, "failed to encode consultation: {}", e);
                return PersistOutcome::Failed(e.to_string());
            }
        };

        match self.store.insert(&self.collection, document).await {
            Ok(id) => {
                info!(user_id, consultation_id = %id, collection = %self.collection, "consultation saved");
                PersistOutcome::Stored(id)
            }
            Err(e) => {
                error!(user_id, collection = %self.collection, "failed to save consultation: {}", e);
                PersistOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn find_consultation(&self, id: &str) -> Result<ConsultationRecord, TriageError> {
        let document = self
            .store
            .find_by_id(&self.collection, id)
            .await?
            .ok_or_else(|| TriageError::NotFound(format!("Không tìm thấy consultation với ID {}", id)))?;

        serde_json::from_value(document)
            .map_err(|e| TriageError::Storage(format!("corrupt consultation {}: {}", id, e)))
    }
}
