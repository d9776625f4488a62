//! Shared application state, assembled once from [`Settings`].
use crate::error::ApiError;
use crate::metrics::Metrics;
use std::sync::Arc;
use tracing::{info, warn};
use triage_core::{Settings, TriageError};
use triage_stages::{MedicineRecommender, OrchestratorRegistry, PersistenceGate, PromptBook};
use triage_store::{
    CohereEmbedder, DocumentStore, Embedder, HashEmbedder, InMemoryDocumentStore,
    InMemoryVectorIndex, MilvusIndex, SqliteDocumentStore, VectorIndex,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<OrchestratorRegistry>,
    pub gate: Arc<PersistenceGate>,
    pub recommender: Arc<MedicineRecommender>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        settings: Arc<Settings>,
        registry: OrchestratorRegistry,
        gate: PersistenceGate,
        recommender: MedicineRecommender,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            settings,
            registry: Arc::new(registry),
            gate: Arc::new(gate),
            recommender: Arc::new(recommender),
            metrics: Metrics::new()?,
        })
    }

    /// Wire every collaborator from configuration. Optional remote services
    /// (embedding API, Milvus) fall back to local implementations when their
    /// credentials are absent.
    pub fn from_settings(settings: Arc<Settings>) -> Result<Self, ApiError> {
        let prompts = Arc::new(PromptBook::load(settings.prompts_path.as_deref())?);
        info!(version = %prompts.version(), "prompt templates loaded");
        let registry = OrchestratorRegistry::from_settings(&settings, prompts)?;

        let store: Arc<dyn DocumentStore> = match &settings.storage.sqlite_path {
            Some(path) => {
                info!(path = %path, "using sqlite document store");
                Arc::new(SqliteDocumentStore::open(path).map_err(TriageError::from)?)
            }
            None => {
                warn!("no sqlite_path configured, documents are kept in memory");
                Arc::new(InMemoryDocumentStore::new())
            }
        };

        let cohere = match &settings.embedding {
            Some(embedding) => CohereEmbedder::from_settings(embedding).map_err(TriageError::from)?,
            None => None,
        };
        let embedder: Arc<dyn Embedder> = match cohere {
            Some(cohere) => Arc::new(cohere),
            None => {
                warn!("embedding API not configured, using local hash embedder");
                Arc::new(HashEmbedder::default())
            }
        };

        let milvus = match &settings.vector {
            Some(vector) => MilvusIndex::from_settings(vector).map_err(TriageError::from)?,
            None => None,
        };
        let index: Arc<dyn VectorIndex> = match milvus {
            Some(milvus) => Arc::new(milvus),
            None => {
                warn!("vector database not configured, using in-memory index");
                Arc::new(InMemoryVectorIndex::new())
            }
        };

        let gate = PersistenceGate::new(
            Arc::clone(&store),
            settings.storage.consultation_collection.clone(),
        );
        let recommender = MedicineRecommender::new(
            embedder,
            index,
            store,
            settings.storage.medicine_collection.clone(),
        );

        Self::new(settings, registry, gate, recommender)
    }

    pub fn locale(&self) -> &str {
        &self.settings.server.locale
    }
}
