//! Triage Store: storage collaborators
//!
//! - [`DocumentStore`]: schemaless JSON documents grouped in collections
//!   (SQLite or in-memory)
//! - [`VectorIndex`]: similarity search over embeddings (Milvus REST or
//!   in-memory cosine)
//! - [`Embedder`]: text to vector (Cohere HTTP API or local hashing)

pub mod document;
pub mod embedder;
pub mod milvus;
pub mod sqlite;
pub mod vector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use document::InMemoryDocumentStore;
pub use embedder::{CohereEmbedder, Embedder, HashEmbedder};
pub use milvus::MilvusIndex;
pub use sqlite::SqliteDocumentStore;
pub use vector::{FilterExpr, InMemoryVectorIndex};

/// Field holding a document's identifier
pub const ID_FIELD: &str = "_id";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("STORE/DUPLICATE: {collection}/{id}")]
    Duplicate { collection: String, id: String },

    #[error("STORE/INVALID: {0}")]
    Invalid(String),

    #[error("STORE/BACKEND: {0}")]
    Backend(String),

    #[error("STORE/REMOTE: {0}")]
    Remote(String),

    #[error("STORE/FILTER: {0}")]
    Filter(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Invalid(err.to_string())
    }
}

impl From<StoreError> for triage_core::TriageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(msg) | StoreError::Filter(msg) => {
                triage_core::TriageError::invalid(msg)
            }
            StoreError::Remote(msg) => triage_core::TriageError::Unavailable(msg),
            other => triage_core::TriageError::Storage(other.to_string()),
        }
    }
}

/// Document database collaborator
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a JSON object; returns its id (`_id` if supplied, otherwise generated)
    async fn insert(&self, collection: &str, record: Value) -> Result<String, StoreError>;

    /// Insert or replace the document with the given id
    async fn upsert(&self, collection: &str, id: &str, record: Value) -> Result<(), StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// First document (in insertion order) whose fields equal every entry of `filter`.
    /// Keys may be dotted paths (`human.symptoms`).
    async fn find_one(&self, collection: &str, filter: &Value) -> Result<Option<Value>, StoreError>;
}

/// One similarity search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
    pub metadata: Value,
}

/// Vector database collaborator
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Best matches first. `filter` uses the `field == value and ...` expression syntax.
    async fn search(
        &self,
        embedding: &[f32],
        filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<VectorHit>, StoreError>;

    async fn upsert(&self, id: &str, embedding: Vec<f32>, metadata: Value) -> Result<(), StoreError>;
}

/// Prepare a record for storage: must be an object; `_id` is filled in if absent
pub(crate) fn with_id(record: Value) -> Result<(String, Value), StoreError> {
    let mut object = match record {
        Value::Object(map) => map,
        other => {
            return Err(StoreError::Invalid(format!(
                "documents must be JSON objects, got {}",
                type_name(&other)
            )))
        }
    };
    let id = match object.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Null) | None => {
            let id = uuid::Uuid::new_v4().simple().to_string();
            object.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            id
        }
        Some(other) => {
            return Err(StoreError::Invalid(format!(
                "{} must be a non-empty string, got {}",
                ID_FIELD, other
            )))
        }
    };
    Ok((id, Value::Object(object)))
}

/// Equality match on every (possibly dotted) key of `filter`
pub(crate) fn matches_filter(document: &Value, filter: &Value) -> Result<bool, StoreError> {
    let conditions = filter
        .as_object()
        .ok_or_else(|| StoreError::Filter("filter must be a JSON object".to_string()))?;
    Ok(conditions.iter().all(|(path, expected)| {
        path.split('.')
            .try_fold(document, |node, key| node.get(key))
            .map(|actual| actual == expected)
            .unwrap_or(false)
    }))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
