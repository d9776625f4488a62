//! In-memory document store
use crate::{matches_filter, with_id, DocumentStore, StoreError, ID_FIELD};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex as TokioMutex;

/// Collections of documents kept in insertion order
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: TokioMutex<HashMap<String, Vec<Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn id_of(document: &Value) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, collection: &str, record: Value) -> Result<String, StoreError> {
        let (id, record) = with_id(record)?;
        let mut collections = self.collections.lock().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.iter().any(|d| id_of(d) == Some(id.as_str())) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id,
            });
        }
        documents.push(record);
        Ok(id)
    }

    async fn upsert(&self, collection: &str, id: &str, record: Value) -> Result<(), StoreError> {
        let mut record = record;
        if let Value::Object(map) = &mut record {
            map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        }
        let (_, record) = with_id(record)?;
        let mut collections = self.collections.lock().await;
        let documents = collections.entry(collection.to_string()).or_default();
        match documents.iter_mut().find(|d| id_of(d) == Some(id)) {
            Some(existing) => *existing = record,
            None => documents.push(record),
        }
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id)))
            .cloned())
    }

    async fn find_one(&self, collection: &str, filter: &Value) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.lock().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(None);
        };
        for document in documents {
            if matches_filter(document, filter)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }
}
