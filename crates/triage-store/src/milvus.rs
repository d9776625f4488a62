//! Milvus / Zilliz Cloud vector index over the REST v2 API
use crate::{StoreError, VectorHit, VectorIndex};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, error};
use triage_core::config::VectorSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MilvusIndex {
    client: reqwest::Client,
    base_url: String,
    token: String,
    collection: String,
    anns_field: String,
}

#[derive(Debug, Deserialize)]
struct MilvusResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

impl MilvusIndex {
    pub fn new(settings: &VectorSettings, token: impl Into<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Remote(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: settings.uri.trim_end_matches('/').to_string(),
            token: token.into(),
            collection: settings.collection.clone(),
            anns_field: settings.anns_field.clone(),
        })
    }

    /// `Ok(None)` when the token variable is unset
    pub fn from_settings(settings: &VectorSettings) -> Result<Option<Self>, StoreError> {
        match std::env::var(&settings.token_env).ok().filter(|t| !t.is_empty()) {
            Some(token) => Self::new(settings, token).map(Some),
            None => Ok(None),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(%url, %status, "vector index request failed");
            return Err(StoreError::Remote(format!("{} - {}", status, text)));
        }

        let parsed: MilvusResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Remote(format!("invalid response: {}", e)))?;
        if parsed.code != 0 {
            return Err(StoreError::Remote(format!(
                "code {}: {}",
                parsed.code,
                parsed.message.unwrap_or_default()
            )));
        }
        Ok(parsed.data)
    }
}

/// Split a search row into (id, score, remaining fields)
fn hit_from_row(row: Value) -> Option<VectorHit> {
    let mut fields: Map<String, Value> = match row {
        Value::Object(map) => map,
        _ => return None,
    };
    let id = match fields.remove("id")? {
        Value::String(s) => s,
        other => other.to_string(),
    };
    let score = fields.remove("distance").and_then(|d| d.as_f64()).unwrap_or(0.0) as f32;
    Some(VectorHit {
        id,
        score,
        metadata: Value::Object(fields),
    })
}

#[async_trait]
impl VectorIndex for MilvusIndex {
    async fn search(
        &self,
        embedding: &[f32],
        filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<VectorHit>, StoreError> {
        let mut body = json!({
            "collectionName": self.collection,
            "data": [embedding],
            "annsField": self.anns_field,
            "limit": limit,
            "outputFields": ["*"],
            "searchParams": {"metricType": "COSINE", "params": {"nprobe": 10}},
        });
        if let Some(filter) = filter {
            body["filter"] = Value::String(filter.to_string());
        }

        let data = self.post("/v2/vectordb/entities/search", body).await?;
        let hits: Vec<VectorHit> = match data {
            Value::Array(rows) => rows.into_iter().filter_map(hit_from_row).collect(),
            _ => Vec::new(),
        };
        debug!(collection = %self.collection, hits = hits.len(), "vector search");
        Ok(hits)
    }

    async fn upsert(&self, id: &str, embedding: Vec<f32>, metadata: Value) -> Result<(), StoreError> {
        let mut row = match metadata {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(StoreError::Invalid("metadata must be a JSON object".to_string())),
        };
        row.insert("id".to_string(), Value::String(id.to_string()));
        row.insert(self.anns_field.clone(), json!(embedding));

        self.post(
            "/v2/vectordb/entities/upsert",
            json!({"collectionName": self.collection, "data": [row]}),
        )
        .await?;
        Ok(())
    }
}
