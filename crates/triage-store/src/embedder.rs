//! Text embedders
use crate::StoreError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use triage_core::config::EmbeddingSettings;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embedding for a search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, StoreError>;

    /// Embedding for a document being indexed
    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, StoreError>;
}

/// Cohere `v2/embed` client
pub struct CohereEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: EmbedVectors,
}

#[derive(Debug, Deserialize)]
struct EmbedVectors {
    #[serde(default)]
    float: Vec<Vec<f32>>,
}

impl CohereEmbedder {
    pub fn new(settings: &EmbeddingSettings, api_key: impl Into<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Remote(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/embed", settings.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: settings.model.clone(),
        })
    }

    /// `Ok(None)` when the API key variable is unset
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Option<Self>, StoreError> {
        match std::env::var(&settings.api_key_env).ok().filter(|k| !k.is_empty()) {
            Some(key) => Self::new(settings, key).map(Some),
            None => Ok(None),
        }
    }

    async fn embed(&self, text: &str, input_type: &str) -> Result<Vec<f32>, StoreError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "texts": [text],
                "model": self.model,
                "input_type": input_type,
                "embedding_types": ["float"],
            }))
            .send()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Remote(format!("embedding failed: {} - {}", status, body)));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Remote(format!("invalid embedding response: {}", e)))?;
        parsed
            .embeddings
            .float
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Remote("no embedding returned".to_string()))
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        self.embed(text, "search_query").await
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        self.embed(text, "search_document").await
    }
}

/// Deterministic bag-of-words embedder (feature hashing over blake3).
/// Used when no embedding provider is configured.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let slot = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize % self.dimension;
            let sign = if bytes[4] & 1 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        Ok(self.embed_text(text))
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        Ok(self.embed_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;

    #[test]
    fn test_hash_embedder_deterministic() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.embed_text("đau đầu, sốt"), embedder.embed_text("Đau đầu sốt"));
        assert_eq!(embedder.embed_text("x").len(), 256);
    }

    #[test]
    fn test_hash_embedder_similarity() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_text("giảm đau hạ sốt");
        let close = embedder.embed_text("thuốc giảm đau hạ sốt paracetamol");
        let far = embedder.embed_text("kem dưỡng da chống nắng");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }
}
