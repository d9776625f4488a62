//! In-memory vector index and filter expressions
//!
//! Filters use the subset of the Milvus boolean expression syntax the
//! service needs: equality terms joined by `and`, e.g.
//! `is_active == true and stock_status == 'IN-STOCK'`.

use crate::{StoreError, VectorHit, VectorIndex};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// Parsed `field == literal (and field == literal)*` expression
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    terms: Vec<(String, Value)>,
}

impl FilterExpr {
    pub fn parse(expr: &str) -> Result<Self, StoreError> {
        let mut terms = Vec::new();
        for clause in expr.split(" and ") {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }
            let (field, literal) = clause
                .split_once("==")
                .ok_or_else(|| StoreError::Filter(format!("expected '==' in: {}", clause)))?;
            let field = field.trim();
            if field.is_empty() || !field.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(StoreError::Filter(format!("invalid field name: {:?}", field)));
            }
            terms.push((field.to_string(), parse_literal(literal.trim())?));
        }
        Ok(Self { terms })
    }

    pub fn matches(&self, metadata: &Value) -> bool {
        self.terms.iter().all(|(field, expected)| match metadata.get(field) {
            Some(Value::Number(actual)) => expected
                .as_f64()
                .zip(actual.as_f64())
                .map(|(e, a)| (e - a).abs() < f64::EPSILON)
                .unwrap_or(false),
            Some(actual) => actual == expected,
            None => false,
        })
    }
}

fn parse_literal(literal: &str) -> Result<Value, StoreError> {
    match literal {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }
    for quote in ['\'', '"'] {
        if literal.len() >= 2 && literal.starts_with(quote) && literal.ends_with(quote) {
            return Ok(Value::String(literal[1..literal.len() - 1].to_string()));
        }
    }
    literal
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| StoreError::Filter(format!("unsupported literal: {}", literal)))
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

struct Entry {
    id: String,
    embedding: Vec<f32>,
    metadata: Value,
}

/// Brute-force cosine index for tests and single-node deployments
#[derive(Default)]
pub struct InMemoryVectorIndex {
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn search(
        &self,
        embedding: &[f32],
        filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<VectorHit>, StoreError> {
        let filter = filter.map(FilterExpr::parse).transpose()?;
        let entries = self.entries.read().await;

        let mut hits: Vec<VectorHit> = entries
            .iter()
            .filter(|e| filter.as_ref().map(|f| f.matches(&e.metadata)).unwrap_or(true))
            .map(|e| VectorHit {
                id: e.id.clone(),
                score: cosine_similarity(embedding, &e.embedding),
                metadata: e.metadata.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn upsert(&self, id: &str, embedding: Vec<f32>, metadata: Value) -> Result<(), StoreError> {
        if embedding.is_empty() {
            return Err(StoreError::Invalid("empty embedding".to_string()));
        }
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.embedding = embedding;
                entry.metadata = metadata;
            }
            None => entries.push(Entry {
                id: id.to_string(),
                embedding,
                metadata,
            }),
        }
        Ok(())
    }
}
