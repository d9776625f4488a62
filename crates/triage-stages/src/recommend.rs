//! Medicine recommendation by vector search
//!
//! The primary diagnosis, the symptoms and up to two alternative diagnoses
//! are each embedded and searched separately. Hits are merged per medicine:
//!
//! ```text
//! score = Σ similarity × weight            (0.5 diagnosis, 0.3 symptoms, 0.1 alternative)
//!       × 1.2  if found by more than one query
//!       × 1.1  if severity is severe or worse and rating ≥ 4
//!       capped at 1.0
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use triage_core::{Assessment, ConsultationRecord, SeverityLevel, TriageError, MAX_PATIENT_AGE};
use triage_store::{DocumentStore, Embedder, VectorHit, VectorIndex, ID_FIELD};

/// Only sellable medicines are recommended
pub const ACTIVE_IN_STOCK_FILTER: &str = "is_active == true and stock_status == 'IN-STOCK'";

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

const DIAGNOSIS_WEIGHT: f32 = 0.5;
const SYMPTOMS_WEIGHT: f32 = 0.3;
const ALTERNATIVE_WEIGHT: f32 = 0.1;
const MAX_ALTERNATIVE_QUERIES: usize = 2;
const MULTI_MATCH_BONUS: f32 = 1.2;
const RATING_BONUS: f32 = 1.1;
const MIN_BONUS_RATING: f64 = 4.0;

/// Which query found a medicine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Diagnosis,
    Symptoms,
    AlternativeDiagnosis,
}

impl MatchSource {
    fn weight(self) -> f32 {
        match self {
            MatchSource::Diagnosis => DIAGNOSIS_WEIGHT,
            MatchSource::Symptoms => SYMPTOMS_WEIGHT,
            MatchSource::AlternativeDiagnosis => ALTERNATIVE_WEIGHT,
        }
    }

    fn reason(self) -> &'static str {
        match self {
            MatchSource::Diagnosis => "phù hợp với chẩn đoán chính",
            MatchSource::Symptoms => "có thể điều trị các triệu chứng",
            MatchSource::AlternativeDiagnosis => "phù hợp với chẩn đoán thay thế",
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub primary_diagnosis: String,
    pub symptoms: String,
    #[serde(default)]
    pub alternative_diagnoses: Vec<String>,
    #[serde(default)]
    pub severity_level: Option<String>,
    #[serde(default)]
    pub patient_age: Option<i64>,
    #[serde(default)]
    pub patient_gender: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl RecommendationRequest {
    /// Every problem is reported, not just the first
    pub fn validate(&self) -> Result<(), TriageError> {
        let mut errors = Vec::new();
        if self.primary_diagnosis.trim().is_empty() {
            errors.push("Chẩn đoán chính không được để trống".to_string());
        }
        if self.symptoms.trim().is_empty() {
            errors.push("Triệu chứng không được để trống".to_string());
        }
        if let Some(age) = self.patient_age {
            if !(0..=MAX_PATIENT_AGE).contains(&age) {
                errors.push(format!("Tuổi phải từ 0 đến {}", MAX_PATIENT_AGE));
            }
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            errors.push(format!("Số lượng đề xuất phải từ 1 đến {}", MAX_LIMIT));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TriageError::InvalidInput(errors))
        }
    }

    /// Inputs taken from a stored consultation
    pub fn from_consultation(record: &ConsultationRecord) -> Self {
        let (primary_diagnosis, alternative_diagnoses, severity_level) = match &record.ai {
            Assessment::Structured(result) => (
                result.primary_diagnosis.diagnosis_name.clone(),
                result
                    .alternative_diagnoses
                    .iter()
                    .map(|d| d.diagnosis_name.clone())
                    .collect::<Vec<_>>(),
                Some(result.overall_severity_level.as_str().to_string()),
            ),
            Assessment::FreeText(text) => {
                let mut names = text.possible_conditions.iter().map(|c| condition_name(c));
                let primary = names.next().unwrap_or_default();
                (primary, names.collect(), text.severity.clone())
            }
        };

        Self {
            primary_diagnosis,
            symptoms: record.human.symptoms.clone(),
            alternative_diagnoses,
            severity_level,
            patient_age: record.human.patient_age.filter(|a| *a > 0).map(i64::from),
            patient_gender: record.human.patient_gender.clone(),
            limit: DEFAULT_LIMIT,
        }
    }

    fn is_high_severity(&self) -> bool {
        self.severity_level
            .as_deref()
            .and_then(SeverityLevel::from_label)
            .map(|level| level.is_at_least(SeverityLevel::Severe))
            .unwrap_or(false)
    }

    fn queries(&self) -> Vec<(MatchSource, &str)> {
        let mut queries = vec![
            (MatchSource::Diagnosis, self.primary_diagnosis.trim()),
            (MatchSource::Symptoms, self.symptoms.trim()),
        ];
        queries.extend(
            self.alternative_diagnoses
                .iter()
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .take(MAX_ALTERNATIVE_QUERIES)
                .map(|d| (MatchSource::AlternativeDiagnosis, d)),
        );
        queries
    }

    fn search_query(&self) -> String {
        format!("{} - {}", self.primary_diagnosis.trim(), self.symptoms.trim())
    }

    fn diagnosis_context(&self) -> String {
        let mut context = format!("Chẩn đoán: {}", self.primary_diagnosis.trim());
        if !self.alternative_diagnoses.is_empty() {
            context.push_str(" | Chẩn đoán thay thế: ");
            context.push_str(&self.alternative_diagnoses.join(", "));
        }
        context
    }
}

/// "Cảm cúm: do virus" → "Cảm cúm"
fn condition_name(condition: &str) -> String {
    condition
        .split(':')
        .next()
        .unwrap_or(condition)
        .trim()
        .to_string()
}

/// One vector hit tagged with the query that produced it
#[derive(Debug, Clone)]
pub struct SourcedHit {
    pub source: MatchSource,
    pub hit: VectorHit,
}

/// Merged score for one medicine
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMedicine {
    pub medicine_id: String,
    pub score: f32,
    pub sources: Vec<MatchSource>,
    pub metadata: Value,
}

fn medicine_id(hit: &VectorHit) -> String {
    hit.metadata
        .get("medicine_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| hit.id.clone())
}

/// Merge hits per medicine and order by descending score
pub fn rank_hits(hits: Vec<SourcedHit>, high_severity: bool, limit: usize) -> Vec<RankedMedicine> {
    let mut ranked: Vec<(RankedMedicine, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for SourcedHit { source, hit } in hits {
        let id = medicine_id(&hit);
        let weighted = hit.score * source.weight();
        match positions.get(&id) {
            Some(&pos) => {
                let (entry, count) = &mut ranked[pos];
                entry.score += weighted;
                entry.sources.push(source);
                *count += 1;
            }
            None => {
                positions.insert(id.clone(), ranked.len());
                ranked.push((
                    RankedMedicine {
                        medicine_id: id,
                        score: weighted,
                        sources: vec![source],
                        metadata: hit.metadata,
                    },
                    1,
                ));
            }
        }
    }

    let mut ranked: Vec<RankedMedicine> = ranked
        .into_iter()
        .map(|(mut entry, count)| {
            if count > 1 {
                entry.score *= MULTI_MATCH_BONUS;
            }
            if high_severity {
                let rating = entry.metadata.get("rating").and_then(Value::as_f64).unwrap_or(0.0);
                if rating >= MIN_BONUS_RATING {
                    entry.score *= RATING_BONUS;
                }
            }
            entry.score = entry.score.min(1.0);
            entry
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

/// Human-readable reason, e.g. "Paracetamol phù hợp với chẩn đoán chính và có độ tương đồng cao."
pub fn recommendation_reason(name: &str, sources: &[MatchSource], score: f32) -> String {
    let mut reasons: Vec<&str> = Vec::new();
    for source in [
        MatchSource::Diagnosis,
        MatchSource::Symptoms,
        MatchSource::AlternativeDiagnosis,
    ] {
        if sources.contains(&source) {
            reasons.push(source.reason());
        }
    }

    if score >= 0.8 {
        reasons.push("có độ tương đồng cao");
    } else if score >= 0.6 {
        reasons.push("có độ tương đồng tốt");
    }

    if reasons.is_empty() {
        reasons.push("được đề xuất dựa trên phân tích AI");
    }

    format!("{} {}.", name, reasons.join(" và "))
}

#[derive(Debug, Clone, Serialize)]
pub struct MedicineRecommendation {
    pub medicine: Value,
    pub similarity_score: f32,
    pub match_sources: Vec<MatchSource>,
    pub recommendation_reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationSet {
    pub recommendations: Vec<MedicineRecommendation>,
    pub total_found: usize,
    pub search_query: String,
    pub diagnosis_context: String,
}

pub struct MedicineRecommender {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl MedicineRecommender {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            collection: collection.into(),
        }
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationSet, TriageError> {
        request.validate()?;

        let mut hits = Vec::new();
        for (source, text) in request.queries() {
            let embedding = self.embedder.embed_query(text).await?;
            let found = self
                .index
                .search(&embedding, Some(ACTIVE_IN_STOCK_FILTER), request.limit * 2)
                .await?;
            debug!(?source, hits = found.len(), "medicine search");
            hits.extend(found.into_iter().map(|hit| SourcedHit { source, hit }));
        }

        let ranked = rank_hits(hits, request.is_high_severity(), request.limit);
        let mut recommendations = Vec::with_capacity(ranked.len());
        for entry in ranked {
            let medicine = self.medicine_details(&entry).await;
            let name = medicine
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(&entry.medicine_id)
                .to_string();
            recommendations.push(MedicineRecommendation {
                recommendation_reason: recommendation_reason(&name, &entry.sources, entry.score),
                medicine,
                similarity_score: entry.score,
                match_sources: entry.sources,
            });
        }

        info!(
            primary = %request.primary_diagnosis,
            found = recommendations.len(),
            "medicine recommendations ready"
        );

        Ok(RecommendationSet {
            total_found: recommendations.len(),
            recommendations,
            search_query: request.search_query(),
            diagnosis_context: request.diagnosis_context(),
        })
    }

    pub async fn recommend_for_consultation(
        &self,
        record: &ConsultationRecord,
    ) -> Result<RecommendationSet, TriageError> {
        self.recommend(&RecommendationRequest::from_consultation(record)).await
    }

    /// Full document from the store, or basic details from the vector metadata
    async fn medicine_details(&self, entry: &RankedMedicine) -> Value {
        match self.store.find_by_id(&self.collection, &entry.medicine_id).await {
            Ok(Some(document)) => return document,
            Ok(None) => warn!(medicine_id = %entry.medicine_id, "medicine not in store, using index metadata"),
            Err(e) => warn!(medicine_id = %entry.medicine_id, "medicine lookup failed: {}", e),
        }
        basic_details(&entry.medicine_id, &entry.metadata)
    }

    /// Store a medicine document and index its text. Returns the medicine id.
    pub async fn index_medicine(&self, document: Value) -> Result<String, TriageError> {
        let fields = match &document {
            Value::Object(map) => map,
            _ => return Err(TriageError::invalid("Dữ liệu thuốc phải là một đối tượng JSON")),
        };

        let mut errors = Vec::new();
        let id = [ID_FIELD, "id"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .filter(|id| !id.trim().is_empty())
            .map(|id| id.trim().to_string());
        if id.is_none() {
            errors.push("Mã thuốc không được để trống".to_string());
        }
        let name = text_field(fields, "name");
        if name.is_empty() {
            errors.push("Tên thuốc không được để trống".to_string());
        }
        let id = match id {
            Some(id) if errors.is_empty() => id,
            _ => return Err(TriageError::InvalidInput(errors)),
        };

        let text = ["name", "description", "usage", "ingredients", "therapeutic_uses"]
            .iter()
            .map(|key| text_field(fields, key))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(". ");
        let metadata = index_metadata(&id, fields);

        let embedding = self.embedder.embed_document(&text).await?;
        self.store.upsert(&self.collection, &id, document).await?;
        self.index.upsert(&id, embedding, metadata).await?;

        info!(medicine_id = %id, name = %name, "medicine indexed");
        Ok(id)
    }
}

/// String field, or array of strings joined with ", "
fn text_field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

fn index_metadata(id: &str, fields: &Map<String, Value>) -> Value {
    let get = |key: &str, default: Value| fields.get(key).cloned().unwrap_or(default);
    json!({
        "medicine_id": id,
        "name": text_field(fields, "name"),
        "slug": get("slug", json!("")),
        "stock_status": get("stock_status", json!("UNKNOWN")),
        "is_active": get("is_active", json!(true)),
        "rating": get("rating", json!(0.0)),
        "price": get("price", json!(0)),
        "active_ingredient": text_field(fields, "ingredients"),
        "therapeutic_uses": text_field(fields, "usage"),
    })
}

fn basic_details(medicine_id: &str, metadata: &Value) -> Value {
    let get = |key: &str, default: Value| metadata.get(key).cloned().unwrap_or(default);
    let short_id: String = medicine_id.chars().take(8).collect();
    let usage: Vec<String> = metadata
        .get("therapeutic_uses")
        .and_then(Value::as_str)
        .map(|uses| {
            uses.split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let ingredients = metadata
        .get("active_ingredient")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("Không có thông tin");

    json!({
        "id": medicine_id,
        "name": metadata
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Thuốc {}...", short_id)),
        "slug": get("slug", json!("")),
        "description": "Thông tin chi tiết không có sẵn",
        "price": get("price", json!(0)),
        "stock_status": get("stock_status", json!("UNKNOWN")),
        "rating": get("rating", json!(0.0)),
        "ingredients": ingredients,
        "usage": usage,
        "dosage": {"adult": "Theo chỉ định bác sĩ", "child": "Theo chỉ định bác sĩ"},
        "directions": ["Sử dụng theo chỉ định của bác sĩ"],
        "precautions": ["Tham khảo ý kiến bác sĩ trước khi sử dụng"],
        "is_active": get("is_active", json!(true)),
    })
}
