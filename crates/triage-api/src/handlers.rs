//! Request handlers. Each returns an [`Envelope`] or an [`ApiError`].
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::input::SymptomInput;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::CONTENT_TYPE, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::info;
use triage_core::runner::pipeline_id;
use triage_core::{
    Assessment, ConsultationRecord, RequestContext, StageTrace, TriageError, TRIAGE_VERSION,
};
use triage_stages::{RecommendationRequest, RecommendationSet};

const SERVICE_NAME: &str = "pharmacy-ai-triage";

#[derive(Debug, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub strategy: &'static str,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub default_provider: String,
    pub providers: Vec<ProviderStatus>,
}

/// Diagnosis body: the assessment fields at the top level, then bookkeeping.
#[derive(Debug, Serialize)]
pub struct DiagnosisResponse {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub consultation_id: Option<String>,
    pub persistence: &'static str,
    pub provider: String,
    pub pipeline: String,
    pub stages: Vec<StageTrace>,
}

pub async fn root(State(state): State<AppState>) -> Envelope<Value> {
    Envelope::ok(
        json!({ "service": SERVICE_NAME, "version": TRIAGE_VERSION, "status": "running" }),
        "Welcome to Pharmacy AI Backend",
        state.locale(),
    )
}

pub async fn health(State(state): State<AppState>) -> Envelope<HealthReport> {
    let providers = state
        .registry
        .names()
        .into_iter()
        .filter_map(|name| state.registry.get(name))
        .map(|orchestrator| ProviderStatus {
            name: orchestrator.provider().to_string(),
            strategy: orchestrator.strategy_kind().as_str(),
            available: orchestrator.has_client(),
        })
        .collect();

    Envelope::ok(
        HealthReport {
            status: "healthy",
            service: SERVICE_NAME,
            version: TRIAGE_VERSION,
            default_provider: state.registry.default_provider().to_string(),
            providers,
        },
        "Dịch vụ hoạt động bình thường",
        state.locale(),
    )
}

pub async fn diagnose(
    State(state): State<AppState>,
    input: SymptomInput,
) -> Result<Envelope<DiagnosisResponse>, ApiError> {
    let provider = state.registry.default_provider().to_string();
    run_diagnosis(&state, &provider, input).await
}

pub async fn diagnose_with(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    input: SymptomInput,
) -> Result<Envelope<DiagnosisResponse>, ApiError> {
    run_diagnosis(&state, &provider, input).await
}

async fn run_diagnosis(
    state: &AppState,
    provider: &str,
    input: SymptomInput,
) -> Result<Envelope<DiagnosisResponse>, ApiError> {
    let orchestrator = state
        .registry
        .get(provider)
        .ok_or_else(|| TriageError::NotFound(format!("Nhà cung cấp không tồn tại: {}", provider)))?;

    let encoding = input.encoding();
    let (user_id, query) = input.into_query()?;
    let ctx = RequestContext::new(provider)
        .with_user(user_id.as_str())
        .with_locale(state.locale());
    info!(trace_id = %ctx.trace_id, provider, encoding, user_id = %user_id, "diagnosis requested");

    let started = Instant::now();
    let outcome = orchestrator.diagnose(&query, &ctx).await?;
    state
        .metrics
        .record_diagnosis(provider, outcome.is_fallback, started.elapsed().as_secs_f64());

    let persisted = state.gate.persist(&outcome, &query, &user_id).await;
    state.metrics.record_consultation(persisted.as_str());

    let response = DiagnosisResponse {
        is_fallback: outcome.is_fallback,
        fallback_reason: outcome.fallback_reason,
        consultation_id: persisted.consultation_id().map(str::to_string),
        persistence: persisted.as_str(),
        provider: provider.to_string(),
        pipeline: pipeline_id(&outcome.stages),
        stages: outcome.stages,
        assessment: outcome.assessment,
    };

    Ok(Envelope::ok(
        response,
        "Chẩn đoán triệu chứng thành công",
        state.locale(),
    ))
}

pub async fn get_consultation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<ConsultationRecord>, ApiError> {
    let record = state.gate.find_consultation(&id).await?;
    Ok(Envelope::ok(
        record,
        "Lấy thông tin consultation thành công",
        state.locale(),
    ))
}

pub async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<Envelope<RecommendationSet>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let set = state.recommender.recommend(&request).await?;
    let message = format!("Đề xuất {} thuốc phù hợp với chẩn đoán", set.total_found);
    Ok(Envelope::ok(set, message, state.locale()))
}

pub async fn recommend_for_consultation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<RecommendationSet>, ApiError> {
    let record = state.gate.find_consultation(&id).await?;
    let set = state.recommender.recommend_for_consultation(&record).await?;
    let message = format!("Đề xuất {} thuốc dựa trên consultation", set.total_found);
    Ok(Envelope::ok(set, message, state.locale()))
}

pub async fn index_medicine(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<Value>, ApiError> {
    let Json(document) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let medicine_id = state.recommender.index_medicine(document).await?;
    Ok(Envelope::ok(
        json!({ "medicine_id": medicine_id }),
        "Embedding thuốc thành công",
        state.locale(),
    ))
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.metrics.encode()?;
    Ok(([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

pub async fn not_found(uri: Uri) -> Response {
    Envelope::fail(
        StatusCode::NOT_FOUND,
        "Không tìm thấy đường dẫn",
        vec![uri.path().to_string()],
    )
    .into_failure_response()
}
