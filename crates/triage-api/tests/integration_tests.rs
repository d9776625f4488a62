//! HTTP tests driving the router with `oneshot`.
//!
//! Each test builds its own state: scripted LLM clients, in-memory stores
//! and the local hash embedder.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use triage_api::{create_app, AppState};
use triage_core::{ProviderSettings, Settings};
use triage_llm::{Completion, CompletionRequest, LlmClient, LlmError};
use triage_stages::{
    DiagnosisOrchestrator, MedicineRecommender, OrchestratorRegistry, PersistenceGate, PromptBook,
};
use triage_store::{HashEmbedder, InMemoryDocumentStore, InMemoryVectorIndex};

// =============================================================================
// Harness
// =============================================================================

struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Err(LlmError::Empty));
        reply.map(|text| Completion {
            text,
            chunks: 1,
            attempts: 1,
        })
    }
}

struct Harness {
    app: Router,
    groq: Arc<ScriptedLlm>,
    deepseek: Arc<ScriptedLlm>,
    store: Arc<InMemoryDocumentStore>,
}

struct PanickingLlm;

#[async_trait]
impl LlmClient for PanickingLlm {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, LlmError> {
        panic!("provider client exploded");
    }
}

fn build_app(
    settings: Settings,
    groq: Arc<dyn LlmClient>,
    deepseek: Arc<dyn LlmClient>,
    store: Arc<InMemoryDocumentStore>,
) -> Router {
    let prompts = Arc::new(PromptBook::builtin().unwrap());

    let mut registry = OrchestratorRegistry::new("groq");
    registry.insert(DiagnosisOrchestrator::for_provider(
        ProviderSettings::groq(),
        Some(groq),
        Arc::clone(&prompts),
    ));
    registry.insert(DiagnosisOrchestrator::for_provider(
        ProviderSettings::deepseek(),
        Some(deepseek),
        prompts,
    ));

    let gate = PersistenceGate::new(store.clone(), "consultations");
    let recommender = MedicineRecommender::new(
        Arc::new(HashEmbedder::default()),
        Arc::new(InMemoryVectorIndex::new()),
        store,
        "medicines",
    );
    let state = AppState::new(Arc::new(settings), registry, gate, recommender).unwrap();
    create_app(state)
}

fn harness_with(
    settings: Settings,
    groq: Vec<Result<String, LlmError>>,
    deepseek: Vec<Result<String, LlmError>>,
) -> Harness {
    let groq = ScriptedLlm::new(groq);
    let deepseek = ScriptedLlm::new(deepseek);
    let store = Arc::new(InMemoryDocumentStore::new());
    let app = build_app(
        settings,
        groq.clone() as Arc<dyn LlmClient>,
        deepseek.clone() as Arc<dyn LlmClient>,
        store.clone(),
    );

    Harness {
        app,
        groq,
        deepseek,
        store,
    }
}

fn harness(groq: Vec<Result<String, LlmError>>, deepseek: Vec<Result<String, LlmError>>) -> Harness {
    harness_with(Settings::default(), groq, deepseek)
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

const STRUCTURED_REPLY: &str = r#"```json
{
  "primary_diagnosis": {"diagnosis_name": "Viêm họng cấp", "confidence_percentage": 82,
    "description": "Viêm niêm mạc họng", "reasons": ["Đau họng", "Sốt", "Ho khan"]},
  "alternative_diagnoses": [
    {"diagnosis_name": "Cảm cúm", "confidence_percentage": 55, "description": "Nhiễm virus cúm",
     "reasons": ["Sốt", "Mệt mỏi", "Ho"]},
    {"diagnosis_name": "Viêm amidan", "confidence_percentage": 40, "description": "Viêm amidan cấp",
     "reasons": ["Nuốt đau", "Sốt", "Hơi thở hôi"]}
  ],
  "general_advice": ["Súc miệng nước muối", "Uống nước ấm", "Nghỉ ngơi"],
  "overall_severity_level": "trung bình",
  "related_symptoms": ["Khàn tiếng", "Nuốt đau", "Sưng hạch"],
  "recommended_actions": ["Khám tai mũi họng", "Theo dõi nhiệt độ", "Tránh đồ lạnh"]
}
```"#;

const FREE_TEXT_REPLY: &str = "<think>reasoning</think>TÌNH TRẠNG CÓ THỂ:\n- Cảm cúm\nĐỀ XUẤT VÀ LỜI KHUYÊN:\n- Nghỉ ngơi\nMỨC ĐỘ NGHIÊM TRỌNG:\nNhẹ";

fn errors(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|list| list.iter().filter_map(|e| e.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

// =============================================================================
// Service endpoints
// =============================================================================

#[tokio::test]
async fn test_root_and_health() {
    let h = harness(vec![], vec![]);

    let (status, body) = send(&h.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Pharmacy AI Backend");
    assert_eq!(body["data"]["status"], "running");

    let (status, body) = send(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["default_provider"], "groq");
    assert_eq!(body["data"]["providers"].as_array().unwrap().len(), 2);
    assert_eq!(body["locale"], "vi");
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let h = harness(vec![], vec![]);
    let (status, body) = send(&h.app, get("/v2/nothing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(errors(&body), vec!["/v2/nothing"]);
}

#[tokio::test]
async fn test_error_envelopes_use_configured_locale() {
    let mut settings = Settings::default();
    settings.server.locale = "en".to_string();
    let h = harness_with(settings, vec![], vec![]);

    let (status, body) = send(
        &h.app,
        json_post("/v1/diagnosis", json!({"user_id": "u1", "symptoms": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["locale"], "en");

    let (status, body) = send(&h.app, get("/v2/nothing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["locale"], "en");
    assert_eq!(errors(&body), vec!["/v2/nothing"]);

    let (_, body) = send(&h.app, get("/health")).await;
    assert_eq!(body["locale"], "en");
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error_envelope() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let app = build_app(
        Settings::default(),
        Arc::new(PanickingLlm),
        ScriptedLlm::new(vec![]),
        store.clone(),
    );

    let (status, body) = send(
        &app,
        json_post("/v1/diagnosis", json!({"user_id": "u1", "symptoms": "sốt"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], 500);
    assert_eq!(body["message"], "Có lỗi không mong muốn xảy ra");
    assert_eq!(body["locale"], "vi");
    assert!(body["data"].is_null());
    assert_eq!(store.count("consultations").await, 0);

    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Diagnosis
// =============================================================================

#[tokio::test]
async fn test_empty_symptoms_rejected_without_llm_call() {
    let h = harness(vec![Ok(STRUCTURED_REPLY.into())], vec![]);
    let (status, body) = send(
        &h.app,
        json_post("/v1/diagnosis", json!({"user_id": "u1", "symptoms": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["message"], "Dữ liệu đầu vào không hợp lệ");
    assert!(body["data"].is_null());
    assert_eq!(errors(&body), vec!["Triệu chứng không được để trống"]);
    assert_eq!(h.groq.calls(), 0);
}

#[tokio::test]
async fn test_missing_user_and_bad_age_reported_together() {
    let h = harness(vec![], vec![]);
    let (status, body) = send(
        &h.app,
        json_post("/v1/diagnosis", json!({"symptoms": "ho", "patient_age": 151})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        errors(&body),
        vec!["user_id không được để trống", "Tuổi phải từ 0 đến 150"]
    );
}

#[tokio::test]
async fn test_structured_diagnosis_stored_and_retrievable() {
    let h = harness(vec![Ok(STRUCTURED_REPLY.into())], vec![]);
    let (status, body) = send(
        &h.app,
        json_post(
            "/v1/diagnosis",
            json!({"user_id": "u1", "symptoms": "sốt, đau họng", "patient_age": 28, "patient_gender": "nam"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Chẩn đoán triệu chứng thành công");
    let data = &body["data"];
    assert_eq!(data["primary_diagnosis"]["diagnosis_name"], "Viêm họng cấp");
    assert_eq!(data["alternative_diagnoses"].as_array().unwrap().len(), 2);
    assert_eq!(data["is_fallback"], false);
    assert_eq!(data["persistence"], "stored");
    assert_eq!(data["provider"], "groq");
    assert_eq!(data["pipeline"], "call→parse");
    assert_eq!(h.groq.calls(), 1);
    assert_eq!(h.store.count("consultations").await, 1);

    let id = data["consultation_id"].as_str().unwrap();
    let (status, body) = send(&h.app, get(&format!("/v1/consultations/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_id"], "u1");
    assert_eq!(body["data"]["human"]["symptoms"], "sốt, đau họng");
    assert_eq!(
        body["data"]["ai"]["primary_diagnosis"]["diagnosis_name"],
        "Viêm họng cấp"
    );
}

#[tokio::test]
async fn test_form_input_on_named_provider() {
    let h = harness(vec![], vec![Ok(FREE_TEXT_REPLY.into())]);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/diagnosis/deepseek")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("user_id=u2&symptoms=ho+khan&patient_age=30&patient_gender="))
        .unwrap();

    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["possible_conditions"], json!(["Cảm cúm"]));
    assert_eq!(body["data"]["provider"], "deepseek");
    assert_eq!(h.groq.calls(), 0);

    let requests = h.deepseek.requests.lock().unwrap();
    assert!(requests[0].prompt.contains("ho khan"));
    assert!(requests[0].prompt.contains("30 tuổi"));
}

#[tokio::test]
async fn test_transport_failure_returns_fallback_unsaved() {
    let h = harness(vec![Err(LlmError::Connect("connection refused".into()))], vec![]);
    let (status, body) = send(
        &h.app,
        json_post("/v1/diagnosis", json!({"user_id": "u1", "symptoms": "đau đầu"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["is_fallback"], true);
    assert_eq!(data["persistence"], "skipped");
    assert!(data["consultation_id"].is_null());
    assert_eq!(data["pipeline"], "call→fallback");
    assert!(data["fallback_reason"].as_str().unwrap().starts_with("transport:"));
    assert_eq!(h.store.count("consultations").await, 0);
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let h = harness(vec![], vec![]);
    let (status, body) = send(
        &h.app,
        json_post("/v1/diagnosis/openai", json!({"user_id": "u1", "symptoms": "ho"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors(&body), vec!["Nhà cung cấp không tồn tại: openai"]);
    assert_eq!(h.groq.calls() + h.deepseek.calls(), 0);
}

#[tokio::test]
async fn test_unsupported_and_malformed_bodies() {
    let h = harness(vec![], vec![]);

    let plain = Request::builder()
        .method("POST")
        .uri("/v1/diagnosis")
        .header("content-type", "text/plain")
        .body(Body::from("ho"))
        .unwrap();
    let (status, body) = send(&h.app, plain).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["status"], 415);

    let broken = Request::builder()
        .method("POST")
        .uri("/v1/diagnosis")
        .header("content-type", "application/json")
        .body(Body::from("{\"symptoms\": "))
        .unwrap();
    let (status, body) = send(&h.app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Dữ liệu đầu vào không hợp lệ");
}

#[tokio::test]
async fn test_missing_consultation() {
    let h = harness(vec![], vec![]);
    let (status, body) = send(&h.app, get("/v1/consultations/does-not-exist")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(errors(&body)[0].starts_with("Không tìm thấy consultation"));
}

// =============================================================================
// Medicines
// =============================================================================

#[tokio::test]
async fn test_index_then_recommend() {
    let h = harness(vec![], vec![]);

    let (status, body) = send(
        &h.app,
        json_post(
            "/v1/medicines/index",
            json!({"_id": "med-1", "name": "Paracetamol", "description": "Hạ sốt giảm đau",
                   "usage": "sốt, đau đầu", "stock_status": "IN-STOCK", "is_active": true, "rating": 4.8}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["medicine_id"], "med-1");

    send(
        &h.app,
        json_post(
            "/v1/medicines/index",
            json!({"_id": "med-2", "name": "Prospan", "description": "Giảm ho",
                   "stock_status": "OUT-OF-STOCK", "is_active": true}),
        ),
    )
    .await;

    let (status, body) = send(
        &h.app,
        json_post(
            "/v1/medicines/recommend",
            json!({"primary_diagnosis": "Sốt siêu vi", "symptoms": "sốt, đau đầu", "limit": 5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let recommendations = body["data"]["recommendations"].as_array().unwrap();
    assert_eq!(body["data"]["total_found"], recommendations.len());
    assert!(recommendations.iter().all(|r| r["medicine"]["_id"] != "med-2"));
    assert_eq!(body["data"]["search_query"], "Sốt siêu vi - sốt, đau đầu");
}

#[tokio::test]
async fn test_recommend_validation() {
    let h = harness(vec![], vec![]);
    let (status, body) = send(
        &h.app,
        json_post("/v1/medicines/recommend", json!({"primary_diagnosis": " ", "symptoms": "ho", "limit": 0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        errors(&body),
        vec!["Chẩn đoán chính không được để trống", "Số lượng đề xuất phải từ 1 đến 50"]
    );
}

#[tokio::test]
async fn test_recommend_for_stored_consultation() {
    let h = harness(vec![Ok(STRUCTURED_REPLY.into())], vec![]);
    let (_, body) = send(
        &h.app,
        json_post("/v1/diagnosis", json!({"user_id": "u1", "symptoms": "sốt, đau họng"})),
    )
    .await;
    let id = body["data"]["consultation_id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/medicines/recommend/consultation/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["search_query"], "Viêm họng cấp - sốt, đau họng");
    assert!(body["message"].as_str().unwrap().ends_with("dựa trên consultation"));
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_count_diagnoses() {
    let h = harness(vec![Err(LlmError::Empty)], vec![]);
    send(
        &h.app,
        json_post("/v1/diagnosis", json!({"user_id": "u1", "symptoms": "ho"})),
    )
    .await;

    let response = h.app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("triage_diagnoses_total{"));
    assert!(text.contains(r#"outcome="fallback""#));
    assert!(text.contains(r#"triage_consultations_total{result="skipped"} 1"#));
}
