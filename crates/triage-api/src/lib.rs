//! Triage API /v1: REST endpoints over the diagnosis pipeline
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod input;
pub mod metrics;
pub mod middleware;
pub mod state;

pub use envelope::Envelope;
pub use error::ApiError;
pub use input::SymptomInput;
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use triage_core::Settings;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/v1/health", get(handlers::health))
        .route("/v1/diagnosis", post(handlers::diagnose))
        .route("/v1/diagnosis/{provider}", post(handlers::diagnose_with))
        .route("/v1/consultations/{id}", get(handlers::get_consultation))
        .route("/v1/medicines/recommend", post(handlers::recommend))
        .route(
            "/v1/medicines/recommend/consultation/{id}",
            post(handlers::recommend_for_consultation),
        )
        .route("/v1/medicines/index", post(handlers::index_medicine))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(middleware::panic_response))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::localize_errors,
        ))
        .layer(axum::middleware::from_fn(middleware::access_log))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors())
        .with_state(state)
}

pub async fn run(settings: Settings) -> Result<(), ApiError> {
    let settings = Arc::new(settings);
    let addr = settings.server.addr.clone();
    let app = create_app(AppState::from_settings(settings)?);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Startup(format!("failed to bind {}: {}", addr, e)))?;

    tracing::info!("Triage API listening on {}", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Startup(e.to_string()))
}
