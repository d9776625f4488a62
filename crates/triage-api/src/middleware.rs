//! Router layers: permissive CORS, panic recovery, error localization and
//! a one-line access log per request.
use crate::envelope::{Envelope, INTERNAL_MESSAGE};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::time::Instant;
use tower_http::cors::CorsLayer;

pub fn cors() -> CorsLayer {
    CorsLayer::permissive()
}

/// Response for a handler that panicked. The payload is logged, never sent.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");

    Envelope::fail(
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_MESSAGE,
        vec![INTERNAL_MESSAGE.to_string()],
    )
    .into_failure_response()
}

/// Failure envelopes are built without request state; stamp the configured locale.
pub async fn localize_errors(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    match response.extensions_mut().remove::<Envelope<()>>() {
        Some(mut envelope) if envelope.locale != state.locale() => {
            envelope.locale = state.locale().to_string();
            envelope.into_response()
        }
        _ => response,
    }
}

pub async fn access_log(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
    response
}
