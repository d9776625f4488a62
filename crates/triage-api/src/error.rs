//! API error type. Every failure leaves the service as an [`Envelope`].
use crate::envelope::{
    Envelope, INTERNAL_MESSAGE, INVALID_INPUT_MESSAGE, NOT_FOUND_MESSAGE, UNAVAILABLE_MESSAGE,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use triage_core::{ErrorKind, TriageError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Triage(#[from] TriageError),

    #[error("malformed request body: {0}")]
    BadRequest(String),

    #[error("unsupported content type: {0}")]
    UnsupportedMediaType(String),

    #[error("metrics: {0}")]
    Metrics(String),

    #[error("startup: {0}")]
    Startup(String),
}

impl From<prometheus::Error> for ApiError {
    fn from(err: prometheus::Error) -> Self {
        ApiError::Metrics(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Triage(err) => match err.kind() {
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Metrics(_) | ApiError::Startup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match &self {
            ApiError::Triage(TriageError::InvalidInput(errors)) => {
                (INVALID_INPUT_MESSAGE, errors.clone())
            }
            ApiError::Triage(TriageError::NotFound(what)) => (NOT_FOUND_MESSAGE, vec![what.clone()]),
            ApiError::Triage(TriageError::Unavailable(what)) => {
                tracing::warn!("dependency unavailable: {}", what);
                (UNAVAILABLE_MESSAGE, vec![what.clone()])
            }
            ApiError::BadRequest(detail) | ApiError::UnsupportedMediaType(detail) => {
                (INVALID_INPUT_MESSAGE, vec![detail.clone()])
            }
            other => {
                tracing::error!("request failed: {}", other);
                (INTERNAL_MESSAGE, vec![INTERNAL_MESSAGE.to_string()])
            }
        };

        Envelope::fail(status, message, errors).into_failure_response()
    }
}
