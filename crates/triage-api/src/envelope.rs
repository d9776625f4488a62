//! Response envelope shared by every endpoint.
//!
//! `{ data, message, status, locale, errors }`, with `status` mirrored into
//! the HTTP status line.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const DEFAULT_LOCALE: &str = "vi";

pub const SUCCESS_MESSAGE: &str = "Thành công";
pub const INVALID_INPUT_MESSAGE: &str = "Dữ liệu đầu vào không hợp lệ";
pub const NOT_FOUND_MESSAGE: &str = "Không tìm thấy dữ liệu";
pub const UNAVAILABLE_MESSAGE: &str = "Dịch vụ tạm thời không khả dụng";
pub const INTERNAL_MESSAGE: &str = "Có lỗi không mong muốn xảy ra";

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: Option<T>,
    pub message: String,
    pub status: u16,
    pub locale: String,
    pub errors: Option<Vec<String>>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T, message: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            message: message.into(),
            status: StatusCode::OK.as_u16(),
            locale: locale.into(),
            errors: None,
        }
    }
}

impl Envelope<()> {
    pub fn fail(status: StatusCode, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            data: None,
            message: message.into(),
            status: status.as_u16(),
            locale: DEFAULT_LOCALE.to_string(),
            errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }

    /// Failure response carrying a copy of the envelope in its extensions,
    /// so router middleware can re-render it with the configured locale.
    pub fn into_failure_response(self) -> Response {
        let mut response = self.clone().into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
