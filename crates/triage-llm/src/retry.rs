//! Retry classification and backoff
use crate::LlmError;
use std::time::Duration;

/// Initial backoff delay for retries
pub const INITIAL_BACKOFF_MS: u64 = 500;

/// Maximum backoff delay
pub const MAX_BACKOFF_MS: u64 = 5000;

pub fn is_retryable_status(status: u16) -> bool {
    (500..600).contains(&status) || status == 429
}

/// Map a reqwest error onto the provider error taxonomy
pub fn classify(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        LlmError::Connect(err.to_string())
    } else if let Some(status) = err.status() {
        LlmError::Status {
            status: status.as_u16(),
            body: err.to_string(),
        }
    } else if err.is_decode() || err.is_body() {
        LlmError::Decode(err.to_string())
    } else {
        LlmError::Connect(err.to_string())
    }
}

/// Exponential backoff with jitter: 500ms, 1s, 2s, 4s, then capped at 5s
pub fn calculate_backoff(attempt: u32) -> Duration {
    let base_delay = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt));
    let capped_delay = base_delay.min(MAX_BACKOFF_MS);
    let jitter = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_millis() as u64)
        % 100;
    Duration::from_millis(capped_delay + jitter)
}
