//! Triage LLM: provider clients
//!
//! One trait, [`LlmClient`], with a single OpenAI-compatible implementation
//! used for every configured provider. Streaming responses are concatenated
//! before they are returned, so callers always see one complete text.

pub mod openai;
pub mod retry;
pub mod sse;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiClient;

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// Raw model output plus transport observations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// Content chunks received (1 for non-streaming calls)
    pub chunks: usize,
    pub attempts: u32,
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM/CONFIG: {0}")]
    Config(String),

    #[error("LLM/CONNECT: {0}")]
    Connect(String),

    #[error("LLM/TIMEOUT: {0}")]
    Timeout(String),

    #[error("LLM/STATUS: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("LLM/DECODE: {0}")]
    Decode(String),

    #[error("LLM/EMPTY: no content returned")]
    Empty,
}

impl LlmError {
    /// Connect errors, timeouts, 429 and 5xx are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Connect(_) | LlmError::Timeout(_) => true,
            LlmError::Status { status, .. } => retry::is_retryable_status(*status),
            LlmError::Config(_) | LlmError::Decode(_) | LlmError::Empty => false,
        }
    }
}

impl From<LlmError> for triage_core::TriageError {
    fn from(err: LlmError) -> Self {
        triage_core::TriageError::Transport(err.to_string())
    }
}

/// Contract of an LLM provider
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name as configured
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}
