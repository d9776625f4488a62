//! OpenAI-compatible chat completions client
//!
//! Works against any provider exposing `POST {base_url}/chat/completions`
//! (Groq, Hugging Face router, local gateways). Transient failures are
//! retried with exponential backoff up to `max_retries` extra attempts.

use crate::retry::{calculate_backoff, classify};
use crate::sse::{SseDecoder, StreamAccumulator};
use crate::{Completion, CompletionRequest, LlmClient, LlmError};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use triage_core::ProviderSettings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI-compatible chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    stream: bool,
    max_retries: u32,
}

impl OpenAiClient {
    /// Build a client for `settings` with an explicit API key
    pub fn new(settings: &ProviderSettings, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let base_url = settings.base_url.trim_end_matches('/');

        let parsed = reqwest::Url::parse(base_url)
            .map_err(|e| LlmError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LlmError::Config(format!(
                "base url must use http or https, got: {}",
                parsed.scheme()
            )));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(LlmError::Config("base url must not contain credentials".to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {}", e)))?;

        info!(provider = %settings.name, url = %base_url, stream = settings.stream, "LLM client created");

        Ok(Self {
            client,
            name: settings.name.clone(),
            endpoint: format!("{}/chat/completions", base_url),
            api_key: api_key.into(),
            model: settings.model.clone(),
            stream: settings.stream,
            max_retries: settings.max_retries,
        })
    }

    /// `Ok(None)` when the provider's API key variable is unset
    pub fn from_settings(settings: &ProviderSettings) -> Result<Option<Self>, LlmError> {
        match settings.api_key() {
            Some(key) => Self::new(settings, key).map(Some),
            None => {
                warn!(
                    provider = %settings.name,
                    env = %settings.api_key_env,
                    "API key not set; provider will always fall back"
                );
                Ok(None)
            }
        }
    }

    fn build_body<'a>(&'a self, request: &CompletionRequest) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            stream: self.stream,
        }
    }

    async fn send_once(&self, body: &ChatCompletionRequest<'_>) -> Result<(String, usize), LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if self.stream {
            self.read_stream(response).await
        } else {
            let parsed: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| LlmError::Decode(e.to_string()))?;
            let text = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or(LlmError::Empty)?;
            Ok((text, 1))
        }
    }

    async fn read_stream(&self, response: reqwest::Response) -> Result<(String, usize), LlmError> {
        let mut decoder = SseDecoder::new();
        let mut accumulator = StreamAccumulator::new();
        let mut bytes = response.bytes_stream();

        'outer: while let Some(item) = bytes.next().await {
            let chunk = item.map_err(classify)?;
            for payload in decoder.push(&chunk) {
                if accumulator.feed(&payload)? {
                    break 'outer;
                }
            }
        }
        if !accumulator.is_done() {
            if let Some(payload) = decoder.finish() {
                accumulator.feed(&payload)?;
            }
        }

        let (text, chunks) = accumulator.into_text();
        if text.is_empty() {
            return Err(LlmError::Empty);
        }
        Ok((text, chunks))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let body = self.build_body(request);
        debug!(provider = %self.name, model = %self.model, prompt_len = request.prompt.len(), "sending completion");

        let mut attempt = 0u32;
        loop {
            if attempt > 0 {
                let backoff = calculate_backoff(attempt - 1);
                warn!(provider = %self.name, attempt, ?backoff, "retrying completion");
                tokio::time::sleep(backoff).await;
            }
            attempt += 1;

            match self.send_once(&body).await {
                Ok((text, chunks)) => {
                    info!(provider = %self.name, length = text.len(), chunks, attempts = attempt, "completion received");
                    return Ok(Completion {
                        text,
                        chunks,
                        attempts: attempt,
                    });
                }
                Err(err) if err.is_retryable() && attempt <= self.max_retries => {
                    warn!(provider = %self.name, error = %err, "transient completion failure");
                }
                Err(err) => {
                    error!(provider = %self.name, attempts = attempt, error = %err, "completion failed");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::StrategyKind;

    fn settings(base_url: &str) -> ProviderSettings {
        ProviderSettings {
            base_url: base_url.to_string(),
            ..ProviderSettings::groq()
        }
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(OpenAiClient::new(&settings("not a url"), "k"), Err(LlmError::Config(_))));
        assert!(matches!(OpenAiClient::new(&settings("ftp://host/v1"), "k"), Err(LlmError::Config(_))));
        assert!(matches!(
            OpenAiClient::new(&settings("https://user:pw@host/v1"), "k"),
            Err(LlmError::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_and_body() {
        let client = OpenAiClient::new(&settings("https://api.groq.com/openai/v1/"), "k").unwrap();
        assert_eq!(client.endpoint, "https://api.groq.com/openai/v1/chat/completions");

        let body = client.build_body(&CompletionRequest {
            system: Some("seed".into()),
            prompt: "ho".into(),
            temperature: 0.8,
            top_p: 0.9,
            max_tokens: 5000,
        });
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "qwen-qwq-32b");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "ho");
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn test_missing_key_yields_none() {
        let mut provider = settings("https://api.groq.com/openai/v1");
        provider.api_key_env = "TRIAGE_TEST_KEY_THAT_IS_NEVER_SET".into();
        provider.strategy = StrategyKind::Structured;
        assert!(OpenAiClient::from_settings(&provider).unwrap().is_none());
    }
}
