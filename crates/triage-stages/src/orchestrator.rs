//! Diagnosis Orchestrator
//!
//! ```text
//! SymptomQuery → prompt → LLM call → parse + repair → fallback policy → DiagnosisOutcome
//!                              ↓            ↓                ↓
//!                           call.*       parse.*         fallback.v1   (StageTrace each)
//! ```
//!
//! Transport and parse failures never escape: they become the fallback
//! assessment with `is_fallback = true`. The only error returned is a
//! template failure, which is a deployment problem rather than a request one.

use crate::prompt::{diversity_seed, PromptBook};
use crate::strategy::strategy_for;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use triage_core::runner::pipeline_id;
use triage_core::{
    Assessment, DiagnosisOutcome, ParseStrategy, ProviderSettings, RequestContext, Settings,
    StageTimer, StageTrace, StrategyKind, SymptomQuery, TriageError,
};
use triage_llm::{CompletionRequest, LlmClient, OpenAiClient};
use triage_quality::{decide, Attempt};

pub const FALLBACK_STAGE_ID: &str = "fallback.v1";

pub struct DiagnosisOrchestrator {
    provider: ProviderSettings,
    client: Option<Arc<dyn LlmClient>>,
    strategy: Arc<dyn ParseStrategy>,
    prompts: Arc<PromptBook>,
}

impl DiagnosisOrchestrator {
    pub fn new(
        provider: ProviderSettings,
        client: Option<Arc<dyn LlmClient>>,
        strategy: Arc<dyn ParseStrategy>,
        prompts: Arc<PromptBook>,
    ) -> Self {
        Self {
            provider,
            client,
            strategy,
            prompts,
        }
    }

    /// Orchestrator with the strategy named in the provider settings
    pub fn for_provider(
        provider: ProviderSettings,
        client: Option<Arc<dyn LlmClient>>,
        prompts: Arc<PromptBook>,
    ) -> Self {
        let strategy = strategy_for(provider.strategy);
        Self::new(provider, client, strategy, prompts)
    }

    pub fn provider(&self) -> &str {
        &self.provider.name
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub async fn diagnose(
        &self,
        query: &SymptomQuery,
        ctx: &RequestContext,
    ) -> Result<DiagnosisOutcome, TriageError> {
        let mut stages = Vec::new();
        let kind = self.strategy.kind();

        let prompt = self.prompts.render(kind, query, diversity_seed())?;
        info!(
            trace_id = %ctx.trace_id,
            provider = %self.provider.name,
            strategy = kind.as_str(),
            prompt_len = prompt.user.chars().count(),
            "analyzing symptoms"
        );

        let attempt = match &self.client {
            None => {
                warn!(trace_id = %ctx.trace_id, provider = %self.provider.name, "no client configured");
                Attempt::ClientUnavailable
            }
            Some(client) => {
                let request = CompletionRequest {
                    system: prompt.system,
                    prompt: prompt.user,
                    temperature: self.provider.temperature,
                    top_p: self.provider.top_p,
                    max_tokens: self.provider.max_tokens,
                };

                let timer = StageTimer::start(
                    format!("call.{}", self.provider.name),
                    request.prompt.as_bytes(),
                );
                match client.complete(&request).await {
                    Ok(completion) => {
                        stages.push(timer.finish(completion.text.as_bytes()));
                        info!(
                            trace_id = %ctx.trace_id,
                            provider = %self.provider.name,
                            chunks = completion.chunks,
                            attempts = completion.attempts,
                            response_len = completion.text.chars().count(),
                            "model responded"
                        );
                        self.interpret(&completion.text, &mut stages)
                    }
                    Err(err) => {
                        stages.push(timer.finish(err.to_string().as_bytes()));
                        error!(trace_id = %ctx.trace_id, provider = %self.provider.name, "LLM call failed: {}", err);
                        Attempt::TransportFailed(err.to_string())
                    }
                }
            }
        };

        let decision = decide(attempt);
        if let Some(reason) = decision.reason() {
            warn!(
                trace_id = %ctx.trace_id,
                provider = %self.provider.name,
                reason = %reason,
                "returning fallback diagnosis"
            );
            let timer = StageTimer::start(FALLBACK_STAGE_ID, reason.to_string().as_bytes());
            stages.push(timer.finish(&assessment_bytes(decision.assessment())));
        }

        let (assessment, is_fallback, reason) = decision.into_parts();
        for stage in &stages {
            debug!(
                trace_id = %ctx.trace_id,
                stage = %stage.id,
                in_hash = %stage.in_hash,
                out_hash = %stage.out_hash,
                latency_ms = stage.latency_ms,
                "stage complete"
            );
        }
        info!(
            trace_id = %ctx.trace_id,
            pipeline = %pipeline_id(&stages),
            is_fallback,
            "diagnosis complete"
        );

        Ok(DiagnosisOutcome {
            assessment,
            is_fallback,
            fallback_reason: reason.map(|r| r.to_string()),
            stages,
        })
    }

    fn interpret(&self, raw: &str, stages: &mut Vec<StageTrace>) -> Attempt {
        let timer = StageTimer::start(self.strategy.id(), raw.as_bytes());
        match self.strategy.interpret(raw) {
            Ok(assessment) => {
                stages.push(timer.finish(&assessment_bytes(&assessment)));
                Attempt::Parsed(assessment)
            }
            Err(err) => {
                stages.push(timer.finish(err.to_string().as_bytes()));
                Attempt::Unparseable(err)
            }
        }
    }
}

fn assessment_bytes(assessment: &Assessment) -> Vec<u8> {
    serde_json::to_vec(assessment).unwrap_or_default()
}

/// One orchestrator per configured provider
pub struct OrchestratorRegistry {
    orchestrators: BTreeMap<String, Arc<DiagnosisOrchestrator>>,
    default_provider: String,
}

impl OrchestratorRegistry {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            orchestrators: BTreeMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Build a client for every provider. A provider without an API key is
    /// still registered and always falls back.
    pub fn from_settings(settings: &Settings, prompts: Arc<PromptBook>) -> Result<Self, TriageError> {
        let mut registry = Self::new(settings.default_provider.clone());
        for provider in &settings.providers {
            let client = OpenAiClient::from_settings(provider)
                .map_err(|e| TriageError::Config(format!("provider '{}': {}", provider.name, e)))?
                .map(|c| Arc::new(c) as Arc<dyn LlmClient>);
            info!(
                provider = %provider.name,
                model = %provider.model,
                strategy = provider.strategy.as_str(),
                available = client.is_some(),
                "registered provider"
            );
            registry.insert(DiagnosisOrchestrator::for_provider(
                provider.clone(),
                client,
                Arc::clone(&prompts),
            ));
        }
        Ok(registry)
    }

    pub fn insert(&mut self, orchestrator: DiagnosisOrchestrator) {
        self.orchestrators
            .insert(orchestrator.provider().to_string(), Arc::new(orchestrator));
    }

    pub fn get(&self, provider: &str) -> Option<Arc<DiagnosisOrchestrator>> {
        self.orchestrators.get(provider).cloned()
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    pub fn default_orchestrator(&self) -> Option<Arc<DiagnosisOrchestrator>> {
        self.get(&self.default_provider)
    }

    pub fn names(&self) -> Vec<&str> {
        self.orchestrators.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.orchestrators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orchestrators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_client_falls_back() {
        let orchestrator = DiagnosisOrchestrator::for_provider(
            ProviderSettings::groq(),
            None,
            Arc::new(PromptBook::builtin().unwrap()),
        );
        let query = SymptomQuery::new("ho", None, None).unwrap();
        let outcome = orchestrator
            .diagnose(&query, &RequestContext::new("groq"))
            .await
            .unwrap();

        assert!(outcome.is_fallback);
        assert_eq!(outcome.fallback_reason.as_deref(), Some("client unavailable"));
        assert_eq!(pipeline_id(&outcome.stages), "fallback");
    }

    #[test]
    fn test_registry_lookup() {
        let prompts = Arc::new(PromptBook::builtin().unwrap());
        let mut registry = OrchestratorRegistry::new("groq");
        registry.insert(DiagnosisOrchestrator::for_provider(
            ProviderSettings::groq(),
            None,
            Arc::clone(&prompts),
        ));
        registry.insert(DiagnosisOrchestrator::for_provider(
            ProviderSettings::deepseek(),
            None,
            prompts,
        ));

        assert_eq!(registry.names(), vec!["deepseek", "groq"]);
        assert_eq!(registry.default_orchestrator().unwrap().provider(), "groq");
        assert_eq!(
            registry.get("deepseek").unwrap().strategy_kind(),
            StrategyKind::FreeText
        );
        assert!(registry.get("openai").is_none());
    }
}
