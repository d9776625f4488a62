//! Settings: built once at startup, shared by `Arc`
//!
//! Source order: built-in defaults, then the YAML file named by
//! `TRIAGE_CONFIG` (if any), then environment overrides. Secrets never live
//! in the file; providers name the environment variable holding their key.
use crate::error::TriageError;
use crate::stage::StrategyKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const CONFIG_PATH_ENV: &str = "TRIAGE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub providers: Vec<ProviderSettings>,
    pub default_provider: String,
    /// Prompt template file; built-in templates are used when absent
    pub prompts_path: Option<String>,
    pub embedding: Option<EmbeddingSettings>,
    pub vector: Option<VectorSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `None` keeps everything in memory
    pub sqlite_path: Option<String>,
    pub consultation_collection: String,
    pub medicine_collection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub name: String,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub strategy: StrategyKind,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub stream: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSettings {
    pub uri: String,
    pub token_env: String,
    pub collection: String,
    pub anns_field: String,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
            locale: "vi".to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            sqlite_path: None,
            consultation_collection: "consultations".to_string(),
            medicine_collection: "medicines".to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            providers: vec![ProviderSettings::groq(), ProviderSettings::deepseek()],
            default_provider: "groq".to_string(),
            prompts_path: None,
            embedding: None,
            vector: None,
        }
    }
}

impl ProviderSettings {
    /// Structured JSON provider
    pub fn groq() -> Self {
        Self {
            name: "groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "qwen-qwq-32b".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            strategy: StrategyKind::Structured,
            temperature: 0.8,
            top_p: 0.9,
            max_tokens: 5000,
            stream: false,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }

    /// Free-text streaming provider
    pub fn deepseek() -> Self {
        Self {
            name: "deepseek".to_string(),
            base_url: "https://router.huggingface.co/novita/v3/openai".to_string(),
            model: "deepseek/deepseek-r1-0528".to_string(),
            api_key_env: "HUGGING_FACE_API_KEY".to_string(),
            strategy: StrategyKind::FreeText,
            temperature: 0.7,
            top_p: 0.8,
            max_tokens: default_max_tokens(),
            stream: true,
            timeout_secs: 120,
            max_retries: default_max_retries(),
        }
    }

    /// API key read from the configured environment variable, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

impl Settings {
    /// Defaults, then `TRIAGE_CONFIG` file, then environment overrides
    pub fn load() -> Result<Self, TriageError> {
        let mut settings = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TriageError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TriageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, TriageError> {
        let mut settings: Settings = serde_yaml::from_str(yaml)
            .map_err(|e| TriageError::Config(format!("invalid settings: {}", e)))?;
        if settings.providers.is_empty() {
            settings.providers = Settings::default().providers;
        }
        Ok(settings)
    }

    /// Applies environment-style overrides through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("TRIAGE_ADDR") {
            self.server.addr = addr;
        } else if let Some(port) = lookup("PORT") {
            let host = self
                .server
                .addr
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.server.addr = format!("{}:{}", host, port.trim());
        }
        if let Some(path) = lookup("TRIAGE_DB_PATH") {
            self.storage.sqlite_path = Some(path).filter(|p| !p.trim().is_empty());
        }
        if let Some(provider) = lookup("TRIAGE_DEFAULT_PROVIDER") {
            self.default_provider = provider;
        }
    }

    pub fn validate(&self) -> Result<(), TriageError> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name.as_str()) {
                return Err(TriageError::Config(format!(
                    "duplicate provider: {}",
                    provider.name
                )));
            }
            if !(0.0..=2.0).contains(&provider.temperature) {
                return Err(TriageError::Config(format!(
                    "provider {}: temperature out of range",
                    provider.name
                )));
            }
            if !(0.0..=1.0).contains(&provider.top_p) {
                return Err(TriageError::Config(format!(
                    "provider {}: top_p out of range",
                    provider.name
                )));
            }
        }
        if self.provider(&self.default_provider).is_none() {
            return Err(TriageError::Config(format!(
                "default provider not configured: {}",
                self.default_provider
            )));
        }
        Ok(())
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.iter().find(|p| p.name == name)
    }
}
