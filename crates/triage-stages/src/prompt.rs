//! Prompt templates for the diagnosis call.
//!
//! One Handlebars template per [`StrategyKind`], loaded from a
//! `diagnosis-prompts.yaml` file:
//!
//! ```yaml
//! version: "1.0"
//! prompts:
//!   structured:
//!     description: Single JSON object
//!     system: "Tạo phản hồi đa dạng với seed: {{seed}}"
//!     user: "Triệu chứng: {{symptoms}}"
//! ```
//!
//! Output is never HTML-escaped; symptom text reaches the model verbatim.

use handlebars::Handlebars;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use triage_core::{StrategyKind, SymptomQuery, TriageError};

/// Templates shipped with the crate
const BUILTIN_PROMPTS: &str = include_str!("../../../prompts/diagnosis-prompts.yaml");

/// Top-level prompts file structure
#[derive(Debug, Clone, Deserialize)]
pub struct PromptsFile {
    pub version: String,
    pub prompts: HashMap<String, PromptTemplate>,
}

/// A single prompt definition
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system: Option<String>,
    pub user: String,
}

impl PromptsFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, TriageError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TriageError::Template(format!("invalid prompts file: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TriageError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TriageError::Template(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }
}

/// Rendered messages for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: Option<String>,
    pub user: String,
}

/// Compiled templates for every strategy
pub struct PromptBook {
    handlebars: Handlebars<'static>,
    version: String,
}

impl PromptBook {
    /// Compile a prompts file. Both strategies must have a template.
    pub fn new(file: PromptsFile) -> Result<Self, TriageError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);

        for kind in [StrategyKind::FreeText, StrategyKind::Structured] {
            let template = file.prompts.get(kind.as_str()).ok_or_else(|| {
                TriageError::Template(format!("no prompt for strategy '{}'", kind.as_str()))
            })?;
            handlebars
                .register_template_string(&user_key(kind), &template.user)
                .map_err(|e| TriageError::Template(format!("{}: {}", kind.as_str(), e)))?;
            if let Some(system) = &template.system {
                handlebars
                    .register_template_string(&system_key(kind), system)
                    .map_err(|e| TriageError::Template(format!("{}.system: {}", kind.as_str(), e)))?;
            }
        }

        Ok(Self {
            handlebars,
            version: file.version,
        })
    }

    /// Templates shipped with the crate
    pub fn builtin() -> Result<Self, TriageError> {
        Self::new(PromptsFile::from_yaml(BUILTIN_PROMPTS)?)
    }

    /// Load from `path`, or the built-in templates when `None`
    pub fn load(path: Option<&str>) -> Result<Self, TriageError> {
        match path {
            Some(path) => Self::new(PromptsFile::load(path)?),
            None => Self::builtin(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn render(
        &self,
        kind: StrategyKind,
        query: &SymptomQuery,
        seed: u32,
    ) -> Result<RenderedPrompt, TriageError> {
        let data = prompt_data(query, seed);

        let user = self
            .handlebars
            .render(&user_key(kind), &data)
            .map_err(|e| TriageError::Template(format!("render error: {}", e)))?;

        let system_key = system_key(kind);
        let system = if self.handlebars.has_template(&system_key) {
            let rendered = self
                .handlebars
                .render(&system_key, &data)
                .map_err(|e| TriageError::Template(format!("render error: {}", e)))?;
            Some(rendered)
        } else {
            None
        };

        Ok(RenderedPrompt { system, user })
    }
}

fn user_key(kind: StrategyKind) -> String {
    format!("{}.user", kind.as_str())
}

fn system_key(kind: StrategyKind) -> String {
    format!("{}.system", kind.as_str())
}

fn prompt_data(query: &SymptomQuery, seed: u32) -> Value {
    json!({
        "symptoms": query.symptoms(),
        "age": query.patient_age(),
        "gender": query.patient_gender(),
        "seed": seed,
    })
}

/// Diversity seed in `0..10000`, derived from the wall clock
pub fn diversity_seed() -> u32 {
    (chrono::Utc::now().timestamp_millis().rem_euclid(10_000)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(age: Option<i64>, gender: Option<&str>) -> SymptomQuery {
        SymptomQuery::new("đau đầu & sốt <38°C>", age, gender.map(String::from)).unwrap()
    }

    #[test]
    fn test_builtin_prompts_compile() {
        let book = PromptBook::builtin().unwrap();
        assert_eq!(book.version(), "1.0");
    }

    #[test]
    fn test_structured_prompt_carries_seed() {
        let book = PromptBook::builtin().unwrap();
        let prompt = book.render(StrategyKind::Structured, &query(Some(30), Some("nam")), 4242).unwrap();

        assert!(prompt.system.unwrap().contains("seed: 4242"));
        assert!(prompt.user.contains("Tuổi: 30."));
        assert!(prompt.user.contains("Giới tính: nam."));
        assert!(prompt.user.contains("\"primary_diagnosis\""));
    }

    #[test]
    fn test_symptoms_not_escaped() {
        let book = PromptBook::builtin().unwrap();
        let prompt = book.render(StrategyKind::FreeText, &query(None, None), 1).unwrap();

        assert!(prompt.user.contains("đau đầu & sốt <38°C>"));
        assert!(!prompt.user.contains("&amp;"));
        assert!(!prompt.user.contains("Độ tuổi"));
        assert!(prompt.system.is_none());
    }

    #[test]
    fn test_missing_strategy_rejected() {
        let file = PromptsFile::from_yaml(
            r#"
version: "2.0"
prompts:
  structured:
    user: "{{symptoms}}"
"#,
        )
        .unwrap();
        assert!(matches!(PromptBook::new(file), Err(TriageError::Template(_))));
    }

    #[test]
    fn test_custom_file() {
        let file = PromptsFile::from_yaml(
            r#"
version: "2.0"
prompts:
  structured:
    system: "seed={{seed}}"
    user: "S: {{symptoms}}"
  free_text:
    user: "F: {{symptoms}}{{#if age}} ({{age}}){{/if}}"
"#,
        )
        .unwrap();
        let book = PromptBook::new(file).unwrap();

        let prompt = book.render(StrategyKind::FreeText, &query(Some(7), None), 0).unwrap();
        assert_eq!(prompt.user, "F: đau đầu & sốt <38°C> (7)");
    }

    #[test]
    fn test_seed_range() {
        assert!(diversity_seed() < 10_000);
    }
}
