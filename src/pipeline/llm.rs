//! Language-model field extraction: recognised text → record via an LLM.
//!
//! An alternative to the pattern extractors in [`super::extract`] for
//! free-form text (dictated answers, handwritten forms OCR'd into prose).
//! The model is asked for a bare JSON object with the five record keys; any
//! key it leaves out becomes the empty string. Unlike the pattern path, the
//! model may fill `message`.
//!
//! Provider resolution follows the usual order:
//! 1. explicit provider name (+ model) from [`LlmConfig`]
//! 2. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`
//! 3. `OPENAI_API_KEY` present → OpenAI
//! 4. `ProviderFactory::from_env` auto-detection

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::output::ExtractedRecord;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// System prompt: the five keys, JSON only, empty string when absent.
pub const FIELD_PROMPT: &str = "\
You extract contact-form fields from text.

Return ONLY a JSON object with exactly these string keys:
name, email, phone, age, message

Copy values as written in the text. If a field is not mentioned, use an \
empty string. Do not wrap the JSON in code fences.";

/// Fills an [`ExtractedRecord`] by asking an LLM.
pub struct LlmExtractor {
    provider: Arc<dyn LLMProvider>,
    config: LlmConfig,
}

impl std::fmt::Debug for LlmExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmExtractor")
            .field("provider", &"<dyn LLMProvider>")
            .field("config", &self.config)
            .finish()
    }
}

impl LlmExtractor {
    /// Wrap a pre-built provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: LlmConfig) -> Self {
        Self { provider, config }
    }

    /// Resolve a provider from `config` and the environment.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let provider = resolve_provider(&config)?;
        Ok(Self::new(provider, config))
    }

    /// Ask the model for the record fields of `text`.
    pub async fn extract(&self, text: &str) -> Result<ExtractedRecord, LlmError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::system(FIELD_PROMPT), ChatMessage::user(text)];
        let options = build_options(&self.config);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        debug!(
            "LLM extraction: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        parse_reply(&response.content)
    }
}

fn build_options(config: &LlmConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, LlmError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        LlmError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn resolve_provider(config: &LlmConfig) -> Result<Arc<dyn LLMProvider>, LlmError> {
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| LlmError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "no provider could be auto-detected; set OPENAI_API_KEY, \
                 ANTHROPIC_API_KEY or --llm-provider ({e})"
            ),
        })?;
    Ok(provider)
}

/// Turn the model's reply into a record.
///
/// Tolerates a surrounding code fence and numeric values (`"age": 34`);
/// `null`, missing keys and unknown keys are ignored.
pub fn parse_reply(content: &str) -> Result<ExtractedRecord, LlmError> {
    let body = strip_fence(content.trim());
    let map: Map<String, Value> =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidReply(format!("{e}: {body}")))?;

    let field = |key: &str| match map.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    Ok(ExtractedRecord {
        name: field("name"),
        email: field("email"),
        phone: field("phone"),
        age: field("age"),
        message: field("message"),
    })
}

fn strip_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
