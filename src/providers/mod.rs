//! Text generation adapters over heterogeneous provider APIs

mod gemini;
mod groq;
mod openai;

pub use gemini::{GeminiAdapter, NO_GEMINI_RESPONSE};
pub use groq::GroqAdapter;
pub use openai::OpenAiAdapter;

use async_openai::{Client, config::OpenAIConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, resolve_api_key};
use crate::error::{AdapterError, EvalError, EvalResult};

/// Closed set of provider families with an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Groq,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Groq => "Groq",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            "groq" => Ok(ProviderKind::Groq),
            _ => Err(EvalError::UnknownProvider(s.to_string())),
        }
    }
}

/// Uniform "generate text for a model and a prompt" capability.
///
/// Failure handling differs per provider: OpenAI and Groq return
/// [`AdapterError`] so the whole request aborts, Gemini absorbs its failures
/// into [`NO_GEMINI_RESPONSE`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AdapterError>;
}

/// Adapters keyed by provider family, shared read-only by every request
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn TextGenerator>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own kind, replacing any previous one
    pub fn with_adapter(mut self, adapter: Arc<dyn TextGenerator>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    /// Build all three adapters, resolving credentials from the environment
    pub fn from_config(config: &Config, openai: Arc<OpenAiAdapter>) -> Self {
        let groq = GroqAdapter::new(
            resolve_api_key(&config.groq.env_var_api_key),
            &config.groq.api_base,
        );
        let gemini = GeminiAdapter::new(
            resolve_api_key(&config.gemini.env_var_api_key),
            &config.gemini.api_base,
        );

        Self::new()
            .with_adapter(openai)
            .with_adapter(Arc::new(groq))
            .with_adapter(Arc::new(gemini))
    }

    /// Find the adapter for a provider name from a request
    pub fn resolve(&self, provider: &str) -> EvalResult<Arc<dyn TextGenerator>> {
        let kind = provider.parse::<ProviderKind>()?;
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| EvalError::UnknownProvider(provider.to_string()))
    }
}

/// Build an OpenAI-compatible client that never retries.
///
/// The default async-openai backoff keeps retrying rate-limited calls for
/// minutes; a zero elapsed-time budget surfaces the first failure instead.
pub(crate) fn openai_client(
    api_key: impl Into<String>,
    api_base: impl Into<String>,
) -> Client<OpenAIConfig> {
    let config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);
    let no_retry = backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Client::with_config(config).with_backoff(no_retry)
}

/// Take the first choice's content from a chat completion
fn first_choice_content(
    response: async_openai::types::CreateChatCompletionResponse,
    provider: &'static str,
) -> Result<String, AdapterError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(AdapterError::EmptyCompletion { provider })
}

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::json;

    /// A minimal chat completion body as returned by OpenAI-compatible APIs
    pub fn chat_completion_body(content: &str) -> String {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop",
                "logprobs": null
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 1, "total_tokens": 6}
        })
        .to_string()
    }
}
