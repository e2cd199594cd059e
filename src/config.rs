use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// HTTP service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the service listens on
    pub bind: String,
    /// Number of experiments returned by the listing endpoint
    pub listing_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            listing_limit: 10,
        }
    }
}

/// OpenAI chat completion endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,
    /// Environment variable name containing the API key
    pub env_var_api_key: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            env_var_api_key: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Groq's OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GroqConfig {
    pub api_base: String,
    pub env_var_api_key: String,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            env_var_api_key: "GROQ_API_KEY".to_string(),
        }
    }
}

/// Gemini generate-content endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_base: String,
    pub env_var_api_key: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            env_var_api_key: "GEMINI_API_KEY".to_string(),
        }
    }
}

/// Judge model, served through the OpenAI endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub model: String,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
        }
    }
}

/// Embedding model, served through the OpenAI endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    /// Expected output dimension of `model`
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }
}

/// Vector index service holding experiment records
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index data-plane host, e.g. `https://experiments-abc123.svc.pinecone.io`
    pub host: String,
    pub env_var_api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Length of the all-zero query vector used for listing
    pub dimension: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:5080".to_string(),
            env_var_api_key: "PINECONE_API_KEY".to_string(),
            namespace: None,
            dimension: 1536,
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub groq: GroqConfig,
    pub gemini: GeminiConfig,
    pub judge: JudgeConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Read a credential from the environment.
///
/// A missing variable is not an error here: the upstream rejects the empty
/// key at call time.
pub fn resolve_api_key(env_var: &str) -> String {
    match std::env::var(env_var) {
        Ok(key) => key,
        Err(_) => {
            tracing::warn!(env_var, "credential not set; calls to this upstream will fail");
            String::new()
        }
    }
}
