use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One provider configuration selected for a request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Display name of the model, echoed back as `llmName`
    pub name: String,
    /// Provider-specific model identifier
    pub model: String,
    /// Provider family name, resolved against the registered adapters
    pub provider: String,
}

/// Judge scores for a single response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EvaluationMetrics {
    pub accuracy: u8,
    pub relevancy: u8,
    pub coherence: u8,
    pub completeness: u8,
    /// Judge rationale, or a diagnostic when judging failed
    pub notes: String,
}

impl EvaluationMetrics {
    /// Zeroed metrics carrying a failure note
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            accuracy: 0,
            relevancy: 0,
            coherence: 0,
            completeness: 0,
            notes: format!("Evaluation failed: {}", reason),
        }
    }
}

/// Generated text and its judged metrics for one provider configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResult {
    pub llm_name: String,
    pub response: String,
    pub metrics: EvaluationMetrics,
}

/// Flat metadata payload persisted with each experiment vector
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentMetadata {
    pub prompt: String,
    pub response: String,
    pub llm_name: String,
    pub model: String,
    pub provider: String,
    pub accuracy: u8,
    pub relevancy: u8,
    pub coherence: u8,
    pub completeness: u8,
    pub notes: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// A persisted (prompt, provider) evaluation; never mutated after creation
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ExperimentMetadata,
}

impl ExperimentRecord {
    /// Build a new record with a fresh time-ordered id
    pub fn new(
        vector: Vec<f32>,
        prompt: &str,
        config: &ProviderConfig,
        result: &ProviderResult,
    ) -> Self {
        let metrics = &result.metrics;
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            vector,
            metadata: ExperimentMetadata {
                prompt: prompt.to_string(),
                response: result.response.clone(),
                llm_name: result.llm_name.clone(),
                model: config.model.clone(),
                provider: config.provider.clone(),
                accuracy: metrics.accuracy,
                relevancy: metrics.relevancy,
                coherence: metrics.coherence,
                completeness: metrics.completeness,
                notes: metrics.notes.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }
}

/// A listed experiment; metadata is passed through as stored in the index
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExperimentSummary {
    pub id: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Body of `POST /evaluate`, also the shape of a CLI run file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvaluateRequest {
    pub prompt: String,
    #[serde(rename = "llmConfigs", alias = "llm_configs")]
    pub llm_configs: Vec<ProviderConfig>,
}

/// Successful response of `POST /evaluate`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvaluateResponse {
    pub prompt: String,
    pub results: Vec<ProviderResult>,
}

/// Successful response of `GET /evaluate`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentsResponse {
    pub experiments: Vec<ExperimentSummary>,
}
