//! Error taxonomy for the evaluation pipeline

use thiserror::Error;

/// Upstream provider transport or API failure
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("OpenAI-compatible API error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("{provider} returned no completion choices")]
    EmptyCompletion { provider: &'static str },
}

/// Failure to turn text into a vector
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("embedding is empty or undefined")]
    EmptyVector,

    #[error("embedding request failed: {0}")]
    Upstream(#[from] async_openai::error::OpenAIError),
}

/// Vector index persistence failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vector index error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse vector index response: {0}")]
    Parse(String),
}

/// Any error that aborts an evaluation request
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EvalResult<T> = Result<T, EvalError>;
