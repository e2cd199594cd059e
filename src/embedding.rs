use async_openai::{Client, config::OpenAIConfig, types::CreateEmbeddingRequestArgs};
use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::providers::openai_client;

/// Converts text into a fixed-dimension vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// OpenAI embeddings endpoint
pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl EmbeddingClient {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            client: openai_client(api_key, api_base),
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text)
            .build()?;
        let response = self.client.embeddings().create(request).await?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|embedding| embedding.embedding)
            .filter(|vector| !vector.is_empty())
            .ok_or(EmbeddingError::EmptyVector)?;

        // The index query vector is sized from config, so a mismatch here
        // means listing and storage disagree on dimension.
        if vector.len() != self.dimension {
            tracing::warn!(
                model = %self.model,
                expected = self.dimension,
                actual = vector.len(),
                "embedding dimension differs from configured dimension"
            );
        }

        Ok(vector)
    }
}
