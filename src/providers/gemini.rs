use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ProviderKind, TextGenerator};
use crate::error::AdapterError;

/// Returned whenever the Gemini call fails for any reason
pub const NO_GEMINI_RESPONSE: &str = "No response from Gemini.";

/// Raw HTTP client for Gemini's generate-content endpoint.
///
/// Never fails: non-success statuses and malformed bodies degrade to
/// [`NO_GEMINI_RESPONSE`] so one provider cannot abort the batch.
pub struct GeminiAdapter {
    http_client: Client,
    api_base: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiAdapter {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }

    async fn request(&self, model: &str, prompt: &str) -> Result<String, AdapterError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            model
        );
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or(AdapterError::EmptyCompletion { provider: "Gemini" })
    }
}

#[async_trait]
impl TextGenerator for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AdapterError> {
        match self.request(model, prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!(model, error = %e, "Gemini request failed; using placeholder");
                Ok(NO_GEMINI_RESPONSE.to_string())
            }
        }
    }
}
