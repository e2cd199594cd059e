use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;

use super::{ProviderKind, TextGenerator, first_choice_content, openai_client};
use crate::error::AdapterError;

// Sampling parameters are fixed for every Groq call.
const TEMPERATURE: f32 = 1.0;
const MAX_TOKENS: u16 = 1024;
const TOP_P: f32 = 1.0;
const FREQUENCY_PENALTY: f32 = 0.0;
const PRESENCE_PENALTY: f32 = 0.0;

/// Token some moderation-tuned Groq models answer with instead of a completion
const MODERATION_VERDICT: &str = "safe";

/// Returned in place of a bare moderation verdict
const MODERATION_PLACEHOLDER: &str = "The model returned only a moderation verdict (\"safe\") \
     instead of answering the prompt. Try a general-purpose chat model for this provider.";

/// Groq's OpenAI-compatible chat completions; transport failures propagate
pub struct GroqAdapter {
    client: Client<OpenAIConfig>,
}

impl GroqAdapter {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: openai_client(api_key, api_base),
        }
    }

    fn build_request(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<CreateChatCompletionRequest, AdapterError> {
        let user_message: ChatCompletionRequestMessage =
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()?
                .into();

        Ok(CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![user_message])
            .temperature(TEMPERATURE)
            .max_tokens(MAX_TOKENS)
            .top_p(TOP_P)
            .frequency_penalty(FREQUENCY_PENALTY)
            .presence_penalty(PRESENCE_PENALTY)
            .build()?)
    }
}

/// Swap a bare moderation verdict for an explanation
fn replace_moderation_verdict(model: &str, content: String) -> String {
    if content.trim() == MODERATION_VERDICT {
        tracing::warn!(model, "Groq returned a moderation verdict instead of a completion");
        MODERATION_PLACEHOLDER.to_string()
    } else {
        content
    }
}

#[async_trait]
impl TextGenerator for GroqAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AdapterError> {
        let request = self.build_request(model, prompt)?;
        let response = self.client.chat().create(request).await?;
        let content = first_choice_content(response, "Groq")?;
        Ok(replace_moderation_verdict(model, content))
    }
}
