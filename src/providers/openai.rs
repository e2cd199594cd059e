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

/// OpenAI chat completions; failures propagate to the caller
pub struct OpenAiAdapter {
    client: Client<OpenAIConfig>,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: openai_client(api_key, api_base),
        }
    }

    /// Build a request carrying the prompt as the sole user message
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
            .build()?)
    }
}

#[async_trait]
impl TextGenerator for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AdapterError> {
        let request = self.build_request(model, prompt)?;
        let response = self.client.chat().create(request).await?;
        first_choice_content(response, "OpenAI")
    }
}
