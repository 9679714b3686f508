//! services/api/src/adapters/itinerary_llm.rs
//!
//! This module contains the adapter for the itinerary-writing LLM.
//! It implements the `ItineraryGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use descubre_core::ports::{ItineraryGenerationService, PortError, PortResult};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ItineraryGenerationService` using an OpenAI chat model.
#[derive(Clone)]
pub struct OpenAiItineraryAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiItineraryAdapter {
    /// Creates a new `OpenAiItineraryAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client,
            model,
            temperature,
            max_tokens,
        }
    }
}

//=========================================================================================
// `ItineraryGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ItineraryGenerationService for OpenAiItineraryAdapter {
    /// Sends the compiled prompt as a single user message and returns the trimmed completion.
    async fn generate_itinerary(&self, prompt: &str) -> PortResult<String> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!("Requesting itinerary from model {}", self.model);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(PortError::Unexpected(
                "Itinerary LLM response contained no text content.".to_string(),
            ));
        }
        Ok(text)
    }
}
