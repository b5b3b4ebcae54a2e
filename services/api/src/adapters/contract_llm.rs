//! services/api/src/adapters/contract_llm.rs
//!
//! This module contains the adapter for the contract LLM.
//! It implements the `AiDelegate` port from the `core` crate on top of the
//! OpenAI chat completions API.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use contract_core::ports::{AiDelegate, CompletionRequest, PortError, PortResult};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AiDelegate` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiContractAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiContractAdapter {
    /// Creates a new `OpenAiContractAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn delegate_error(e: impl ToString) -> PortError {
    PortError::AiDelegate(e.to_string())
}

/// Builds the chat request; JSON-only prompts switch the API into JSON mode.
fn build_chat_request(
    model: &str,
    request: &CompletionRequest,
) -> PortResult<CreateChatCompletionRequest> {
    let messages = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system_prompt.clone())
            .build()
            .map_err(delegate_error)?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(request.user_prompt.clone())
            .build()
            .map_err(delegate_error)?
            .into(),
    ];

    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(model)
        .messages(messages)
        .temperature(request.temperature)
        .max_completion_tokens(request.max_tokens)
        .n(1);
    if request.expects_json {
        args.response_format(ResponseFormat::JsonObject);
    }
    args.build().map_err(delegate_error)
}

//=========================================================================================
// `AiDelegate` Trait Implementation
//=========================================================================================

#[async_trait]
impl AiDelegate for OpenAiContractAdapter {
    async fn complete(&self, request: &CompletionRequest) -> PortResult<String> {
        let chat_request = build_chat_request(&self.model, request)?;

        debug!(
            "Sending {:?} request to model {} ({} prompt chars)",
            request.purpose,
            self.model,
            request.user_prompt.chars().count()
        );

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e: OpenAIError| delegate_error(e))?;

        // Extract the text content from the first choice in the response.
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            PortError::AiDelegate("Contract LLM returned no choices in its response.".to_string())
        })?;
        choice.message.content.ok_or_else(|| {
            PortError::AiDelegate("Contract LLM response contained no text content.".to_string())
        })
    }

    fn method_tag(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contract_core::ports::CompletionPurpose;

    fn completion(expects_json: bool) -> CompletionRequest {
        CompletionRequest {
            purpose: CompletionPurpose::RiskAnalysis,
            system_prompt: "You analyze contracts.".to_string(),
            user_prompt: "Analyze this.".to_string(),
            temperature: 0.3,
            max_tokens: 1500,
            expects_json,
        }
    }

    #[test]
    fn json_prompts_request_json_mode() {
        let request = build_chat_request("gpt-4o-mini", &completion(true)).unwrap();
        assert!(matches!(request.response_format, Some(ResponseFormat::JsonObject)));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.max_completion_tokens, Some(1500));
    }

    #[test]
    fn free_text_prompts_leave_the_format_unset() {
        let request = build_chat_request("gpt-4o-mini", &completion(false)).unwrap();
        assert!(request.response_format.is_none());
        assert_eq!(request.model, "gpt-4o-mini");
    }
}
