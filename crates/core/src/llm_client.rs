use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ResponseFormat,
    },
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EvaluatorError;

/// A generic client for structured (JSON) completions from an LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends a system and user prompt and returns the model's reply parsed as
    /// a JSON object.
    async fn complete_json(
        &self,
        system_prompt: String,
        user_prompt: String,
    ) -> Result<Value, EvaluatorError>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The specific model identifier to use for chat completions (e.g., "gpt-4o").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    async fn send(
        &self,
        system_prompt: String,
        user_prompt: String,
    ) -> Result<CreateChatCompletionResponse, OpenAIError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()?
                    .into(),
            ])
            .response_format(ResponseFormat::JsonObject)
            .build()?;

        self.client.chat().create(request).await
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn complete_json(
        &self,
        system_prompt: String,
        user_prompt: String,
    ) -> Result<Value, EvaluatorError> {
        let response = self
            .send(system_prompt, user_prompt)
            .await
            .map_err(classify_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .unwrap_or("{}");
        debug!(model = %self.model, bytes = content.len(), "Received structured completion");

        let value: Value = serde_json::from_str(content)?;
        if !value.is_object() {
            return Err(EvaluatorError::Malformed(
                "expected a JSON object in the completion".to_string(),
            ));
        }
        Ok(value)
    }
}

/// Maps a provider error onto the evaluator's failure taxonomy.
pub fn classify_openai_error(err: OpenAIError) -> EvaluatorError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            if code == "insufficient_quota" || code == "rate_limit_exceeded" {
                EvaluatorError::QuotaExceeded(api.message)
            } else if code == "invalid_api_key"
                || (kind == "invalid_request_error" && is_auth_message(&api.message))
            {
                EvaluatorError::InvalidCredentials(api.message)
            } else {
                classify_message(api.message)
            }
        }
        OpenAIError::Reqwest(e) => {
            let message = e.to_string();
            match e.status().map(|s| s.as_u16()) {
                Some(429) => EvaluatorError::QuotaExceeded(message),
                Some(401) | Some(403) => EvaluatorError::InvalidCredentials(message),
                _ => {
                    warn!(error = %message, "Transport failure talking to the LLM provider");
                    EvaluatorError::Unavailable(message)
                }
            }
        }
        OpenAIError::JSONDeserialize(e) => EvaluatorError::Malformed(e.to_string()),
        other => EvaluatorError::Failed(other.to_string()),
    }
}

/// Classifies a bare provider message by the markers providers put in them.
pub fn classify_message(message: String) -> EvaluatorError {
    let lower = message.to_lowercase();
    if lower.contains("quota") || lower.contains("429") || lower.contains("rate limit") {
        EvaluatorError::QuotaExceeded(message)
    } else if is_auth_message(&message) {
        EvaluatorError::InvalidCredentials(message)
    } else {
        EvaluatorError::Failed(message)
    }
}

fn is_auth_message(message: &str) -> bool {
    message.contains("401") || message.to_lowercase().contains("api key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    fn api_error(message: &str, code: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: None,
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn test_quota_errors_are_classified() {
        assert!(matches!(
            classify_openai_error(api_error("You exceeded your current quota", Some("insufficient_quota"))),
            EvaluatorError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_openai_error(api_error("Request failed with status 429", None)),
            EvaluatorError::QuotaExceeded(_)
        ));
    }

    #[test]
    fn test_auth_errors_are_classified() {
        assert!(matches!(
            classify_openai_error(api_error("Incorrect API key provided", Some("invalid_api_key"))),
            EvaluatorError::InvalidCredentials(_)
        ));
        assert!(matches!(
            classify_message("401 Unauthorized".to_string()),
            EvaluatorError::InvalidCredentials(_)
        ));
    }

    #[test]
    fn test_other_api_errors_are_hard_failures() {
        assert!(matches!(
            classify_openai_error(api_error("The model does not exist", Some("model_not_found"))),
            EvaluatorError::Failed(_)
        ));
    }

    #[test]
    fn test_invalid_argument_is_hard_failure() {
        let err = classify_openai_error(OpenAIError::InvalidArgument("bad".to_string()));
        assert!(err.category().is_none());
    }
}
