//! OpenAI-compatible provider
//!
//! Works with any API that implements the OpenAI chat completions format:
//! - DeepSeek (api.deepseek.com), the default
//! - OpenAI (api.openai.com)
//! - vLLM, LM Studio and other local servers
//!
//! Streaming is never requested; every call is one request, one reply.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::CompletionConfig;
use crate::conversation::Turn;

use super::{CompletionClient, CompletionRequest, ProviderError};

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [Turn],
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    presence_penalty: f32,
    frequency_penalty: f32,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone)]
pub struct OpenAICompatConfig {
    /// Base URL for the API (e.g., https://api.deepseek.com/v1)
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Model used when a request does not name one
    pub default_model: String,
}

impl From<&CompletionConfig> for OpenAICompatConfig {
    fn from(config: &CompletionConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            default_model: config.model.clone(),
        }
    }
}

/// OpenAI-compatible API provider
pub struct OpenAICompatProvider {
    config: OpenAICompatConfig,
    client: Client,
}

impl OpenAICompatProvider {
    /// Create a new provider with the given configuration.
    ///
    /// No client-level timeout is set: callers bound each request themselves.
    pub fn new(config: OpenAICompatConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = ChatCompletionRequest {
            messages: &request.messages,
            model: request
                .model
                .as_deref()
                .unwrap_or(&self.config.default_model),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            presence_penalty: request.presence_penalty,
            frequency_penalty: request.frequency_penalty,
        };

        let mut req_builder = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }

        tracing::debug!(
            model = body.model,
            turns = request.messages.len(),
            "sending completion request"
        );

        let response = req_builder
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::InvalidResponse(format!(
                "Failed to parse response: {} - Body: {}",
                e, text
            ))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("No message content in response".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestProfile;
    use mockito::Matcher;
    use serde_json::json;

    fn provider_for(server: &mockito::ServerGuard) -> OpenAICompatProvider {
        OpenAICompatProvider::new(OpenAICompatConfig {
            base_url: server.url(),
            api_key: Some("test-key".to_string()),
            default_model: "deepseek-chat".to_string(),
        })
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            vec![Turn::system("be brief"), Turn::user("First foods?")],
            &RequestProfile::chat(),
        )
    }

    #[test]
    fn test_config_from_completion_settings() {
        let settings = CompletionConfig {
            base_url: "http://localhost:8000/v1/".to_string(),
            api_key: None,
            model: "llama-3".to_string(),
        };
        let config = OpenAICompatConfig::from(&settings);
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert!(config.api_key.is_none());
        assert_eq!(config.default_model, "llama-3");
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "deepseek-chat",
                "stream": false,
                "max_tokens": 500,
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "First foods?" }
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Try mashed banana."}}]}"#)
            .create_async()
            .await;

        let reply = provider_for(&server).complete(&request()).await.unwrap();
        assert_eq!(reply, "Try mashed banana.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body(r#"{"error":{"message":"overloaded"}}"#)
            .create_async()
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        match err {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
        assert!(!err.is_timeout());
    }
}
