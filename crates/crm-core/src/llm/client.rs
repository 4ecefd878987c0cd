//! LLM API HTTP Client
//!
//! Talks to OpenAI-compatible chat-completion endpoints.

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::types::*;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completion API client
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder().build().map_err(Error::Http)?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create with custom base URL (for testing or custom endpoints)
    pub fn with_base_url(config: &LlmConfig, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(client)
    }

    /// Send a chat completion request
    pub async fn chat(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            "Sending chat completion: {} messages, {} tools",
            request.messages.len(),
            request.tools.as_ref().map(Vec::len).unwrap_or(0)
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("LLM API error: {} - {}", status, body);
            return Err(Error::LlmApi {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            Error::LlmResponse(format!("Failed to parse response: {} - {}", e, body))
        })?;

        info!(
            "LLM API response: finish_reason={:?}, tokens={}",
            parsed.choices.first().and_then(|c| c.finish_reason.as_deref()),
            parsed.usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0)
        );

        Ok(parsed)
    }

    /// Create a request builder bound to the configured model
    pub fn request_builder(&self) -> ChatRequestBuilder {
        ChatRequestBuilder::new(self.model.clone())
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key: "sk-test".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_default_base_url() {
        let client = LlmClient::new(&test_config()).unwrap();
        assert_eq!(client.base_url, "https://api.openai.com/v1");
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_chat_sends_bearer_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello!"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::with_base_url(&test_config(), server.uri()).unwrap();
        let request = client
            .request_builder()
            .message(ChatMessage::user("hi"))
            .build();
        let message = client.chat(&request).await.unwrap().into_message().unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.text_content(), "Hello!");
    }

    #[tokio::test]
    async fn test_chat_error_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "slow down"}})),
            )
            .mount(&server)
            .await;

        let client = LlmClient::with_base_url(&test_config(), server.uri()).unwrap();
        let request = client.request_builder().message(ChatMessage::user("hi")).build();
        let err = client.chat(&request).await.unwrap_err();

        match &err {
            Error::LlmApi { status, .. } => assert_eq!(*status, 429),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.details(), json!({"error": {"message": "slow down"}}));
    }

    #[tokio::test]
    async fn test_chat_unparseable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = LlmClient::with_base_url(&test_config(), server.uri()).unwrap();
        let request = client.request_builder().message(ChatMessage::user("hi")).build();
        assert!(matches!(
            client.chat(&request).await,
            Err(Error::LlmResponse(_))
        ));
    }
}
