// OpenAI chat-completions adapter
// API Reference: https://platform.openai.com/docs/api-reference/chat

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAIAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    /// Point the adapter at a different endpoint (mock servers in tests,
    /// OpenAI-compatible gateways in deployments).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let messages: Vec<ChatMessage> = request
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect();

        let body = ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("OpenAI request failed: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                return Err(AppError::LLMApi(format!(
                    "OpenAI API error ({}): {} (type: {:?})",
                    status, parsed.error.message, parsed.error.error_type
                )));
            }

            return Err(AppError::LLMApi(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse OpenAI response: {e}")))?;

        let choice = chat_response
            .choices
            .first()
            .ok_or_else(|| AppError::LLMApi("OpenAI returned no choices".to_string()))?;

        let usage = chat_response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content: choice.message.content.clone().unwrap_or_default(),
            finish_reason: choice
                .finish_reason
                .clone()
                .unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LLMMessage;

    fn request() -> LLMRequest {
        LLMRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![LLMMessage::user("hello")],
            max_tokens: Some(16),
            temperature: Some(0.1),
        }
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(
                r#"{
                    "choices": [
                        {"message": {"content": "[]"}, "finish_reason": "stop"}
                    ],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
                }"#,
            )
            .create_async()
            .await;

        let adapter = OpenAIAdapter::with_base_url("test-key", &server.url());
        let response = adapter.create_chat_completion(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "[]");
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 12);
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error"}}"#)
            .create_async()
            .await;

        let adapter = OpenAIAdapter::with_base_url("bad-key", &server.url());
        let err = adapter.create_chat_completion(&request()).await.unwrap_err();

        match err {
            AppError::LLMApi(msg) => assert!(msg.contains("Incorrect API key")),
            other => panic!("expected LLMApi error, got {other:?}"),
        }
    }
}
