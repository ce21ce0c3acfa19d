//! Chat-completions client for OpenAI-compatible endpoints.
//!
//! Configuration priority: explicit values from `config.toml` > environment
//! variables (`QUILL_API_KEY`, `QUILL_MODEL`, `QUILL_ENDPOINT`).

use async_trait::async_trait;
use quill_core::config::ModelConfig;
use quill_core::error::{QuillError, Result};
use quill_core::llm::{LanguageModel, ModelReply};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Sends each prompt as a single user message.
#[derive(Clone)]
pub struct OpenAiCompatibleModel {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            max_tokens: None,
        }
    }

    /// Builds a client from `config`, filling gaps from the environment.
    ///
    /// The API key only comes from `QUILL_API_KEY`.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = env::var("QUILL_API_KEY")
            .map_err(|_| QuillError::config("QUILL_API_KEY not found in environment variables"))?;

        let model = config
            .model_name
            .clone()
            .or_else(|| env::var("QUILL_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.into());
        let endpoint = config
            .endpoint
            .clone()
            .or_else(|| env::var("QUILL_ENDPOINT").ok())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.into());

        Ok(Self::new(api_key, model).with_endpoint(endpoint))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &ChatCompletionRequest, persona_id: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| QuillError::model(persona_id, format!("request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(persona_id, status, body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            QuillError::model(persona_id, format!("failed to parse response: {err}"))
        })?;

        extract_text_response(parsed)
            .ok_or_else(|| QuillError::model(persona_id, "response contained no content"))
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    async fn send(&self, prompt: &str, persona_id: &str) -> Result<ModelReply> {
        if prompt.trim().is_empty() {
            return Err(QuillError::validation("prompt must not be empty"));
        }

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
        };

        tracing::debug!(persona_id, model = %self.model, "Sending chat completion request");
        let text = self.send_request(&request, persona_id).await?;
        Ok(ModelReply::new(text))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
}

fn map_http_error(persona_id: &str, status: StatusCode, body: String) -> QuillError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);
    QuillError::model(persona_id, format!("HTTP {}: {}", status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_absent_max_tokens() {
        let body = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn first_choice_content_is_the_reply() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "Hello"}}, {"message": {"content": "x"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_response(parsed).as_deref(), Some("Hello"));

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(extract_text_response(empty).is_none());
    }

    #[test]
    fn http_errors_prefer_the_api_message() {
        let err = map_http_error(
            "aaron",
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "slow down", "type": "rate_limit"}}"#.into(),
        );
        assert!(err.is_transient_external());
        assert!(err.to_string().contains("HTTP 429: slow down"));

        let raw = map_http_error("aaron", StatusCode::BAD_GATEWAY, "upstream".into());
        assert!(raw.to_string().contains("HTTP 502: upstream"));
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_any_request() {
        let model = OpenAiCompatibleModel::new("key", "m").with_endpoint("http://127.0.0.1:9");
        let err = model.send("   ", "aaron").await.unwrap_err();
        assert!(err.is_validation());
    }
}
