//! Ollama native chat client (`POST /api/chat`)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    temperature: f32,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<i64>,
    #[serde(default)]
    eval_count: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Client for a local or remote Ollama server
pub struct OllamaClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
    temperature: Option<f32>,
}

impl OllamaClient {
    /// Create a new client for `api_base` (e.g. `http://localhost:11434`)
    pub fn new(api_base: impl Into<String>, default_model: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .http1_only()
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base,
            api_key: None,
            default_model: default_model.into(),
            temperature: None,
        }
    }

    /// Send a bearer token (for Ollama behind an authenticating proxy)
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn parse_response(response: ChatResponse) -> ProviderResult<LLMResponse> {
        if let Some(error) = response.error {
            return Err(ProviderError::ApiError(error));
        }

        let message = response
            .message
            .ok_or_else(|| ProviderError::InvalidResponse("No message in response".to_string()))?;

        if let Some(role) = message.role.as_deref() {
            if role != "assistant" {
                return Err(ProviderError::InvalidResponse(format!(
                    "Unexpected role in response: {}",
                    role
                )));
            }
        }

        let content = message
            .content
            .ok_or_else(|| ProviderError::InvalidResponse("No content in message".to_string()))?;

        let mut usage = HashMap::new();
        if let Some(prompt) = response.prompt_eval_count {
            usage.insert("prompt_tokens".to_string(), prompt);
        }
        if let Some(completion) = response.eval_count {
            usage.insert("completion_tokens".to_string(), completion);
        }

        Ok(LLMResponse {
            content,
            model: response.model,
            finish_reason: response.done_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let request = ChatRequest {
            model: &model,
            messages: &messages,
            stream: false,
            options: self.temperature.map(|temperature| RequestOptions { temperature }),
        };

        let url = format!("{}/api/chat", self.api_base);
        debug!(
            "Sending chat request to {} with model {} ({} messages)",
            url,
            model,
            messages.len()
        );

        let mut req_builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;
        Self::parse_response(parsed)
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}
