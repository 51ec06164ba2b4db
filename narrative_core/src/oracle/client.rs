//! Completion transport: a trait seam plus an OpenAI-compatible client.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

/// One raw completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Anything that turns a prompt into raw model text.
pub trait CompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ClientError>;
}

/// Transport-level failures. Never retried by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("api key env variable {env} is missing or empty")]
    MissingApiKey { env: String },

    #[error("client build failed: {message}")]
    BuildClient { message: String },

    #[error("http request failed: {message}")]
    Http { message: String },

    #[error("http status {code}: {message}")]
    HttpStatus { code: u16, message: String },

    #[error("decode response failed: {message}")]
    DecodeResponse { message: String },

    #[error("empty completion choice")]
    EmptyChoice,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiChatClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::BuildClient {
                message: err.to_string(),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build from configuration, reading the API key from the configured
    /// environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ClientError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ClientError::MissingApiKey {
                env: config.api_key_env.clone(),
            })?;
        Self::new(
            &config.base_url,
            api_key,
            Duration::from_millis(config.timeout_ms.max(1)),
        )
    }
}

impl CompletionClient for OpenAiChatClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ClientError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatCompletionRequest {
            model: &request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .map_err(|err| ClientError::Http {
                message: err.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().unwrap_or_else(|_| "<no body>".to_string());
            return Err(ClientError::HttpStatus {
                code: status.as_u16(),
                message,
            });
        }

        let response: ChatCompletionResponse =
            response.json().map_err(|err| ClientError::DecodeResponse {
                message: err.to_string(),
            })?;

        let first = response
            .choices
            .into_iter()
            .next()
            .ok_or(ClientError::EmptyChoice)?;
        Ok(first.message.content.unwrap_or_default())
    }
}
