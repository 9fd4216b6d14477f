//! OpenAiCompletion - Chat Completions implementation of [`CompletionAdapter`].
//!
//! # Example
//!
//! ```rust,no_run
//! use docgen::adapter::{CompletionAdapter, OpenAiCompletion, OutputShape};
//! use docgen::message::Message;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // From environment variables (OPENAI_API_KEY, OPENAI_MODEL)
//! let completion = OpenAiCompletion::try_from_env()?;
//! let reply = completion
//!     .complete("You are terse.", &[Message::user("Say hi")], &OutputShape::Text)
//!     .await?;
//!
//! // Direct construction
//! let completion = OpenAiCompletion::new("your-api-key", "gpt-4o").with_temperature(0.2);
//! # Ok(())
//! # }
//! ```

use super::{CompletionAdapter, CompletionError, OutputShape};
use crate::extract::extract_json;
use crate::message::{Message, Role};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::env;
use tracing::debug;

const BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Completion adapter that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiCompletion {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiCompletion {
    /// Creates an adapter with the provided API key and model, at temperature 0.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// - `OPENAI_API_KEY` (required)
    /// - `OPENAI_MODEL` (optional, defaults to `gpt-4o-mini`)
    pub fn try_from_env() -> Result<Self, CompletionError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            CompletionError::Rejected("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let model = env::var("OPENAI_MODEL")
            .ok()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, model))
    }

    /// Points the adapter at another API root (proxies, compatible servers, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(
        &self,
        system_prompt: &str,
        messages: &[Message],
        shape: &OutputShape,
    ) -> ChatCompletionRequest {
        let mut chat = Vec::with_capacity(messages.len() + 1);
        chat.push(ChatMessage {
            role: Role::System.as_str(),
            content: system_prompt.to_string(),
        });
        chat.extend(messages.iter().map(ChatMessage::from_message));

        let response_format = match shape {
            OutputShape::Text => None,
            OutputShape::Json { name, schema } => Some(json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema_identifier(name),
                    "strict": false,
                    "schema": schema,
                },
            })),
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: chat,
            temperature: self.temperature,
            response_format,
        }
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest,
    ) -> Result<Option<String>, CompletionError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| CompletionError::Transport {
                status_code: None,
                message: format!("OpenAI API request failed: {err}"),
                retryable: err.is_connect() || err.is_timeout() || err.is_request(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            CompletionError::InvalidResponse(format!("Failed to parse OpenAI response: {err}"))
        })?;

        Ok(extract_content(parsed))
    }
}

#[async_trait]
impl CompletionAdapter for OpenAiCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        shape: &OutputShape,
    ) -> Result<Option<JsonValue>, CompletionError> {
        let request = self.build_request(system_prompt, messages, shape);
        debug!(
            model = %self.model,
            shape = shape.label(),
            messages = messages.len(),
            "Sending completion"
        );

        let Some(content) = self.send_request(&request).await? else {
            return Ok(None);
        };

        Ok(Some(coerce_content(content, shape)))
    }

    fn name(&self) -> String {
        format!("OpenAiCompletion({})", self.model)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonValue>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn from_message(message: &Message) -> Self {
        match message.role() {
            Role::Tool => Self {
                role: Role::User.as_str(),
                content: format!(
                    "[tool:{}] {}",
                    message.name().unwrap_or("unknown"),
                    message.content()
                ),
            },
            role => Self {
                role: role.as_str(),
                content: message.content().to_string(),
            },
        }
    }
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

fn extract_content(response: ChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
}

/// Text shapes pass through as a JSON string. JSON shapes are parsed, falling
/// back to the extraction helpers for fenced or chatty replies; text that still
/// isn't JSON is handed back as a string for the caller to reject.
fn coerce_content(content: String, shape: &OutputShape) -> JsonValue {
    match shape {
        OutputShape::Text => JsonValue::String(content),
        OutputShape::Json { .. } => serde_json::from_str(&content)
            .ok()
            .or_else(|| {
                extract_json(&content)
                    .ok()
                    .and_then(|json| serde_json::from_str(&json).ok())
            })
            .unwrap_or(JsonValue::String(content)),
    }
}

fn map_http_error(status: StatusCode, body: String) -> CompletionError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
            CompletionError::Rejected(format!("{} {}", status.as_u16(), message))
        }
        _ => CompletionError::Transport {
            status_code: Some(status.as_u16()),
            message,
            retryable: matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::REQUEST_TIMEOUT
                    | StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
        },
    }
}

/// The API only accepts `[a-zA-Z0-9_-]` in schema names.
fn schema_identifier(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
