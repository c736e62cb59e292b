//! Gateway to the remote LLM completion service.
//!
//! The query pipeline talks to the model through [`CompletionClient`] so tests can
//! substitute a scripted implementation. The HTTP client posts an OpenAI-style
//! `chat/completions` request with a fixed system/user message pair, a single attempt
//! per call, and an explicit request timeout so an unresponsive endpoint cannot stall a
//! query indefinitely. Retry and backoff are deliberately absent at this layer; a
//! failure is surfaced to the pipeline, which folds it into the conversation.

use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport-level failure: timeout, DNS, connection refused.
    #[error("completion service unreachable: {0}")]
    Transport(String),
    /// Service answered with a non-success status.
    #[error("completion service returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status reported by the service.
        status: StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// Response body could not be decoded into an answer.
    #[error("malformed completion response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by completion backends.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate an answer for the composed system/user message pair.
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError>;
}

/// HTTP client for an OpenAI-compatible chat completion endpoint.
pub struct HttpCompletionClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpCompletionClient {
    /// Construct a client from the process configuration.
    pub fn from_config() -> Self {
        let config = get_config();
        Self::new(
            config.completion_base_url.clone(),
            config.completion_api_key.clone(),
            config.completion_model.clone(),
            Duration::from_secs(config.completion_timeout_secs),
        )
    }

    /// Construct a client against an explicit endpoint, mainly for tests.
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Self {
        let http = Client::builder()
            .user_agent("paperchat/0.2")
            .timeout(timeout)
            .build()
            .expect("Failed to construct reqwest::Client for completions");
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "stream": false,
        });

        let mut request = self.http.post(self.endpoint()).json(&payload);
        if let Some(key) = &self.api_key
            && !key.is_empty()
        {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|error| CompletionError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = CompletionError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Completion request failed");
            return Err(error);
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            CompletionError::InvalidResponse(format!("failed to decode response: {error}"))
        })?;

        let answer = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::InvalidResponse("response had no choices".into()))?;

        Ok(answer.trim().to_string())
    }
}
