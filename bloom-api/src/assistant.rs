//! Conversation agent interface
//!
//! Chat messages are answered by an external agent service; this module
//! defines the seam and the HTTP client for it. When no agent endpoint is
//! configured the fallback implementation fails every request, which the
//! record tracker preserves as a failed record with the error attached —
//! the honest outcome, rather than a silently swallowed message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Assistant errors.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Agent error {0}: {1}")]
    Api(u16, String),

    #[error("Malformed agent response: {0}")]
    Malformed(String),

    #[error("assistant endpoint not configured")]
    Unconfigured,
}

/// External conversation agent.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Produce a reply to a submitted chat message.
    async fn respond(
        &self,
        author: &str,
        session_key: &str,
        message: &str,
    ) -> Result<String, AssistantError>;
}

#[derive(Debug, Serialize)]
struct AgentRequest<'a> {
    author: &'a str,
    #[serde(rename = "sessionKey")]
    session_key: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct AgentResponse {
    reply: String,
}

/// HTTP client for a configured agent endpoint.
pub struct HttpAssistant {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpAssistant {
    pub fn new(endpoint: String) -> Result<Self, AssistantError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AssistantError::Network(e.to_string()))?;

        Ok(Self { http_client, endpoint })
    }
}

#[async_trait]
impl Assistant for HttpAssistant {
    async fn respond(
        &self,
        author: &str,
        session_key: &str,
        message: &str,
    ) -> Result<String, AssistantError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&AgentRequest { author, session_key, message })
            .send()
            .await
            .map_err(|e| AssistantError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api(status.as_u16(), body));
        }

        let parsed: AgentResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Malformed(e.to_string()))?;

        Ok(parsed.reply)
    }
}

/// Fallback used when no agent endpoint is configured.
pub struct UnconfiguredAssistant;

#[async_trait]
impl Assistant for UnconfiguredAssistant {
    async fn respond(&self, _: &str, _: &str, _: &str) -> Result<String, AssistantError> {
        Err(AssistantError::Unconfigured)
    }
}
