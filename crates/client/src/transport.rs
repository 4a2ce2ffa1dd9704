//! Carrying a chat request to the gateway.

use std::time::Duration;

use async_trait::async_trait;
use lumen_core::wire::{ChatRequest, ChatResponse, ErrorBody};
use thiserror::Error;
use tracing::debug;

/// Why a chat request produced no reply.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request was abandoned before it completed.
    #[error("request cancelled")]
    Cancelled,

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Sends one chat request and waits for its reply.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: ChatRequest) -> Result<ChatResponse, TransportError>;
}

/// Posts chat requests to `{server}/api/chat`.
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> Self {
        Self::with_timeout(server_url, Duration::from_secs(120))
    }

    pub fn with_timeout(server_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: format!("{}/api/chat", server_url.trim_end_matches('/')),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: ChatRequest) -> Result<ChatResponse, TransportError> {
        debug!(
            endpoint = %self.endpoint,
            history = request.conversation_history.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Use the server's `{ "error" }` text when it sent one.
fn status_error(status: u16, body: &str) -> TransportError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string());
    TransportError::Status { status, message }
}
