//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing `/chat/completions` and
//! `/embeddings` in the OpenAI wire format (OpenRouter, Ollama, vLLM, ...).

use std::time::Duration;

use async_trait::async_trait;
use lumen_core::error::ProviderError;
use lumen_core::prompt::{PromptEnvelope, Role};
use lumen_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_timeout(name, base_url, api_key, Duration::from_secs(120))
    }

    pub fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Convert a prompt envelope to OpenAI API messages.
    fn to_api_messages(envelope: PromptEnvelope) -> Vec<ApiMessage> {
        envelope
            .into_segments()
            .into_iter()
            .map(|s| ApiMessage {
                role: s.role.as_str().into(),
                content: s.text,
            })
            .collect()
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "Provider '{}' has no API key",
                self.name
            )));
        }
        Ok(())
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        if status == 200 {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        warn!(provider = %self.name, status, "Provider returned error");
        Err(classify_status(status, error_body))
    }
}

fn network_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Map a non-200 upstream status to a provider error.
fn classify_status(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

/// Pull the first choice's text out of a completion response.
fn first_choice_content(api_response: ApiResponse) -> Result<String, ProviderError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or(ProviderError::EmptyResponse)?;

    match choice.message.content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(ProviderError::EmptyResponse),
    }
}

#[async_trait]
impl lumen_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        self.ensure_configured()?;

        let segments = request.envelope.len();
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(request.envelope),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(
            provider = %self.name,
            model = %request.model,
            segments,
            "Sending completion request"
        );

        let response = self.post("chat/completions", &body).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let model = api_response.model.clone();
        let usage = api_response.usage.as_ref().map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        let content = first_choice_content(api_response)?;

        Ok(ProviderResponse {
            content,
            usage,
            model,
        })
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        self.ensure_configured()?;

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self.post("embeddings", &body).await?;

        let api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        Ok(EmbeddingResponse {
            embeddings: api_resp.data.into_iter().map(|d| d.embedding).collect(),
            model: api_resp.model,
        })
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::Provider;
    use lumen_core::prompt::PromptSegment;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let p = OpenAiCompatProvider::new("local", "http://localhost:11434/v1/", "k");
        assert_eq!(p.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn envelope_conversion_keeps_roles_and_order() {
        let envelope = PromptEnvelope::new(vec![
            PromptSegment::new(Role::System, "persona"),
            PromptSegment::new(Role::Assistant, "earlier"),
            PromptSegment::new(Role::User, "now"),
        ]);
        let api = OpenAiCompatProvider::to_api_messages(envelope);
        let roles: Vec<_> = api.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "assistant", "user"]);
        assert_eq!(api[2].content, "now");
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_status(429, String::new()),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_status(401, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        let err = classify_status(503, "overloaded".into());
        assert!(err.is_unavailable());
    }

    #[test]
    fn parse_completion_response() {
        let raw = r#"{
            "model": "gpt-4o-mini",
            "choices": [{ "message": { "role": "assistant", "content": "Hello!" } }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12 }
        }"#;
        let resp: ApiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.usage.as_ref().unwrap().total_tokens, 12);
        assert_eq!(first_choice_content(resp).unwrap(), "Hello!");
    }

    #[test]
    fn blank_or_missing_content_is_empty_response() {
        let raw = r#"{ "model": "m", "choices": [{ "message": { "content": "  " } }] }"#;
        let resp: ApiResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            first_choice_content(resp),
            Err(ProviderError::EmptyResponse)
        ));

        let resp: ApiResponse = serde_json::from_str(r#"{ "choices": [] }"#).unwrap();
        assert!(matches!(
            first_choice_content(resp),
            Err(ProviderError::EmptyResponse)
        ));
    }

    #[test]
    fn parse_embedding_response() {
        let raw = r#"{
            "data": [{ "embedding": [0.1, 0.2, 0.3], "index": 0 }],
            "model": "text-embedding-3-small"
        }"#;
        let resp: EmbeddingApiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.data[0].embedding.len(), 3);
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let p = OpenAiCompatProvider::new("openai", "http://127.0.0.1:9", "");
        assert!(!p.is_configured());

        let err = p
            .complete(ProviderRequest {
                model: "gpt-4o-mini".into(),
                envelope: PromptEnvelope::new(vec![PromptSegment::new(Role::User, "hi")]),
                temperature: 0.7,
                max_tokens: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
