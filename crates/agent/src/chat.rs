//! One server-side chat turn.
//!
//! # Flow
//!
//! 1. Normalize the request into user turns (reject if there are none)
//! 2. Refuse early if the provider has no credentials
//! 3. Retrieve research for the last user turn (best-effort)
//! 4. Assemble the prompt envelope
//! 5. Complete the turn and classify any failure

use std::sync::Arc;

use lumen_config::AppConfig;
use lumen_core::error::ProviderError;
use lumen_core::provider::{Provider, ProviderRequest};
use lumen_core::retrieval::RetrievedDocument;
use lumen_core::wire::{ChatRequest, ChatResponse, Source};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::context::PromptAssembler;
use crate::retrieval::RetrievalAugmenter;

/// Why a chat turn failed.
///
/// The `Display` text carries upstream detail for logs. Clients only ever
/// see [`ChatError::user_message`].
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no non-blank user turn in request")]
    InvalidInput,

    #[error("upstream rejected credentials: {0}")]
    UpstreamAuth(String),

    #[error("upstream rate limited")]
    UpstreamRateLimited,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("misconfigured: {0}")]
    Misconfigured(String),

    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl ChatError {
    /// HTTP status the gateway answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::UpstreamRateLimited | Self::UpstreamUnavailable(_) => 503,
            Self::UpstreamAuth(_) | Self::Misconfigured(_) | Self::Unknown(_) => 500,
        }
    }

    /// Text safe to show the user. Never includes upstream text.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput => "At least one message is required",
            Self::UpstreamAuth(_) => "Invalid API key configuration",
            Self::UpstreamRateLimited => "API rate limit exceeded. Please try again later.",
            Self::UpstreamUnavailable(_) => {
                "The language model service is currently unavailable. Please try again later."
            }
            Self::Misconfigured(_) => "Language model API key not configured",
            Self::Unknown(_) => "Unable to process your request at this time. Please try again.",
        }
    }
}

impl From<ProviderError> for ChatError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::AuthenticationFailed(detail) => Self::UpstreamAuth(detail),
            ProviderError::RateLimited { .. } => Self::UpstreamRateLimited,
            ProviderError::NotConfigured(detail) => Self::Misconfigured(detail),
            ref unavailable if unavailable.is_unavailable() => {
                Self::UpstreamUnavailable(unavailable.to_string())
            }
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Completion parameters for each turn.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_k: usize,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: None,
            top_k: 3,
        }
    }
}

pub struct ChatService {
    provider: Arc<dyn Provider>,
    retrieval: Option<Arc<RetrievalAugmenter>>,
    assembler: PromptAssembler,
    settings: CompletionSettings,
}

impl ChatService {
    pub fn new(
        provider: Arc<dyn Provider>,
        retrieval: Option<Arc<RetrievalAugmenter>>,
        assembler: PromptAssembler,
        settings: CompletionSettings,
    ) -> Self {
        Self {
            provider,
            retrieval,
            assembler,
            settings,
        }
    }

    /// Build from configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        retrieval: Option<Arc<RetrievalAugmenter>>,
    ) -> Self {
        let mut assembler = PromptAssembler::new(config.chat.token_budget)
            .with_reserve(config.chat.history_reserve);
        if let Some(persona) = &config.chat.persona_override {
            assembler = assembler.with_persona(persona.clone());
        }

        let settings = CompletionSettings {
            model: config.provider.model.clone(),
            temperature: config.provider.temperature,
            max_tokens: config.provider.max_tokens,
            top_k: config.chat.retrieval_top_k,
        };

        Self::new(provider, retrieval, assembler, settings)
    }

    /// Answer one chat request.
    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let turns = request.user_turns();
        let Some(last_turn) = turns.last() else {
            return Err(ChatError::InvalidInput);
        };

        if !self.provider.is_configured() {
            error!(provider = self.provider.name(), "Language model API key not configured");
            return Err(ChatError::Misconfigured(format!(
                "provider '{}' has no API key",
                self.provider.name()
            )));
        }

        let retrieved = self.retrieve(last_turn).await;

        let prompt = self
            .assembler
            .assemble(&turns, &request.conversation_history, &retrieved);
        debug!(
            total_tokens = prompt.metadata.total_tokens,
            budget = prompt.metadata.budget,
            segments = prompt.envelope.len(),
            history_dropped = prompt.metadata.drops.iter().map(|d| d.items_dropped).sum::<usize>(),
            "Prompt assembled"
        );

        let provider_request = ProviderRequest {
            model: self.settings.model.clone(),
            envelope: prompt.envelope,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self.provider.complete(provider_request).await.map_err(|e| {
            let err = ChatError::from(e);
            if matches!(err, ChatError::Unknown(_)) {
                error!(error = %err, "Chat completion failed");
            } else {
                warn!(error = %err, "Chat completion failed");
            }
            err
        })?;

        let text = response.content.trim();
        if text.is_empty() {
            error!(model = %response.model, "Provider returned an empty completion");
            return Err(ChatError::Unknown(ProviderError::EmptyResponse.to_string()));
        }

        info!(
            turns = turns.len(),
            sources = retrieved.len(),
            model = %response.model,
            "Chat turn complete"
        );

        Ok(ChatResponse {
            response: text.to_string(),
            sources: retrieved
                .into_iter()
                .map(|d| Source {
                    citation: d.citation,
                    similarity: d.similarity,
                })
                .collect(),
        })
    }

    /// Retrieval never fails the turn; errors become "no sources".
    async fn retrieve(&self, query: &str) -> Vec<RetrievedDocument> {
        let Some(retrieval) = &self.retrieval else {
            return Vec::new();
        };

        match retrieval.retrieve(query, self.settings.top_k).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "Retrieval skipped");
                Vec::new()
            }
        }
    }
}
