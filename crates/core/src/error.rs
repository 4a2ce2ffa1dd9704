//! Error types for the Lumen domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned an empty completion")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether the upstream reported itself as overloaded or down.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ApiError {
                status_code: 502..=504,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Retrieval capability unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Nearest-document query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("Article not found")]
    NotFound,

    #[error("An article with this title already exists")]
    Conflict,

    #[error("Article storage failed: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize transcript: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn gateway_statuses_count_as_unavailable() {
        for status_code in [502, 503, 504] {
            let err = ProviderError::ApiError {
                status_code,
                message: String::new(),
            };
            assert!(err.is_unavailable());
        }
        let err = ProviderError::ApiError {
            status_code: 500,
            message: String::new(),
        };
        assert!(!err.is_unavailable());
        assert!(!ProviderError::EmptyResponse.is_unavailable());
    }

    #[test]
    fn article_errors_carry_user_text() {
        assert_eq!(ArticleError::NotFound.to_string(), "Article not found");
        assert_eq!(
            ArticleError::Conflict.to_string(),
            "An article with this title already exists"
        );
    }
}
