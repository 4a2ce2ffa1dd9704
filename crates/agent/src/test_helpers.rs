//! Shared test doubles for the agent crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lumen_core::error::{ProviderError, RetrievalError};
use lumen_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use lumen_core::retrieval::{Collection, Embedder, VectorStore};

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next result in the queue and records
/// the request it was given. Panics if more calls are made than scripted.
pub struct SequentialMockProvider {
    results: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    configured: bool,
}

impl SequentialMockProvider {
    pub fn new(results: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            results: Mutex::new(results),
            requests: Mutex::new(Vec::new()),
            configured: true,
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_text_response(text))])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// A provider that reports missing credentials and must never be called.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let mut results = self.results.lock().unwrap();

        if results.is_empty() {
            panic!(
                "SequentialMockProvider: no more responses (call #{})",
                requests.len()
            );
        }

        requests.push(request);
        results.remove(0)
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.to_string(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Embeds every text as the same vector.
pub struct StaticEmbedder(pub Vec<f32>);

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
        Ok(self.0.clone())
    }
}

/// A vector store whose collection can never be opened.
#[derive(Default)]
pub struct FailingVectorStore {
    attempts: AtomicUsize,
}

impl FailingVectorStore {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for FailingVectorStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn open_collection(&self, _name: &str) -> Result<Arc<dyn Collection>, RetrievalError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(RetrievalError::Unavailable("connection refused".into()))
    }
}
