//! Chroma vector database over its REST API.
//!
//! Only the two calls the retrieval path needs are implemented:
//! get-or-create a collection by name, and query it with an embedding.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lumen_core::error::RetrievalError;
use lumen_core::retrieval::{Collection, DocumentMetadata, ScoredDocument, VectorStore};
use serde::Deserialize;
use tracing::{debug, info};

pub struct ChromaStore {
    base_url: String,
    client: reqwest::Client,
}

impl ChromaStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Deserialize)]
struct CollectionBody {
    id: String,
}

#[async_trait]
impl VectorStore for ChromaStore {
    fn name(&self) -> &str {
        "chroma"
    }

    async fn open_collection(&self, name: &str) -> Result<Arc<dyn Collection>, RetrievalError> {
        let url = format!("{}/api/v1/collections", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "name": name, "get_or_create": true }))
            .send()
            .await
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Unavailable(format!(
                "collection '{name}' returned {status}: {body}"
            )));
        }

        let body: CollectionBody = response
            .json()
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("bad collection body: {e}")))?;

        info!(collection = name, id = %body.id, "Chroma collection initialized");

        Ok(Arc::new(ChromaCollection {
            url: format!("{url}/{}/query", body.id),
            client: self.client.clone(),
        }))
    }
}

pub struct ChromaCollection {
    url: String,
    client: reqwest::Client,
}

/// Chroma answers batched queries; every field is one list per query embedding.
#[derive(Debug, Default, Deserialize)]
struct QueryBody {
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<DocumentMetadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

impl QueryBody {
    /// Hits for the first (only) query embedding.
    fn into_documents(self) -> Vec<ScoredDocument> {
        let documents = first_row(self.documents);
        let mut metadatas = first_row(self.metadatas).into_iter();
        let mut distances = first_row(self.distances).into_iter();

        documents
            .into_iter()
            .map(|content| ScoredDocument {
                content: content.unwrap_or_default(),
                metadata: metadatas.next().flatten().unwrap_or_default(),
                distance: distances.next().unwrap_or(1.0),
            })
            .collect()
    }
}

fn first_row<T>(rows: Option<Vec<Vec<T>>>) -> Vec<T> {
    rows.and_then(|r| r.into_iter().next()).unwrap_or_default()
}

#[async_trait]
impl Collection for ChromaCollection {
    async fn query(
        &self,
        embedding: &[f32],
        n: usize,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let body = serde_json::json!({
            "query_embeddings": [embedding],
            "n_results": n,
            "include": ["documents", "metadatas", "distances"],
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::QueryFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::QueryFailed(format!("{status}: {text}")));
        }

        let parsed: QueryBody = response
            .json()
            .await
            .map_err(|e| RetrievalError::QueryFailed(format!("bad query body: {e}")))?;

        let documents = parsed.into_documents();
        debug!(hits = documents.len(), "Chroma query complete");
        Ok(documents)
    }
}
