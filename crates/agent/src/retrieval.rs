//! Retrieval augmentation: relevant research for the latest user turn.
//!
//! # Flow
//!
//! 1. Open the configured collection, once per process (lazy)
//! 2. Embed the query text
//! 3. Ask the collection for its `k` nearest documents
//! 4. Convert distance to similarity, format citations, sort best first
//!
//! Retrieval is best-effort. Callers treat every error here as "no sources".

use std::sync::Arc;

use lumen_core::error::RetrievalError;
use lumen_core::retrieval::{
    Collection, DocumentMetadata, Embedder, RetrievedDocument, ScoredDocument, VectorStore,
};
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub struct RetrievalAugmenter {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    collection_name: String,
    collection: OnceCell<Arc<dyn Collection>>,
}

impl RetrievalAugmenter {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        collection_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection_name: collection_name.into(),
            collection: OnceCell::new(),
        }
    }

    /// Whether the collection has been opened successfully.
    pub fn is_initialized(&self) -> bool {
        self.collection.initialized()
    }

    /// Open the collection on first use.
    ///
    /// A failed attempt leaves the cell empty, so a later request retries.
    /// Every failure surfaces as [`RetrievalError::Unavailable`].
    async fn collection(&self) -> Result<&Arc<dyn Collection>, RetrievalError> {
        self.collection
            .get_or_try_init(|| async {
                let collection = self
                    .store
                    .open_collection(&self.collection_name)
                    .await
                    .map_err(|e| match e {
                        RetrievalError::Unavailable(_) => e,
                        other => RetrievalError::Unavailable(other.to_string()),
                    })?;
                info!(
                    backend = self.store.name(),
                    collection = %self.collection_name,
                    "Retrieval collection ready"
                );
                Ok::<_, RetrievalError>(collection)
            })
            .await
    }

    /// Up to `k` documents relevant to `query`, most similar first.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let collection = self.collection().await?;
        let embedding = self.embedder.embed(query).await?;
        let hits = collection.query(&embedding, k).await?;

        let mut documents: Vec<RetrievedDocument> = hits.into_iter().map(to_retrieved).collect();
        documents.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        documents.truncate(k);

        debug!(k, hits = documents.len(), "Retrieved documents");
        Ok(documents)
    }
}

fn to_retrieved(hit: ScoredDocument) -> RetrievedDocument {
    let similarity = (1.0 - hit.distance).clamp(0.0, 1.0);
    RetrievedDocument {
        citation: format_citation(&hit.metadata),
        content: hit.content,
        similarity: if similarity.is_nan() { 0.0 } else { similarity },
    }
}

/// Render `{authors}. "{title}". {venue} ({year}). ID: {identifier}`.
///
/// Absent or blank fields are left out together with their punctuation.
/// Field order never changes.
pub fn format_citation(metadata: &DocumentMetadata) -> String {
    fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    let venue = match (field(&metadata.journal), field(&metadata.year)) {
        (Some(journal), Some(year)) => Some(format!("{journal} ({year})")),
        (Some(journal), None) => Some(journal.to_string()),
        (None, Some(year)) => Some(format!("({year})")),
        (None, None) => None,
    };

    let parts: Vec<String> = [
        field(&metadata.authors).map(str::to_string),
        field(&metadata.title).map(|t| format!("\"{t}\"")),
        venue,
        field(&metadata.doi).map(|d| format!("ID: {d}")),
    ]
    .into_iter()
    .flatten()
    .collect();

    parts.join(". ")
}
