//! Retrieval traits: semantic search over a document collection.
//!
//! Two capabilities sit behind these traits:
//! - an [`Embedder`] that turns text into a vector
//! - a [`VectorStore`] that opens a named [`Collection`] and answers
//!   nearest-document queries against an embedding
//!
//! Implementations live in `lumen-memory` (Chroma over HTTP, in-memory).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RetrievalError;

/// Turns text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// A backend that hosts named document collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logs (e.g., "chroma").
    fn name(&self) -> &str;

    /// Open (or create) a collection by name.
    ///
    /// Called at most once per process by the retrieval augmenter.
    async fn open_collection(&self, name: &str) -> Result<Arc<dyn Collection>, RetrievalError>;
}

/// An opened collection.
#[async_trait]
pub trait Collection: Send + Sync {
    /// The `n` nearest documents to `embedding`, in backend order.
    async fn query(
        &self,
        embedding: &[f32],
        n: usize,
    ) -> Result<Vec<ScoredDocument>, RetrievalError>;
}

/// Bibliographic metadata stored alongside a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Publication venue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,

    #[serde(
        default,
        deserialize_with = "year_from_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,

    /// Stable identifier (a DOI for research papers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

fn year_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A raw query hit, as returned by a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
    /// Backend distance; smaller is closer.
    pub distance: f32,
}

/// A document ready to be cited in a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub citation: String,
    /// Always within `[0, 1]`.
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_accepts_numeric_year() {
        let meta: DocumentMetadata = serde_json::from_value(serde_json::json!({
            "authors": "Smith J",
            "title": "Lithium outcomes",
            "year": 2021
        }))
        .unwrap();
        assert_eq!(meta.year.as_deref(), Some("2021"));
        assert!(meta.journal.is_none());
    }

    #[test]
    fn metadata_accepts_string_year_and_missing_fields() {
        let meta: DocumentMetadata =
            serde_json::from_value(serde_json::json!({ "year": "2019" })).unwrap();
        assert_eq!(meta.year.as_deref(), Some("2019"));
        assert!(meta.title.is_none());

        let empty: DocumentMetadata = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty, DocumentMetadata::default());
    }
}
