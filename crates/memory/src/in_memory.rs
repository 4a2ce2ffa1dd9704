//! In-memory backends: useful for testing and ephemeral sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lumen_core::error::{RetrievalError, StoreError};
use lumen_core::message::Transcript;
use lumen_core::retrieval::{Collection, DocumentMetadata, ScoredDocument, VectorStore};
use lumen_core::session::TranscriptStore;
use tokio::sync::RwLock;

use crate::vector::nearest;

/// A document held by an in-memory collection.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
}

/// A vector store whose collections live in a HashMap.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Arc<InMemoryCollection>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a document to a collection, creating the collection if needed.
    pub async fn insert(&self, collection: &str, document: StoredDocument) {
        let handle = {
            let mut collections = self.collections.write().await;
            collections
                .entry(collection.to_string())
                .or_insert_with(|| Arc::new(InMemoryCollection::default()))
                .clone()
        };
        handle.documents.write().await.push(document);
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn open_collection(&self, name: &str) -> Result<Arc<dyn Collection>, RetrievalError> {
        let mut collections = self.collections.write().await;
        let handle: Arc<dyn Collection> = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryCollection::default()))
            .clone();
        Ok(handle)
    }
}

#[derive(Default)]
pub struct InMemoryCollection {
    documents: RwLock<Vec<StoredDocument>>,
}

#[async_trait]
impl Collection for InMemoryCollection {
    async fn query(
        &self,
        embedding: &[f32],
        n: usize,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let documents = self.documents.read().await;
        let hits = nearest(
            documents.iter().map(|d| d.embedding.as_slice()),
            embedding,
            n,
        );

        Ok(hits
            .into_iter()
            .map(|(i, distance)| ScoredDocument {
                content: documents[i].content.clone(),
                metadata: documents[i].metadata.clone(),
                distance,
            })
            .collect())
    }
}

/// A transcript store that forgets everything when dropped.
#[derive(Default)]
pub struct InMemoryTranscriptStore {
    snapshot: Mutex<Option<Transcript>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TranscriptStore for InMemoryTranscriptStore {
    fn save(&self, transcript: &Transcript) -> Result<(), StoreError> {
        let mut snapshot = self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *snapshot = Some(transcript.clone());
        Ok(())
    }

    fn load(&self) -> Result<Transcript, StoreError> {
        let snapshot = self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(snapshot.clone().unwrap_or_default())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut snapshot = self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *snapshot = None;
        Ok(())
    }
}
