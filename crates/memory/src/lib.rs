//! Storage backends for Lumen.
//!
//! - retrieval: [`ChromaStore`] over HTTP, [`InMemoryVectorStore`] for tests
//! - embeddings: [`ProviderEmbedder`]
//! - transcripts: [`FileTranscriptStore`], [`InMemoryTranscriptStore`]
//! - articles: [`FileArticleStore`], [`InMemoryArticleStore`]

pub mod articles;
pub mod chroma;
pub mod embedder;
pub mod file_backend;
pub mod in_memory;
pub mod vector;

pub use articles::{FileArticleStore, InMemoryArticleStore};
pub use chroma::ChromaStore;
pub use embedder::ProviderEmbedder;
pub use file_backend::FileTranscriptStore;
pub use in_memory::{InMemoryTranscriptStore, InMemoryVectorStore, StoredDocument};
pub use vector::cosine_similarity;
