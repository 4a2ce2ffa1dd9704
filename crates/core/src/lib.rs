//! # Lumen Core
//!
//! Domain types, traits, and error definitions for the Lumen conversational
//! assistant. This crate has **no framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in
//! their respective crates:
//! - [`Provider`] in `lumen-providers`
//! - [`Embedder`], [`VectorStore`], [`ArticleStore`], [`TranscriptStore`] in `lumen-memory`

pub mod article;
pub mod error;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod retrieval;
pub mod session;
pub mod wire;

// Re-export key types at crate root for ergonomics
pub use article::{Article, ArticleStore, ArticleSummary};
pub use error::{ArticleError, ProviderError, RetrievalError, StoreError};
pub use message::{Message, Sender, Transcript};
pub use prompt::{PromptEnvelope, PromptSegment, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use retrieval::{
    Collection, DocumentMetadata, Embedder, RetrievedDocument, ScoredDocument, VectorStore,
};
pub use session::TranscriptStore;
pub use wire::{ChatRequest, ChatResponse, ErrorBody, Source};
