//! The server side of a Lumen chat turn.
//!
//! 1. **Retrieve** research relevant to the latest user turn
//! 2. **Assemble** persona + research + trimmed history + new turns
//! 3. **Complete** the turn via the configured provider
//! 4. **Classify** failures into user-safe messages

pub mod chat;
pub mod context;
pub mod retrieval;

#[cfg(test)]
mod test_helpers;

pub use chat::{ChatError, ChatService, CompletionSettings};
pub use context::{AssembledPrompt, AssemblyMetadata, DropInfo, LayerStats, PromptAssembler};
pub use retrieval::{RetrievalAugmenter, format_citation};
