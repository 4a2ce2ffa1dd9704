//! Client session state: the saved transcript.
//!
//! Opening a session loads the last saved transcript. Every mutation writes
//! a full snapshot back. Clearing erases both the store and memory.

use std::sync::Arc;

use lumen_core::error::StoreError;
use lumen_core::message::{Message, Transcript};
use lumen_core::session::TranscriptStore;
use tracing::info;

pub struct ChatSession {
    transcript: Transcript,
    store: Arc<dyn TranscriptStore>,
}

impl ChatSession {
    /// Restore the session from `store`.
    pub fn open(store: Arc<dyn TranscriptStore>) -> Result<Self, StoreError> {
        let transcript = store.load()?;
        if !transcript.is_empty() {
            info!(messages = transcript.len(), "Restored chat transcript");
        }
        Ok(Self {
            transcript,
            store,
        })
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Append a message and persist the new snapshot.
    ///
    /// The message stays in memory even if persisting fails.
    pub fn push(&mut self, message: Message) -> Result<(), StoreError> {
        self.transcript.push(message);
        self.store.save(&self.transcript)
    }

    /// Forget the transcript, in memory and on disk.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.transcript.clear();
        self.store.clear()
    }
}
