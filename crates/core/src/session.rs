//! Durable local record of a chat transcript.

use crate::error::StoreError;
use crate::message::Transcript;

/// Persists the transcript as one whole snapshot.
///
/// `save` overwrites the previous snapshot and is idempotent. `load` returns
/// the last snapshot, or an empty transcript if nothing was saved. `clear`
/// erases the persisted snapshot.
pub trait TranscriptStore: Send + Sync {
    fn save(&self, transcript: &Transcript) -> Result<(), StoreError>;

    fn load(&self) -> Result<Transcript, StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}
