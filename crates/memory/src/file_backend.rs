//! File-based transcript store: one JSON snapshot per data directory.
//!
//! The whole transcript is rewritten on every save. Writes go to a sibling
//! temporary file first and are renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.
//!
//! Storage location: `~/.lumen/data/lumen-chat-messages.json`

use std::path::{Path, PathBuf};

use lumen_core::error::StoreError;
use lumen_core::message::Transcript;
use lumen_core::session::TranscriptStore;
use tracing::{debug, warn};

/// Fixed key the transcript snapshot is stored under.
pub const TRANSCRIPT_KEY: &str = "lumen-chat-messages.json";

pub struct FileTranscriptStore {
    path: PathBuf,
}

impl FileTranscriptStore {
    /// Store the snapshot under `TRANSCRIPT_KEY` inside `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(TRANSCRIPT_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptStore for FileTranscriptStore {
    fn save(&self, transcript: &Transcript) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::io("creating the data directory", e))?;
        }

        let content = serde_json::to_string_pretty(transcript)?;
        replace_file(&self.path, &content)?;

        debug!(path = %self.path.display(), messages = transcript.len(), "Transcript saved");
        Ok(())
    }

    fn load(&self) -> Result<Transcript, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Transcript::new()),
            Err(e) => return Err(StoreError::io("reading the snapshot", e)),
        };

        match serde_json::from_str(&content) {
            Ok(transcript) => Ok(transcript),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable transcript snapshot"
                );
                Ok(Transcript::new())
            }
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("removing the snapshot", e)),
        }
    }
}

/// Write `content` to a sibling temporary file, then rename it over `path`.
pub(crate) fn replace_file(path: &Path, content: &str) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(|e| StoreError::io("writing the snapshot", e))?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::io("replacing the snapshot", e))
}
