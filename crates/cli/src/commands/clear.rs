//! `lumen clear`: erase the saved conversation.

use lumen_config::AppConfig;
use lumen_core::session::TranscriptStore;
use lumen_memory::FileTranscriptStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = FileTranscriptStore::new(config.client.data_dir());
    store.clear()?;
    println!("  Conversation cleared ({})", store.path().display());
    Ok(())
}
