//! LLM Provider implementations for Lumen.
//!
//! All providers implement the `lumen_core::Provider` trait.

pub mod openai_compat;

use std::sync::Arc;
use std::time::Duration;

use lumen_core::provider::Provider;

pub use openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
///
/// A missing API key still yields a provider; it reports
/// `is_configured() == false` and fails every call with `NotConfigured`.
pub fn build_from_config(config: &lumen_config::AppConfig) -> Arc<dyn Provider> {
    let api_key = config.api_key.clone().unwrap_or_default();
    if api_key.trim().is_empty() {
        tracing::warn!("No language model API key configured");
    }

    Arc::new(OpenAiCompatProvider::with_timeout(
        &config.provider.name,
        &config.provider.base_url,
        api_key,
        Duration::from_secs(config.provider.timeout_secs),
    ))
}
