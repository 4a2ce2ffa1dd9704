//! `lumen serve`: start the HTTP API server.

use lumen_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Lumen Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.provider.model);
    println!(
        "   Retrieval: {}",
        if config.retrieval_enabled() {
            config.retrieval.chroma_url.as_str()
        } else {
            "disabled"
        }
    );
    if !config.has_api_key() {
        tracing::warn!("No API key configured; chat requests will fail until one is set");
    }

    lumen_gateway::start(config).await?;

    Ok(())
}
