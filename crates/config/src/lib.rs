//! Configuration loading, validation, and management for Lumen.
//!
//! Loads configuration from `~/.lumen/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.lumen/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion and embedding provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Prompt assembly and chat turn settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Semantic search settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Terminal client configuration
    #[serde(default)]
    pub client: ClientConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("chat", &self.chat)
            .field("retrieval", &self.retrieval)
            .field("gateway", &self.gateway)
            .field("client", &self.client)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Which system-segment cost is reserved before trimming history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryReserve {
    /// The final system segment, retrieved citations included.
    #[default]
    FullSystem,
    /// The persona and guidelines only, as if nothing had been retrieved.
    PersonaOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Context budget in estimated tokens
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Documents retrieved per turn
    #[serde(default = "default_top_k")]
    pub retrieval_top_k: usize,

    #[serde(default)]
    pub history_reserve: HistoryReserve,

    /// Replaces the introductory persona paragraph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_override: Option<String>,

    /// Text the client shows when a chat request fails
    #[serde(default = "default_error_reply")]
    pub error_reply: String,
}

fn default_token_budget() -> usize {
    30_000
}
fn default_top_k() -> usize {
    3
}
fn default_error_reply() -> String {
    "Sorry, I encountered an error. Please try again.".into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            retrieval_top_k: default_top_k(),
            history_reserve: HistoryReserve::default(),
            persona_override: None,
            error_reply: default_error_reply(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalBackend {
    #[default]
    Chroma,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: RetrievalBackend,

    #[serde(default = "default_chroma_url")]
    pub chroma_url: String,

    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_true() -> bool {
    true
}
fn default_chroma_url() -> String {
    "http://localhost:8000".into()
}
fn default_collection() -> String {
    "bipolar_studies".into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: RetrievalBackend::default(),
            chroma_url: default_chroma_url(),
            collection: default_collection(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Password for the admin login; admin routes are unusable without it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Where the article snapshot is kept; defaults to `~/.lumen/articles`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub articles_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
    3001
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            admin_password: None,
            max_body_bytes: default_max_body_bytes(),
            articles_dir: None,
        }
    }
}

impl GatewayConfig {
    pub fn articles_dir(&self) -> PathBuf {
        self.articles_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("articles"))
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("host", &self.host)
            .field("admin_password", &redact(&self.admin_password))
            .field("max_body_bytes", &self.max_body_bytes)
            .field("articles_dir", &self.articles_dir)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Where the transcript snapshot is kept; defaults to `~/.lumen/data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_server_url() -> String {
    "http://127.0.0.1:3001".into()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("data"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.lumen/config.toml).
    ///
    /// Environment variables override the file:
    /// - `LUMEN_API_KEY`, then `OPENAI_API_KEY`, then `OPENAI_KEY`
    /// - `LUMEN_MODEL`
    /// - `LUMEN_ADMIN_PASSWORD`, then `ADMIN_PASSWORD`
    /// - `CHROMA_DB_PATH`
    /// - `LUMEN_SERVER_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(k))
                .find(|v| !v.trim().is_empty())
        };

        if self.api_key.is_none() {
            self.api_key = first(&["LUMEN_API_KEY", "OPENAI_API_KEY", "OPENAI_KEY"]);
        }
        if let Some(model) = first(&["LUMEN_MODEL"]) {
            self.provider.model = model;
        }
        if let Some(password) = first(&["LUMEN_ADMIN_PASSWORD", "ADMIN_PASSWORD"]) {
            self.gateway.admin_password = Some(password);
        }
        if let Some(url) = first(&["CHROMA_DB_PATH"]) {
            self.retrieval.chroma_url = url;
        }
        if let Some(url) = first(&["LUMEN_SERVER_URL"]) {
            self.client.server_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".lumen")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.chat.token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "chat.token_budget must be > 0".into(),
            ));
        }

        if self.chat.retrieval_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "chat.retrieval_top_k must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Whether a retrieval backend should be wired up at all.
    pub fn retrieval_enabled(&self) -> bool {
        self.retrieval.enabled && self.retrieval.backend != RetrievalBackend::None
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderConfig::default(),
            chat: ChatConfig::default(),
            retrieval: RetrievalConfig::default(),
            gateway: GatewayConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
