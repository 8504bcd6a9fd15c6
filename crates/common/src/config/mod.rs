//! Configuration management for the CoCounsel engine
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Text-generation provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Chunking, search, and context budget configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Multi-agent orchestration configuration
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: cohere, openai, local
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

/// Wire format spoken by a text-generation provider
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// `{model, messages, max_tokens, temperature}` → `{choices:[{message:{content}}]}`
    OpenaiCompatible,
    /// `{contents:[{role, parts}]}` → `{candidates:[{content:{parts}}]}`
    Gemini,
    /// `{message, chat_history, preamble}` → `{text}`
    Cohere,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Provider identifier used by roles and fallback chains
    pub id: String,

    /// Request/response shape
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,

    /// Chat endpoint (for Gemini, the models base URL)
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// API key; when absent the provider is routed through the proxy
    pub api_key: Option<String>,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-call timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    /// Trusted proxy endpoint holding the real provider credentials
    pub proxy_url: Option<String>,

    /// Proxy call timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub proxy_timeout_secs: u64,

    /// Known providers
    #[serde(default = "default_provider_entries")]
    pub entries: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Chunk window size in tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Tokens shared between consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Maximum search results
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity for a result
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Character budget for the rendered context
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestrationConfig {
    /// Per-role provider call timeout in seconds
    #[serde(default = "default_role_timeout")]
    pub role_timeout_secs: u64,

    /// Provider used for the synthesis call
    #[serde(default = "default_synthesis_provider")]
    pub synthesis_provider: String,

    /// Provider order for simple Q&A fallback
    #[serde(default = "default_fallback_order")]
    pub fallback_order: Vec<String>,

    /// Role id → provider id overrides
    #[serde(default)]
    pub role_providers: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 180 }
fn default_embedding_provider() -> String { "cohere".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 10 }
fn default_provider_kind() -> ProviderKind { ProviderKind::OpenaiCompatible }
fn default_max_tokens() -> u32 { 4096 }
fn default_temperature() -> f32 { 0.7 }
fn default_provider_timeout() -> u64 { 60 }
fn default_chunk_size() -> usize { 500 }
fn default_chunk_overlap() -> usize { 50 }
fn default_top_k() -> usize { 5 }
fn default_min_score() -> f32 { 0.3 }
fn default_max_context_chars() -> usize { 4000 }
fn default_role_timeout() -> u64 { 90 }
fn default_synthesis_provider() -> String { "cerebras".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "cocounsel".to_string() }

fn default_fallback_order() -> Vec<String> {
    ["cerebras", "together", "mistral", "gemini"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn openai_compatible(id: &str, endpoint: &str, model: &str) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        kind: ProviderKind::OpenaiCompatible,
        endpoint: endpoint.to_string(),
        model: model.to_string(),
        api_key: None,
        max_tokens: default_max_tokens(),
        temperature: default_temperature(),
        timeout_secs: default_provider_timeout(),
    }
}

fn default_provider_entries() -> Vec<ProviderConfig> {
    vec![
        openai_compatible("cerebras", "https://api.cerebras.ai/v1/chat/completions", "llama-3.3-70b"),
        openai_compatible("groq", "https://api.groq.com/openai/v1/chat/completions", "llama-3.3-70b-versatile"),
        openai_compatible("together", "https://api.together.xyz/v1/chat/completions", "meta-llama/Llama-3.3-70B-Instruct-Turbo"),
        openai_compatible("mistral", "https://api.mistral.ai/v1/chat/completions", "mistral-small-latest"),
        openai_compatible("kimia", "https://api.kimia.ai/v1/chat/completions", "kimia-v1"),
        ProviderConfig {
            kind: ProviderKind::Gemini,
            ..openai_compatible("gemini", "https://generativelanguage.googleapis.com/v1beta/models", "gemini-1.5-flash")
        },
        ProviderConfig {
            kind: ProviderKind::Cohere,
            ..openai_compatible("cohere", "https://api.cohere.ai/v1/chat", "command-r")
        },
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            proxy_timeout_secs: default_provider_timeout(),
            entries: default_provider_entries(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            min_score: default_min_score(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            role_timeout_secs: default_role_timeout(),
            synthesis_provider: default_synthesis_provider(),
            fallback_order: default_fallback_order(),
            role_providers: HashMap::new(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__RETRIEVAL__TOP_K=8
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get per-role provider timeout as Duration
    pub fn role_timeout(&self) -> Duration {
        Duration::from_secs(self.orchestration.role_timeout_secs)
    }

    /// Look up a provider entry by id
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.entries.iter().find(|p| p.id == id)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
            providers: ProvidersConfig::default(),
            retrieval: RetrievalConfig::default(),
            orchestration: OrchestrationConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.embedding.dimension, 1024);
        assert_eq!(config.retrieval.chunk_size, 500);
        assert_eq!(config.retrieval.chunk_overlap, 50);
        assert_eq!(config.retrieval.max_context_chars, 4000);
        assert!((config.retrieval.min_score - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_default_providers() {
        let config = AppConfig::default();
        assert_eq!(config.provider("gemini").map(|p| p.kind), Some(ProviderKind::Gemini));
        assert_eq!(config.provider("cohere").map(|p| p.kind), Some(ProviderKind::Cohere));
        assert_eq!(
            config.provider("groq").map(|p| p.kind),
            Some(ProviderKind::OpenaiCompatible)
        );
        assert!(config.provider("nonexistent").is_none());
        for provider in &config.orchestration.fallback_order {
            assert!(config.provider(provider).is_some(), "{provider} not configured");
        }
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                "[retrieval]\ntop_k = 8\n[orchestration]\nrole_timeout_secs = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.chunk_size, 500);
        assert_eq!(config.role_timeout(), Duration::from_secs(5));
        assert_eq!(config.orchestration.synthesis_provider, "cerebras");
        assert_eq!(config.providers.entries.len(), 7);
    }
}
