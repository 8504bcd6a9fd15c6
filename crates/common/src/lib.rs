//! CoCounsel Common Library
//!
//! Shared code for the CoCounsel retrieval and analysis engine including:
//! - Chunk and search result models
//! - Embedding client abstraction with a deterministic local fallback
//! - LLM provider abstraction (direct and proxied clients)
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use embeddings::{Embedder, ResilientEmbedder};
pub use llm::{ProviderClient, ProviderRegistry};
pub use models::{Chunk, ChunkMetadata, SearchResult, SourceKind};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "embed-english-v3.0";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;
