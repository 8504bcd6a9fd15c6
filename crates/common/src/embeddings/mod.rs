//! Embedding service abstraction
//!
//! Provides a unified interface for multiple embedding providers:
//! - Cohere (embed-english-v3.0)
//! - OpenAI-compatible endpoints (OpenAI, Jina)
//! - A deterministic local hashing embedder
//!
//! Retrieval must degrade, not fail: [`ResilientEmbedder`] wraps an optional
//! remote provider and always answers with a vector of the configured
//! dimension, falling back to [`LocalEmbedder`] on any remote failure.

mod local;

pub use local::{LocalEmbedder, LEGAL_SALIENT_TERMS};

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Remote embedding wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingApi {
    /// `POST /v1/embed {texts, model, input_type}` → `{embeddings}`
    Cohere,
    /// `POST /embeddings {input, model}` → `{data:[{embedding}]}`
    OpenAiCompatible,
}

/// HTTP embedding client
pub struct HttpEmbedder {
    client: reqwest::Client,
    api: EmbeddingApi,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
}

#[derive(Serialize)]
struct CohereRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Deserialize)]
struct CohereResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create a new HTTP embedder
    pub fn new(
        api: EmbeddingApi,
        api_key: String,
        model: String,
        dimension: usize,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let base_url = base_url.unwrap_or_else(|| match api {
            EmbeddingApi::Cohere => "https://api.cohere.ai/v1".to_string(),
            EmbeddingApi::OpenAiCompatible => "https://api.openai.com/v1".to_string(),
        });

        Ok(Self {
            client,
            api,
            api_key,
            model,
            dimension,
            base_url,
        })
    }

    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = match self.api {
            EmbeddingApi::Cohere => self
                .client
                .post(format!("{}/embed", self.base_url))
                .json(&CohereRequest {
                    texts,
                    model: &self.model,
                    input_type: "search_document",
                }),
            EmbeddingApi::OpenAiCompatible => self
                .client
                .post(format!("{}/embeddings", self.base_url))
                .json(&OpenAIRequest {
                    input: texts,
                    model: &self.model,
                }),
        };

        let response = request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::EmbeddingDegraded {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingDegraded {
                message: format!("API error {}: {}", status, body),
            });
        }

        let vectors = match self.api {
            EmbeddingApi::Cohere => {
                let body: CohereResponse = response.json().await.map_err(|e| {
                    AppError::EmbeddingDegraded {
                        message: format!("Failed to parse response: {}", e),
                    }
                })?;
                body.embeddings
            }
            EmbeddingApi::OpenAiCompatible => {
                let body: OpenAIResponse = response.json().await.map_err(|e| {
                    AppError::EmbeddingDegraded {
                        message: format!("Failed to parse response: {}", e),
                    }
                })?;
                body.data.into_iter().map(|e| e.embedding).collect()
            }
        };

        if vectors.len() != texts.len() {
            return Err(AppError::EmbeddingDegraded {
                message: format!("expected {} embeddings, got {}", texts.len(), vectors.len()),
            });
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.make_request(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or_else(|| AppError::EmbeddingDegraded {
            message: "Empty response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        const BATCH_SIZE: usize = 96;

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            all_embeddings.extend(self.make_request(chunk).await?);
        }
        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedder that never fails.
///
/// Tries the remote provider when one is configured; any error, timeout,
/// or wrong-length vector is logged as a degradation and answered from the
/// local hashing embedder instead.
#[derive(Clone)]
pub struct ResilientEmbedder {
    remote: Option<Arc<dyn Embedder>>,
    local: LocalEmbedder,
}

impl ResilientEmbedder {
    pub fn new(remote: Option<Arc<dyn Embedder>>, dimension: usize) -> Self {
        Self {
            remote,
            local: LocalEmbedder::new(dimension),
        }
    }

    /// Offline embedder backed only by the local fallback
    pub fn local_only(dimension: usize) -> Self {
        Self::new(None, dimension)
    }

    pub fn is_degraded_only(&self) -> bool {
        self.remote.is_none()
    }

    /// Embed `text`, degrading to the local embedding on any remote failure
    pub async fn embed_or_fallback(&self, text: &str) -> Vec<f32> {
        if let Some(remote) = &self.remote {
            let start = Instant::now();
            match remote.embed(text).await {
                Ok(vector) if vector.len() == self.local.dimension() => {
                    metrics::record_embedding(start.elapsed().as_secs_f64(), "remote", true);
                    return vector;
                }
                Ok(vector) => {
                    let err = AppError::DimensionMismatch {
                        expected: self.local.dimension(),
                        actual: vector.len(),
                    };
                    self.log_degraded(remote.model_name(), &err);
                }
                Err(err) => self.log_degraded(remote.model_name(), &err),
            }
            metrics::record_embedding(start.elapsed().as_secs_f64(), "remote", false);
        }

        let start = Instant::now();
        let vector = self.local.embed_text(text);
        metrics::record_embedding(start.elapsed().as_secs_f64(), "local", true);
        vector
    }

    /// Embed many texts with one remote call.
    ///
    /// If that call fails or returns anything other than one vector of the
    /// configured dimension per text, the whole batch is embedded locally.
    /// The remote is never retried per text.
    pub async fn embed_batch_or_fallback(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if let Some(remote) = &self.remote {
            let start = Instant::now();
            match remote.embed_batch(texts).await {
                Ok(vectors)
                    if vectors.len() == texts.len()
                        && vectors.iter().all(|v| v.len() == self.local.dimension()) =>
                {
                    metrics::record_embedding(start.elapsed().as_secs_f64(), "remote", true);
                    return vectors;
                }
                Ok(vectors) => {
                    let err = AppError::EmbeddingDegraded {
                        message: format!(
                            "batch of {} texts returned {} vectors of the wrong shape",
                            texts.len(),
                            vectors.len()
                        ),
                    };
                    self.log_degraded(remote.model_name(), &err);
                }
                Err(err) => self.log_degraded(remote.model_name(), &err),
            }
            metrics::record_embedding(start.elapsed().as_secs_f64(), "remote", false);
        }

        let start = Instant::now();
        let vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.local.embed_text(t)).collect();
        metrics::record_embedding(start.elapsed().as_secs_f64(), "local", true);
        vectors
    }

    pub fn dimension(&self) -> usize {
        self.local.dimension()
    }

    fn log_degraded(&self, model: &str, err: &AppError) {
        tracing::warn!(
            model = model,
            error = %err,
            "Embedding degraded, using local fallback"
        );
    }
}

#[async_trait]
impl Embedder for ResilientEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_or_fallback(text).await)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.embed_batch_or_fallback(texts).await)
    }

    fn model_name(&self) -> &str {
        match &self.remote {
            Some(remote) => remote.model_name(),
            None => self.local.model_name(),
        }
    }

    fn dimension(&self) -> usize {
        self.local.dimension()
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> ResilientEmbedder {
    let api = match config.provider.as_str() {
        "cohere" => Some(EmbeddingApi::Cohere),
        "openai" | "jina" => Some(EmbeddingApi::OpenAiCompatible),
        "local" => None,
        other => {
            tracing::warn!(provider = other, "Unknown embedding provider, using local embeddings");
            None
        }
    };

    let remote: Option<Arc<dyn Embedder>> = match (api, &config.api_key) {
        (Some(api), Some(key)) if !key.is_empty() => match HttpEmbedder::new(
            api,
            key.clone(),
            config.model.clone(),
            config.dimension,
            config.api_base.clone(),
            Duration::from_secs(config.timeout_secs),
        ) {
            Ok(embedder) => Some(Arc::new(embedder)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build embedding client, using local embeddings");
                None
            }
        },
        (Some(_), _) => {
            tracing::warn!(
                provider = %config.provider,
                "No embedding API key, falling back to local embeddings"
            );
            None
        }
        (None, _) => None,
    };

    ResilientEmbedder::new(remote, config.dimension)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AppError::EmbeddingDegraded { message: "connection refused".into() })
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(AppError::EmbeddingDegraded { message: "connection refused".into() })
        }

        fn model_name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            1024
        }
    }

    struct WrongDimensionEmbedder;

    #[async_trait]
    impl Embedder for WrongDimensionEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 8])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; 8]).collect())
        }

        fn model_name(&self) -> &str {
            "wrong-dim"
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_local() {
        let embedder = ResilientEmbedder::new(Some(Arc::new(FailingEmbedder)), 1024);
        let local = LocalEmbedder::new(1024);

        let vector = embedder.embed_or_fallback("motion to suppress").await;
        assert_eq!(vector.len(), 1024);
        assert_eq!(vector, local.embed_text("motion to suppress"));
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_treated_as_malformed() {
        let embedder = ResilientEmbedder::new(Some(Arc::new(WrongDimensionEmbedder)), 1024);
        let vector = embedder.embed_or_fallback("bail hearing").await;
        assert_eq!(vector.len(), 1024);

        let batch = embedder
            .embed_batch_or_fallback(&["a".to_string(), "b".to_string()])
            .await;
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|v| v.len() == 1024));
    }

    #[tokio::test]
    async fn test_trait_impl_never_errors() {
        let embedder = ResilientEmbedder::new(Some(Arc::new(FailingEmbedder)), 64);
        let result = embedder.embed("anything").await;
        tokio_test::assert_ok!(&result);
        assert_eq!(embedder.model_name(), "failing");
    }

    #[test]
    fn test_create_embedder_without_key_is_local() {
        let config = EmbeddingConfig::default();
        let embedder = create_embedder(&config);
        assert!(embedder.is_degraded_only());
        assert_eq!(embedder.dimension(), 1024);
    }

    /// Fails every call after a long stall, counting the calls
    struct StallingEmbedder {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Embedder for StallingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(10)).await;
            Err(AppError::EmbeddingDegraded { message: "timed out".into() })
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(10)).await;
            Err(AppError::EmbeddingDegraded { message: "timed out".into() })
        }

        fn model_name(&self) -> &str {
            "stalling"
        }

        fn dimension(&self) -> usize {
            64
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_batch_costs_one_remote_call() {
        let remote = Arc::new(StallingEmbedder {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let embedder = ResilientEmbedder::new(Some(remote.clone()), 64);
        let texts: Vec<String> = (0..20).map(|i| format!("chunk {i} of the hearing transcript")).collect();

        let start = tokio::time::Instant::now();
        let vectors = embedder.embed_batch_or_fallback(&texts).await;

        assert_eq!(vectors.len(), 20);
        assert_eq!(remote.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(11));

        let local = LocalEmbedder::new(64);
        assert_eq!(vectors[3], local.embed_text(&texts[3]));
    }
}
