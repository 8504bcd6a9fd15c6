//! Text-generation provider abstraction
//!
//! Every provider sits behind [`ProviderClient`]. A client is either
//! *direct* (this process holds the credential and speaks the provider's wire
//! format) or *proxied* (a trusted endpoint holds the credential). Which one
//! a provider gets is decided once, when the [`ProviderRegistry`] is built.

pub mod adapters;

pub use adapters::{DirectClient, ProviderPayload, ProxiedClient, UnconfiguredClient};

use crate::config::ProvidersConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Conversation role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Per-call overrides; unset fields fall back to the provider's config
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Task hint forwarded to the proxy (`analysis`, `synthesis`, `chat`)
    pub task: Option<String>,
    /// Hard deadline for the whole call
    pub timeout: Option<Duration>,
}

impl CompletionOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }
}

/// Successful completion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub text: String,
    pub provider_id: String,
    pub model_id: String,
    pub latency_ms: u64,
}

/// A text-generation backend
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Provider identifier (`groq`, `gemini`, ...)
    fn id(&self) -> &str;

    /// Model identifier sent with each call
    fn model(&self) -> &str;

    /// `direct`, `proxy`, or `unconfigured`
    fn transport(&self) -> &'static str;

    /// Run one completion. Returns non-empty text or a typed error.
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<ProviderResponse>;
}

/// Provider clients keyed by id
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one client per configured provider.
    ///
    /// A provider with an API key is called directly; otherwise it goes
    /// through the proxy when one is configured, and is unavailable if not.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let mut registry = Self::new();

        for entry in &config.entries {
            let has_key = entry.api_key.as_deref().is_some_and(|k| !k.is_empty());

            let client: Arc<dyn ProviderClient> = match (&config.proxy_url, has_key) {
                (_, true) => Arc::new(DirectClient::new(entry.clone())?),
                (Some(proxy_url), false) => Arc::new(ProxiedClient::new(
                    entry,
                    proxy_url.clone(),
                    Duration::from_secs(config.proxy_timeout_secs),
                )?),
                (None, false) => Arc::new(UnconfiguredClient::new(&entry.id, &entry.model)),
            };

            tracing::debug!(
                provider = %entry.id,
                transport = client.transport(),
                "Registered provider"
            );
            registry.register(client);
        }

        Ok(registry)
    }

    /// Add or replace a client
    pub fn register(&mut self, client: Arc<dyn ProviderClient>) {
        self.clients.insert(client.id().to_string(), client);
    }

    pub fn with_client(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.register(client);
        self
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn ProviderClient>> {
        self.clients
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::UnknownProvider { provider: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    /// Registered provider ids, sorted
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clients.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Providers that can actually be called, sorted.
    ///
    /// Excludes providers with neither a credential nor a proxy.
    pub fn available(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .clients
            .values()
            .filter(|c| c.transport() != "unconfigured")
            .map(|c| c.id().to_string())
            .collect();
        ids.sort();
        ids
    }

    /// Call one provider, enforcing `options.timeout`
    pub async fn call(
        &self,
        provider_id: &str,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<ProviderResponse> {
        let client = self.get(provider_id)?;
        let start = Instant::now();

        let result = match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, client.complete(messages, options)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::ProviderTimeout {
                    provider: provider_id.to_string(),
                    timeout_ms: limit.as_millis() as u64,
                }),
            },
            None => client.complete(messages, options).await,
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(AppError::ProviderTimeout { .. }) => "timeout",
            Err(_) => "error",
        };
        metrics::record_provider_call(
            start.elapsed().as_secs_f64(),
            provider_id,
            client.transport(),
            outcome,
        );

        if let Err(e) = &result {
            tracing::warn!(provider = provider_id, error = %e, "Provider call failed");
        }

        result
    }

    /// Try providers in order; the first success wins.
    pub async fn call_with_fallback(
        &self,
        order: &[String],
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<ProviderResponse> {
        let mut attempted = Vec::with_capacity(order.len());

        for provider_id in order {
            attempted.push(provider_id.clone());
            match self.call(provider_id, messages, options).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::info!(provider = %provider_id, error = %e, "Falling back to next provider");
                }
            }
        }

        Err(AppError::AllProvidersFailed { attempted })
    }

    /// Ask several providers the same thing at once.
    ///
    /// Unavailable providers are skipped. Every call runs to completion;
    /// results come back in `ids` order, one per called provider.
    pub async fn call_many(
        &self,
        ids: &[String],
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Vec<(String, Result<ProviderResponse>)> {
        let available = self.available();
        let targets: Vec<&String> = ids.iter().filter(|id| available.contains(id)).collect();

        let calls = targets.iter().map(|id| self.call(id, messages, options));
        let results = join_all(calls).await;

        targets.into_iter().cloned().zip(results).collect()
    }
}

/// Estimated spend in USD for `tokens` tokens on a provider.
///
/// Most providers are on free tiers; unknown ids cost nothing.
pub fn estimate_cost(provider_id: &str, tokens: u64) -> f64 {
    let per_thousand = match provider_id {
        "mistral" => 0.001,
        _ => 0.0,
    };
    per_thousand * (tokens as f64 / 1000.0)
}
