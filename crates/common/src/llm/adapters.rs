//! Provider wire formats
//!
//! Three request/response shapes cover every supported provider:
//! OpenAI-compatible chat completions, Gemini `generateContent`, and Cohere
//! chat. The proxy speaks its own fourth shape and forwards to one of them.

use super::{CompletionOptions, Message, ProviderClient, ProviderResponse, Role};
use crate::config::{ProviderConfig, ProviderKind};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Raw provider response, tagged by wire format
#[derive(Debug, Clone)]
pub enum ProviderPayload {
    OpenAiCompatible(OpenAiChatResponse),
    Gemini(GeminiResponse),
    Cohere(CohereChatResponse),
    Proxy(ProxyResponse),
}

impl ProviderPayload {
    /// Extract the generated text; `None` when the shape carries none
    pub fn into_text(self) -> Option<String> {
        let text = match self {
            ProviderPayload::OpenAiCompatible(r) => r
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content),
            ProviderPayload::Gemini(r) => r
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .and_then(|c| c.parts.into_iter().find_map(|p| p.text)),
            ProviderPayload::Cohere(r) => r.text,
            ProviderPayload::Proxy(r) => r.content,
        };
        text.filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChatResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    pub message: OpenAiMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiMessage {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CohereChatResponse {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyResponse {
    pub content: Option<String>,
    pub error: Option<String>,
}

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct CohereChatRequest<'a> {
    model: &'a str,
    message: String,
    chat_history: Vec<CohereTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct CohereTurn {
    role: &'static str,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyRequest<'a> {
    provider: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<&'a str>,
    options: ProxyOptions<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyOptions<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
}

fn join_system(messages: &[Message]) -> Option<String> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    (!system.is_empty()).then(|| system.join("\n\n"))
}

fn build_gemini_request(messages: &[Message], max_tokens: u32, temperature: f32) -> GeminiRequest {
    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| GeminiContent {
            role: Some(match m.role {
                Role::Assistant => "model".to_string(),
                _ => "user".to_string(),
            }),
            parts: vec![GeminiPart { text: Some(m.content.clone()) }],
        })
        .collect();

    GeminiRequest {
        contents,
        system_instruction: join_system(messages).map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart { text: Some(text) }],
        }),
        generation_config: GeminiGenerationConfig {
            max_output_tokens: max_tokens,
            temperature,
        },
    }
}

fn build_cohere_request<'a>(
    model: &'a str,
    messages: &[Message],
    max_tokens: u32,
    temperature: f32,
) -> CohereChatRequest<'a> {
    let mut turns: Vec<&Message> = messages.iter().filter(|m| m.role != Role::System).collect();
    let message = turns.pop().map(|m| m.content.clone()).unwrap_or_default();

    CohereChatRequest {
        model,
        message,
        chat_history: turns
            .into_iter()
            .map(|m| CohereTurn {
                role: if m.role == Role::Assistant { "CHATBOT" } else { "USER" },
                message: m.content.clone(),
            })
            .collect(),
        preamble: join_system(messages),
        max_tokens,
        temperature,
    }
}

fn map_send_error(provider: &str, timeout: Duration, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::ProviderTimeout {
            provider: provider.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        AppError::ProviderUnavailable {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

fn http_client(provider: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client for {}: {}", provider, e),
        })
}

/// Calls a provider with credentials held by this process
pub struct DirectClient {
    config: ProviderConfig,
    http: reqwest::Client,
    timeout: Duration,
}

impl DirectClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = http_client(&config.id, timeout)?;
        Ok(Self { config, http, timeout })
    }

    fn api_key(&self) -> &str {
        self.config.api_key.as_deref().unwrap_or_default()
    }

    async fn send(&self, messages: &[Message], options: &CompletionOptions) -> Result<ProviderPayload> {
        let max_tokens = options.max_tokens.unwrap_or(self.config.max_tokens);
        let temperature = options.temperature.unwrap_or(self.config.temperature);

        let request = match self.config.kind {
            ProviderKind::OpenaiCompatible => self
                .http
                .post(&self.config.endpoint)
                .bearer_auth(self.api_key())
                .json(&OpenAiChatRequest {
                    model: &self.config.model,
                    messages,
                    max_tokens,
                    temperature,
                }),
            ProviderKind::Gemini => self
                .http
                .post(format!(
                    "{}/{}:generateContent",
                    self.config.endpoint.trim_end_matches('/'),
                    self.config.model
                ))
                .query(&[("key", self.api_key())])
                .json(&build_gemini_request(messages, max_tokens, temperature)),
            ProviderKind::Cohere => self
                .http
                .post(&self.config.endpoint)
                .bearer_auth(self.api_key())
                .json(&build_cohere_request(&self.config.model, messages, max_tokens, temperature)),
        };

        let response = request
            .send()
            .await
            .map_err(|e| map_send_error(&self.config.id, self.timeout, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderUnavailable {
                provider: self.config.id.clone(),
                message: format!("API error {}: {}", status, body),
            });
        }

        let bad_body = |e: reqwest::Error| AppError::ProviderBadResponse {
            provider: self.config.id.clone(),
            message: format!("Failed to parse response: {}", e),
        };

        Ok(match self.config.kind {
            ProviderKind::OpenaiCompatible => {
                ProviderPayload::OpenAiCompatible(response.json().await.map_err(bad_body)?)
            }
            ProviderKind::Gemini => ProviderPayload::Gemini(response.json().await.map_err(bad_body)?),
            ProviderKind::Cohere => ProviderPayload::Cohere(response.json().await.map_err(bad_body)?),
        })
    }
}

#[async_trait]
impl ProviderClient for DirectClient {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn transport(&self) -> &'static str {
        "direct"
    }

    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<ProviderResponse> {
        let start = Instant::now();
        let payload = self.send(messages, options).await?;
        let text = payload.into_text().ok_or_else(|| AppError::ProviderBadResponse {
            provider: self.config.id.clone(),
            message: "response contained no text".to_string(),
        })?;

        Ok(ProviderResponse {
            text,
            provider_id: self.config.id.clone(),
            model_id: self.config.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Calls a provider through the credential-holding proxy
pub struct ProxiedClient {
    provider_id: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    proxy_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl ProxiedClient {
    pub fn new(config: &ProviderConfig, proxy_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            provider_id: config.id.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            proxy_url,
            http: http_client(&config.id, timeout)?,
            timeout,
        })
    }
}

#[async_trait]
impl ProviderClient for ProxiedClient {
    fn id(&self) -> &str {
        &self.provider_id
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn transport(&self) -> &'static str {
        "proxy"
    }

    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<ProviderResponse> {
        let start = Instant::now();

        let response = self
            .http
            .post(&self.proxy_url)
            .json(&ProxyRequest {
                provider: &self.provider_id,
                messages,
                task: options.task.as_deref(),
                options: ProxyOptions {
                    model: &self.model,
                    temperature: options.temperature.unwrap_or(self.temperature),
                    max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
                },
            })
            .send()
            .await
            .map_err(|e| map_send_error(&self.provider_id, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            // error bodies may be HTML from whatever sits in front of the proxy
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProxyResponse>(&raw)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("proxy returned {}", status));
            return Err(AppError::ProviderUnavailable {
                provider: self.provider_id.clone(),
                message,
            });
        }

        let body: ProxyResponse = response.json().await.map_err(|e| AppError::ProviderBadResponse {
            provider: self.provider_id.clone(),
            message: format!("Failed to parse proxy response: {}", e),
        })?;

        let text = ProviderPayload::Proxy(body)
            .into_text()
            .ok_or_else(|| AppError::ProviderBadResponse {
                provider: self.provider_id.clone(),
                message: "proxy response contained no content".to_string(),
            })?;

        Ok(ProviderResponse {
            text,
            provider_id: self.provider_id.clone(),
            model_id: self.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Placeholder for a provider with neither a key nor a proxy
pub struct UnconfiguredClient {
    provider_id: String,
    model: String,
}

impl UnconfiguredClient {
    pub fn new(provider_id: &str, model: &str) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ProviderClient for UnconfiguredClient {
    fn id(&self) -> &str {
        &self.provider_id
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn transport(&self) -> &'static str {
        "unconfigured"
    }

    async fn complete(&self, _: &[Message], _: &CompletionOptions) -> Result<ProviderResponse> {
        Err(AppError::ProviderUnavailable {
            provider: self.provider_id.clone(),
            message: "no API key and no proxy configured".to_string(),
        })
    }
}
