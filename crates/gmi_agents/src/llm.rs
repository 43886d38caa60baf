//! LLM capability used by the role agents and the host.
//!
//! Supports Gemini, OpenAI and Anthropic, selected from the environment or
//! from `[llm]` settings. Gemini is preferred when several keys are present.

use std::time::Duration;

use async_trait::async_trait;
use gmi_core::{config::ENV_LLM_MODEL, LlmSettings};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AgentError, AgentResult};

const MAX_RETRIES: u32 = 3;

/// Default bound on one HTTP call to a provider.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-call model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl ModelConfig {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Opaque text-completion capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str, config: &ModelConfig) -> AgentResult<String>;

    fn model_name(&self) -> String;
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini-2.5-flash",
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Anthropic => "claude-sonnet-4-5",
        }
    }

    /// Environment variables holding this provider's key, in lookup order.
    fn key_vars(&self) -> &'static [&'static str] {
        match self {
            LlmProvider::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            LlmProvider::OpenAI => &["OPENAI_API_KEY"],
            LlmProvider::Anthropic => &["ANTHROPIC_API_KEY"],
        }
    }

    fn parse(value: &str) -> AgentResult<Self> {
        match value.to_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "openai" => Ok(LlmProvider::OpenAI),
            "anthropic" => Ok(LlmProvider::Anthropic),
            other => Err(AgentError::Llm(format!("unknown provider: {}", other))),
        }
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("Falling back to an HTTP client without timeout: {}", e);
            reqwest::Client::new()
        })
}

/// HTTP-backed [`LanguageModel`].
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: LlmProvider, api_key: String, model: Option<String>) -> Self {
        Self {
            provider,
            api_key,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            client: http_client(DEFAULT_LLM_TIMEOUT),
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    /// Bound every HTTP call to the provider by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self.timeout = timeout;
        self
    }

    /// Create an LLM adapter from environment variables
    ///
    /// Checks in order:
    /// 1. GEMINI_API_KEY / GOOGLE_API_KEY
    /// 2. OPENAI_API_KEY
    /// 3. ANTHROPIC_API_KEY
    pub fn from_env() -> AgentResult<Self> {
        Self::from_lookup(&LlmSettings::default(), |name| std::env::var(name).ok())
    }

    /// Create an adapter from `[llm]` settings, reading keys from the environment.
    pub fn from_settings(settings: &LlmSettings) -> AgentResult<Self> {
        Self::from_lookup(settings, |name| std::env::var(name).ok())
    }

    fn from_lookup<F>(settings: &LlmSettings, lookup: F) -> AgentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model = settings
            .model
            .clone()
            .or_else(|| lookup(ENV_LLM_MODEL).filter(|m| !m.is_empty()));

        let key_for = |provider: LlmProvider| {
            provider
                .key_vars()
                .iter()
                .filter_map(|var| lookup(var))
                .find(|key| !key.is_empty())
        };

        if let Some(name) = &settings.provider {
            let provider = LlmProvider::parse(name)?;
            let key = key_for(provider).ok_or(AgentError::LlmNotConfigured)?;
            return Ok(Self::new(provider, key, model).with_timeout(settings.request_timeout()));
        }

        for provider in [LlmProvider::Gemini, LlmProvider::OpenAI, LlmProvider::Anthropic] {
            if let Some(key) = key_for(provider) {
                return Ok(Self::new(provider, key, model).with_timeout(settings.request_timeout()));
            }
        }

        Err(AgentError::LlmNotConfigured)
    }

    /// Get the current provider
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Get the current model
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request, retrying network errors, 5xx and 429 with exponential backoff.
    async fn send_with_retry<F>(&self, label: &str, build: F) -> AgentResult<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }

            let response = match build().send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("{} request failed (attempt {}): {}", label, attempt + 1, e);
                    last_error = Some(AgentError::Llm(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(AgentError::Llm(format!(
                    "{} API error {} (attempt {}/{}): {}",
                    label,
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AgentError::Llm(format!("{} API error {}: {}", label, status, body)));
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| AgentError::Llm("Max retries exceeded".to_string())))
    }

    async fn complete_gemini(&self, prompt: &str, config: &ModelConfig) -> AgentResult<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let request = GeminiRequest {
            system_instruction: (!config.system_prompt.is_empty()).then(|| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: config.system_prompt.clone(),
                }],
            }),
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        };

        let response = self
            .send_with_retry("Gemini", || {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(&request)
            })
            .await?;

        let result: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Llm(format!("Failed to parse response: {}", e)))?;

        let text = result
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AgentError::Llm("No response from Gemini".to_string()))?;
        Ok(text)
    }

    async fn complete_openai(&self, prompt: &str, config: &ModelConfig) -> AgentResult<String> {
        let mut messages = Vec::new();
        if !config.system_prompt.is_empty() {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: config.system_prompt.clone(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = OpenAIRequest {
            model: self.model.clone(),
            messages,
            max_completion_tokens: Some(config.max_tokens),
            temperature: config.temperature,
        };

        let response = self
            .send_with_retry("OpenAI", || {
                self.client
                    .post("https://api.openai.com/v1/chat/completions")
                    .bearer_auth(&self.api_key)
                    .json(&request)
            })
            .await?;

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Llm(format!("Failed to parse response: {}", e)))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AgentError::Llm("No response from OpenAI".to_string()))
    }

    async fn complete_anthropic(&self, prompt: &str, config: &ModelConfig) -> AgentResult<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: config.max_tokens,
            system: (!config.system_prompt.is_empty()).then(|| config.system_prompt.clone()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: config.temperature,
        };

        let response = self
            .send_with_retry("Anthropic", || {
                self.client
                    .post("https://api.anthropic.com/v1/messages")
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&request)
            })
            .await?;

        let result: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Llm(format!("Failed to parse response: {}", e)))?;

        result
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| AgentError::Llm("No response from Anthropic".to_string()))
    }
}

#[async_trait]
impl LanguageModel for LlmAdapter {
    async fn complete(&self, prompt: &str, config: &ModelConfig) -> AgentResult<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "LLM completion");
        match self.provider {
            LlmProvider::Gemini => self.complete_gemini(prompt, config).await,
            LlmProvider::OpenAI => self.complete_openai(prompt, config).await,
            LlmProvider::Anthropic => self.complete_anthropic(prompt, config).await,
        }
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}
