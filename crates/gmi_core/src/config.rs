//! Runtime configuration.
//!
//! Values come from built-in defaults, an optional TOML file and a handful of
//! `GMI_*` environment variables, applied in that order. LLM credentials are
//! never read from here; the LLM adapter takes them from the environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Comma-separated list of agent base URLs to discover.
pub const ENV_AGENT_ADDRESSES: &str = "GMI_AGENT_ADDRESSES";
/// Directory role agents write their Markdown artifacts to.
pub const ENV_OUTPUT_DIR: &str = "GMI_OUTPUT_DIR";
/// Model name override for the LLM adapter.
pub const ENV_LLM_MODEL: &str = "GMI_LLM_MODEL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmiConfig {
    pub host: HostSettings,
    pub agents: AgentSettings,
    pub llm: LlmSettings,
}

/// Settings for the orchestrating host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Base URLs of the agents discovered at startup
    pub agent_addresses: Vec<String>,
    pub discovery_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Upper bound on agent dispatches within one reasoning turn
    pub max_tool_calls: usize,
    /// Bound on each reasoning call the host makes to its language model
    pub model_timeout_secs: u64,
    /// Conversations kept in memory before idle ones are evicted
    pub max_sessions: usize,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            agent_addresses: (10004..=10008)
                .map(|port| format!("http://localhost:{}", port))
                .collect(),
            discovery_timeout_secs: 30,
            request_timeout_secs: 120,
            max_tool_calls: 8,
            model_timeout_secs: 120,
            max_sessions: 1024,
        }
    }
}

impl HostSettings {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

/// Settings for role agent servers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub bind_host: String,
    pub output_dir: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            output_dir: "output".to_string(),
        }
    }
}

/// Optional LLM provider and model overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// `gemini`, `openai` or `anthropic`
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Sampling temperature passed to role agents; provider default when unset
    pub temperature: Option<f32>,
    /// Bound on one HTTP call to the provider
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            temperature: None,
            request_timeout_secs: 120,
        }
    }
}

impl LlmSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl GmiConfig {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env();
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from `path` when given, otherwise defaults plus environment.
    pub fn load_or_default(path: Option<&Path>) -> CoreResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let mut config = Self::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Parse a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml(content: &str) -> CoreResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GMI_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addresses) = lookup(ENV_AGENT_ADDRESSES) {
            let parsed: Vec<String> = addresses
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
            if !parsed.is_empty() {
                self.host.agent_addresses = parsed;
            }
        }

        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|d| !d.trim().is_empty()) {
            self.agents.output_dir = dir;
        }

        if let Some(model) = lookup(ENV_LLM_MODEL).filter(|m| !m.trim().is_empty()) {
            self.llm.model = Some(model);
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if self.host.discovery_timeout_secs == 0
            || self.host.request_timeout_secs == 0
            || self.host.model_timeout_secs == 0
            || self.llm.request_timeout_secs == 0
        {
            return Err(CoreError::InvalidConfig("timeouts must be positive".into()));
        }
        if self.host.max_tool_calls == 0 {
            return Err(CoreError::InvalidConfig(
                "max_tool_calls must be at least 1".into(),
            ));
        }
        if self.host.max_sessions == 0 {
            return Err(CoreError::InvalidConfig(
                "max_sessions must be at least 1".into(),
            ));
        }
        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(CoreError::InvalidConfig(format!(
                    "llm temperature {} is outside 0.0..=2.0",
                    temperature
                )));
            }
        }
        if let Some(provider) = &self.llm.provider {
            if !matches!(provider.as_str(), "gemini" | "openai" | "anthropic") {
                return Err(CoreError::InvalidConfig(format!(
                    "unknown llm provider '{}'",
                    provider
                )));
            }
        }
        Ok(())
    }
}
