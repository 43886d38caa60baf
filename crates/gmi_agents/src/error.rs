//! Error types for the agents module.

use gmi_core::CoreError;
use thiserror::Error;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while running a role agent.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM not configured: set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY")]
    LlmNotConfigured,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input for agent {agent}: {message}")]
    InvalidInput { agent: String, message: String },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Create an invalid input error.
    pub fn invalid_input(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            agent: agent.into(),
            message: message.into(),
        }
    }
}

impl From<AgentError> for CoreError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Core(inner) => inner,
            AgentError::UnsupportedFormat(mime) => CoreError::UnsupportedFormat(mime),
            AgentError::InvalidInput { message, .. } => CoreError::InvalidParams(message),
            AgentError::Io(e) => CoreError::Io(e),
            other => CoreError::remote("llm", other.to_string()),
        }
    }
}
