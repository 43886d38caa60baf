//! Error types for the core module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while moving tasks between agents.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Agent not found: {name}. Available agents: {available:?}")]
    AgentNotFound { name: String, available: Vec<String> },

    #[error("Timed out after {seconds}s waiting for {target}")]
    TransportTimeout { target: String, seconds: u64 },

    #[error("Remote error from {agent}: {message}")]
    RemoteError { agent: String, message: String },

    #[error("Malformed response from {agent}: {detail}")]
    MalformedResponse { agent: String, detail: String },

    #[error("Unsupported content type: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid task state: {0}")]
    InvalidState(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Create an agent-not-found error.
    pub fn agent_not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        Self::AgentNotFound {
            name: name.into(),
            available,
        }
    }

    /// Create a remote error.
    pub fn remote(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteError {
            agent: agent.into(),
            message: message.into(),
        }
    }

    /// Create a malformed-response error.
    pub fn malformed(agent: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            agent: agent.into(),
            detail: detail.into(),
        }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParams(_) => ErrorKind::InvalidParams,
            Self::AgentNotFound { .. } => ErrorKind::AgentNotFound,
            Self::TransportTimeout { .. } => ErrorKind::TransportTimeout,
            Self::RemoteError { .. } => ErrorKind::RemoteError,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Self::InvalidConfig(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Serializable error category recorded on a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParams,
    AgentNotFound,
    TransportTimeout,
    RemoteError,
    MalformedResponse,
    UnsupportedFormat,
    InvalidState,
    UnsupportedOperation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidParams => "invalid_params",
            ErrorKind::AgentNotFound => "agent_not_found",
            ErrorKind::TransportTimeout => "transport_timeout",
            ErrorKind::RemoteError => "remote_error",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::UnsupportedOperation => "unsupported_operation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
