//! Error types for the host agent.

use std::time::Duration;

use gmi_agents::AgentError;
use gmi_core::CoreError;
use thiserror::Error;

/// Result type alias for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors that end a host turn. The stream turns them into error text.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("{0}")]
    Agent(#[from] AgentError),

    #[error("Language model did not answer within {0:?}")]
    ModelTimeout(Duration),

    #[error("Host worker stopped unexpectedly: {0}")]
    Worker(String),
}
