//! Progress events emitted by a host stream.

use gmi_core::MessagePart;
use serde::{Deserialize, Serialize};

/// Status shown while the host works on a turn.
pub const THINKING: &str = "The host agent is thinking...";

/// One item of a host stream. Every stream ends with exactly one `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    Working { status: String },
    Completed { content: Vec<MessagePart> },
}

impl HostEvent {
    pub fn working(status: impl Into<String>) -> Self {
        Self::Working {
            status: status.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Error text delivered as the terminal event of a failed turn.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::Completed {
            content: vec![MessagePart::text(format!("Error processing request: {}", error))],
        }
    }
}
