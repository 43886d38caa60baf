//! The seam through which tasks reach remote agents.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::parts::MessagePart;

/// Sends a task to a named agent and returns the parts it produced.
///
/// Implementations must not retry on their own: timeouts and remote failures
/// are returned to the caller, which decides whether to retry, abort or fall
/// back.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn send_task(&self, agent_name: &str, parts: Vec<MessagePart>) -> CoreResult<Vec<MessagePart>>;

    /// Names of the agents this dispatcher can reach.
    fn agent_names(&self) -> Vec<String>;
}
