//! Role agent task execution behind the A2A server.

use std::sync::Arc;

use async_trait::async_trait;
use gmi_a2a::AgentExecutor;
use gmi_core::{CoreError, CoreResult, FilePayload, MessagePart, TaskRequest, TaskTracker};
use tracing::{debug, info};

use crate::agent::RoleAgent;
use crate::error::AgentError;
use crate::ingest::DocumentExtractor;

/// Runs a [`RoleAgent`] for each inbound task.
pub struct RoleAgentExecutor {
    agent: RoleAgent,
    extractor: Arc<dyn DocumentExtractor>,
}

impl RoleAgentExecutor {
    pub fn new(agent: RoleAgent, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self { agent, extractor }
    }

    /// Flatten the input parts into one block of prompt text.
    fn flatten(&self, parts: &[MessagePart]) -> Result<String, AgentError> {
        let mut sections = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                MessagePart::Text { text } => sections.push(text.clone()),
                MessagePart::Data { data } => sections.push(
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()),
                ),
                MessagePart::File { file } => match &file.payload {
                    FilePayload::Bytes(bytes) => {
                        let extraction =
                            self.extractor
                                .extract_bytes(&file.name, &file.mime_type, bytes)?;
                        debug!(file = %file.name, "Extracted {}", extraction.summary());
                        sections.push(format!("--- {} ---\n{}", file.name, extraction.text));
                    }
                    FilePayload::Uri(uri) => sections.push(format!(
                        "[Attached file: {} ({}) at {}]",
                        file.name, file.mime_type, uri
                    )),
                },
            }
        }
        Ok(sections.join("\n\n"))
    }

    fn reject(tracker: &TaskTracker, task_id: &str, error: CoreError) -> CoreError {
        let _ = tracker.fail(task_id, error.kind(), error.to_string());
        error
    }
}

#[async_trait]
impl AgentExecutor for RoleAgentExecutor {
    async fn execute(&self, request: TaskRequest, tracker: &TaskTracker) -> CoreResult<()> {
        let task_id = request.task_id.clone();
        tracker.start_work(&task_id)?;

        let input = match self.flatten(&request.message) {
            Ok(input) => input,
            Err(e) => return Err(Self::reject(tracker, &task_id, e.into())),
        };
        if input.trim().is_empty() {
            let role = self.agent.role();
            let error = AgentError::invalid_input(role.card_name(), "no input text to work on");
            return Err(Self::reject(tracker, &task_id, error.into()));
        }

        info!(task_id = %task_id, role = %self.agent.role(), "Executing role task");
        let answer = self.agent.invoke(&input).await;

        tracker.add_artifact(&task_id, vec![MessagePart::text(answer)])?;
        tracker.complete(&task_id)?;
        Ok(())
    }

    async fn cancel(&self, task_id: &str, _tracker: &TaskTracker) -> CoreResult<()> {
        Err(CoreError::UnsupportedOperation(format!(
            "{} cannot cancel task {}",
            self.agent.role().card_name(),
            task_id
        )))
    }

    fn artifact_name(&self) -> Option<&str> {
        Some(self.agent.role().artifact_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::PlainTextExtractor;
    use crate::llm::{LanguageModel, MockLanguageModel};
    use crate::roles::AgentRole;
    use gmi_core::{ErrorKind, TaskState};
    use serde_json::json;

    fn executor(expected_calls: usize) -> RoleAgentExecutor {
        let mut mock = MockLanguageModel::new();
        mock.expect_model_name().return_const("mock".to_string());
        mock.expect_complete()
            .times(expected_calls)
            .returning(|prompt, _| Ok(format!("ROADMAP for {}", prompt.len())));
        let model: Arc<dyn LanguageModel> = Arc::new(mock);
        RoleAgentExecutor::new(
            RoleAgent::new(AgentRole::ProductManager, model),
            Arc::new(PlainTextExtractor::new()),
        )
    }

    async fn run(executor: &RoleAgentExecutor, parts: Vec<MessagePart>) -> (CoreResult<()>, gmi_core::Task) {
        let tracker = TaskTracker::new();
        let request = TaskRequest::new("t-1", "c-1", parts);
        tracker.observe(request.clone());
        let result = executor.execute(request, &tracker).await;
        let task = tracker.take("t-1").unwrap();
        (result, task)
    }

    #[tokio::test]
    async fn test_execute_completes_with_artifact() {
        let executor = executor(1);
        let parts = vec![
            MessagePart::text("Build a loyalty app"),
            MessagePart::file_bytes("notes.txt", "text/plain", b"Customers want points".to_vec()),
            MessagePart::data(json!({"budget": 10000})),
        ];

        let (result, task) = run(&executor, parts).await;

        assert!(result.is_ok());
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.artifacts.len(), 1);
        assert!(task.artifacts[0].as_text().unwrap().starts_with("ROADMAP"));
        assert_eq!(executor.artifact_name(), Some("product_roadmap.md"));
    }

    #[test]
    fn test_flatten_layout() {
        let executor = executor(0);
        let text = executor
            .flatten(&[
                MessagePart::text("Intro"),
                MessagePart::file_bytes("notes.txt", "text/plain", b"body".to_vec()),
                MessagePart::file_uri("deck.pdf", "application/pdf", "gs://bucket/deck.pdf"),
            ])
            .unwrap();
        assert_eq!(
            text,
            "Intro\n\n--- notes.txt ---\nbody\n\n[Attached file: deck.pdf (application/pdf) at gs://bucket/deck.pdf]"
        );
    }

    #[tokio::test]
    async fn test_blank_input_fails_task() {
        let executor = executor(0);
        let (result, task) = run(&executor, vec![MessagePart::text("   ")]).await;

        assert!(matches!(result, Err(CoreError::InvalidParams(_))));
        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.error, Some(ErrorKind::InvalidParams));
    }

    #[tokio::test]
    async fn test_unsupported_file_fails_task() {
        let executor = executor(0);
        let parts = vec![MessagePart::file_bytes("deck.pdf", "application/pdf", vec![1, 2, 3])];
        let (result, task) = run(&executor, parts).await;

        assert!(matches!(result, Err(CoreError::UnsupportedFormat(_))));
        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.error, Some(ErrorKind::UnsupportedFormat));
    }

    #[tokio::test]
    async fn test_cancel_is_unsupported() {
        let err = executor(0).cancel("t-1", &TaskTracker::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }
}
