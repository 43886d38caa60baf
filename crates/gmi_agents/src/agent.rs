//! A single role agent: role prompt + LLM call + artifact file.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::artifact::MarkdownSink;
use crate::llm::{LanguageModel, ModelConfig};
use crate::prompts;
use crate::roles::AgentRole;

/// Runs one role over a block of input text.
pub struct RoleAgent {
    role: AgentRole,
    model: Arc<dyn LanguageModel>,
    sink: Option<MarkdownSink>,
    temperature: Option<f32>,
}

impl RoleAgent {
    pub fn new(role: AgentRole, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            role,
            model,
            sink: None,
            temperature: None,
        }
    }

    /// Also write each successful answer to `sink`.
    pub fn with_sink(mut self, sink: MarkdownSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sample at `temperature` instead of the provider default.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Produce the role's document for `input`.
    ///
    /// LLM failures yield the role's apology text instead of an error.
    pub async fn invoke(&self, input: &str) -> String {
        let mut config = ModelConfig::new(prompts::system_prompt(self.role));
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        let prompt = prompts::task_prompt(self.role, input, Utc::now().date_naive());

        info!(role = %self.role, model = %self.model.model_name(), "Running role agent");
        match self.model.complete(&prompt, &config).await {
            Ok(text) => {
                if let Some(sink) = &self.sink {
                    sink.write(self.role, &text);
                }
                text
            }
            Err(e) => {
                warn!(role = %self.role, "LLM call failed: {}", e);
                self.role.apology().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::llm::MockLanguageModel;
    use tempfile::TempDir;

    fn model_returning(result: Result<&'static str, &'static str>) -> Arc<dyn LanguageModel> {
        let mut mock = MockLanguageModel::new();
        mock.expect_model_name().return_const("mock".to_string());
        mock.expect_complete()
            .times(1)
            .returning(move |prompt, config| {
                assert!(prompt.contains("Inputs:\nportal for clinics"));
                assert!(config.system_prompt.contains("Business Analyst"));
                result
                    .map(str::to_string)
                    .map_err(|e| AgentError::Llm(e.to_string()))
            });
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_invoke_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let agent = RoleAgent::new(AgentRole::BusinessAnalyst, model_returning(Ok("# BRD")))
            .with_sink(MarkdownSink::new(dir.path()));

        let text = agent.invoke("portal for clinics").await;

        assert_eq!(text, "# BRD");
        let written = std::fs::read_to_string(dir.path().join("business_requirements.md")).unwrap();
        assert_eq!(written, "# BRD");
    }

    #[tokio::test]
    async fn test_temperature_reaches_model() {
        let mut mock = MockLanguageModel::new();
        mock.expect_model_name().return_const("mock".to_string());
        mock.expect_complete()
            .withf(|_, config| config.temperature == Some(0.2))
            .times(1)
            .returning(|_, _| Ok("# Plan".to_string()));

        let agent = RoleAgent::new(AgentRole::AgilePm, Arc::new(mock)).with_temperature(0.2);
        assert_eq!(agent.invoke("two sprints").await, "# Plan");
    }

    #[tokio::test]
    async fn test_llm_failure_returns_apology() {
        let dir = TempDir::new().unwrap();
        let agent = RoleAgent::new(AgentRole::BusinessAnalyst, model_returning(Err("quota")))
            .with_sink(MarkdownSink::new(dir.path()));

        let text = agent.invoke("portal for clinics").await;

        assert_eq!(text, AgentRole::BusinessAnalyst.apology());
        assert!(!dir.path().join("business_requirements.md").exists());
    }
}
