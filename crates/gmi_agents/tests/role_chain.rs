//! Role agents served over HTTP and chained by the stakeholder pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gmi_a2a::{router, A2aClient, CapabilityRegistry, HttpCardFetcher};
use gmi_agents::{
    render_report, AgentError, AgentResult, AgentRole, LanguageModel, MarkdownSink, ModelConfig,
    PlainTextExtractor, RoleAgent, RoleAgentExecutor,
};
use gmi_core::{ErrorKind, MessagePart, PipelineCoordinator, PipelinePlan, TaskDispatcher};
use parking_lot::Mutex;

/// Answers with the role title and the last input line; fails on "outage".
struct TitleModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for TitleModel {
    async fn complete(&self, prompt: &str, config: &ModelConfig) -> AgentResult<String> {
        self.prompts.lock().push(prompt.to_string());
        if prompt.contains("outage") {
            return Err(AgentError::Llm("service unavailable".into()));
        }
        let title = config.system_prompt.lines().next().unwrap_or_default();
        let last = prompt.lines().last().unwrap_or_default();
        Ok(format!("{} | {}", title, last))
    }

    fn model_name(&self) -> String {
        "title".to_string()
    }
}

async fn spawn_role(role: AgentRole, sink: MarkdownSink, model: Arc<TitleModel>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let agent = RoleAgent::new(role, model).with_sink(sink);
    let executor = RoleAgentExecutor::new(agent, Arc::new(PlainTextExtractor::new()));
    let app = router(role.agent_card(&url), Arc::new(executor));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    url
}

async fn client_for(roles: &[AgentRole], dir: &std::path::Path, model: Arc<TitleModel>) -> A2aClient {
    let mut endpoints = Vec::new();
    for role in roles {
        endpoints.push(spawn_role(*role, MarkdownSink::new(dir), model.clone()).await);
    }
    let fetcher = HttpCardFetcher::new(Duration::from_secs(5)).unwrap();
    let mut registry = CapabilityRegistry::new();
    let summary = registry.discover_all(&fetcher, endpoints.as_slice()).await;
    assert!(summary.is_complete());
    A2aClient::from_registry(&registry, Duration::from_secs(10)).unwrap()
}

fn model() -> Arc<TitleModel> {
    Arc::new(TitleModel {
        prompts: Mutex::new(Vec::new()),
    })
}

#[tokio::test]
async fn test_two_stage_chain_over_http() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = model();
    let roles = [AgentRole::Stakeholder, AgentRole::BusinessAnalyst];
    let client = client_for(&roles, dir.path(), model.clone()).await;

    let plan = PipelinePlan::new(roles.iter().map(|r| r.card_name())).unwrap();
    let run = PipelineCoordinator::new(plan)
        .run(&client, "Clinics need online booking")
        .await;

    assert!(run.is_completed());
    assert_eq!(
        run.result_for("Stakeholder Requirements Agent"),
        Some("You are a Stakeholder Requirements Analyst. | Clinics need online booking")
    );
    // The analyst received the stakeholder brief, not the original input.
    assert!(run.output().starts_with("You are a Senior Business Analyst. | You are a Stakeholder"));

    assert!(dir.path().join("stakeholder_brief.md").exists());
    assert!(dir.path().join("business_requirements.md").exists());

    let report = render_report(&run);
    assert!(report.contains("2. **Business Analyst Agent**: completed"));
}

#[tokio::test]
async fn test_llm_failure_is_an_apology_not_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let client = client_for(&[AgentRole::ProductManager], dir.path(), model()).await;

    let parts = client
        .send_task("Product Manager Agent", vec![MessagePart::text("outage please")])
        .await
        .unwrap();

    assert_eq!(parts, vec![MessagePart::text(AgentRole::ProductManager.apology())]);
    assert!(!dir.path().join("product_roadmap.md").exists());
}

#[tokio::test]
async fn test_unsupported_attachment_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = model();
    let client = client_for(&[AgentRole::DomainExpert], dir.path(), model.clone()).await;

    let err = client
        .send_task(
            "Domain Expert Agent",
            vec![
                MessagePart::text("Check this"),
                MessagePart::file_bytes("scan.png", "image/png", vec![0x89, 0x50]),
            ],
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteError);
    assert!(err.to_string().contains("-32005"));
    assert!(model.prompts.lock().is_empty());
}
