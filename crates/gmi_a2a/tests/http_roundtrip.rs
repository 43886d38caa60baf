//! Discovery and task dispatch against a real HTTP agent server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gmi_a2a::{
    router, A2aClient, AgentCapabilities, AgentCard, AgentExecutor, AgentSkill,
    CapabilityRegistry, HttpCardFetcher,
};
use gmi_core::{
    joined_text, CoreError, CoreResult, ErrorKind, MessagePart, TaskDispatcher, TaskRequest,
    TaskTracker,
};

struct ShoutExecutor;

#[async_trait]
impl AgentExecutor for ShoutExecutor {
    async fn execute(&self, request: TaskRequest, tracker: &TaskTracker) -> CoreResult<()> {
        tracker.start_work(&request.task_id)?;
        let files = request.message.iter().filter(|p| p.is_file()).count();
        let reply = format!(
            "{} ({} file(s))",
            joined_text(&request.message).to_uppercase(),
            files
        );
        tracker.add_artifact(&request.task_id, vec![MessagePart::text(reply)])?;
        tracker.complete(&request.task_id)?;
        Ok(())
    }

    fn artifact_name(&self) -> Option<&str> {
        Some("shout.md")
    }
}

fn card() -> AgentCard {
    AgentCard {
        name: "Shout Agent".into(),
        description: "Repeats input loudly".into(),
        url: String::new(),
        version: "1.0.0".into(),
        default_input_modes: vec!["text/plain".into()],
        default_output_modes: vec!["text/markdown".into()],
        capabilities: AgentCapabilities { streaming: false },
        skills: vec![AgentSkill {
            id: "shout".into(),
            name: "Shout".into(),
            description: "Uppercases text".into(),
            tags: vec!["demo".into()],
            examples: vec!["hello".into()],
        }],
    }
}

async fn spawn_agent() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(card(), Arc::new(ShoutExecutor));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_discover_and_send_over_http() {
    let endpoint = spawn_agent().await;
    let fetcher = HttpCardFetcher::new(Duration::from_secs(5)).unwrap();

    let mut registry = CapabilityRegistry::new();
    let summary = registry
        .discover_all(&fetcher, &[endpoint.as_str(), "http://127.0.0.1:1"])
        .await;

    assert_eq!(summary.discovered, vec!["Shout Agent"]);
    assert_eq!(summary.failures.len(), 1);

    let descriptor = registry.lookup("Shout Agent").unwrap();
    assert_eq!(descriptor.url, endpoint);
    assert_eq!(descriptor.skills[0].id, "shout");

    let client = A2aClient::from_registry(&registry, Duration::from_secs(10)).unwrap();
    let parts = client
        .send_task(
            "Shout Agent",
            vec![
                MessagePart::text("hello"),
                MessagePart::file_bytes("notes.txt", "text/plain", b"abc".to_vec()),
            ],
        )
        .await
        .unwrap();

    assert_eq!(parts, vec![MessagePart::text("HELLO (1 file(s))")]);
}

#[tokio::test]
async fn test_unknown_agent_over_http_client() {
    let endpoint = spawn_agent().await;
    let fetcher = HttpCardFetcher::new(Duration::from_secs(5)).unwrap();
    let mut registry = CapabilityRegistry::new();
    registry.discover(&fetcher, &endpoint).await.unwrap();

    let client = A2aClient::from_registry(&registry, Duration::from_secs(10)).unwrap();
    let err = client
        .send_task("Missing Agent", vec![MessagePart::text("x")])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AgentNotFound);
    assert!(matches!(err, CoreError::AgentNotFound { available, .. } if available == vec!["Shout Agent"]));
}
