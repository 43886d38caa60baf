//! Serve command - Run one role agent as an A2A server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use gmi_a2a::{router, serve};
use gmi_agents::{
    AgentRole, LlmAdapter, MarkdownSink, PlainTextExtractor, RoleAgent, RoleAgentExecutor,
};
use gmi_core::GmiConfig;

#[derive(Args)]
pub struct ServeArgs {
    /// Role to serve (stakeholder, business-analyst, domain-expert, product-manager, agile-pm)
    role: String,

    /// Port to listen on (defaults to the role's fixed port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for Markdown artifacts
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, config: GmiConfig) -> Result<()> {
    let role = AgentRole::parse(&args.role)?;
    let port = args.port.unwrap_or_else(|| role.port());

    let model = LlmAdapter::from_settings(&config.llm)
        .with_context(|| format!("Cannot start {}", role.card_name()))?;
    info!(role = %role, model = %model.model(), "LLM configured");

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&config.agents.output_dir));
    let mut agent = RoleAgent::new(role, Arc::new(model)).with_sink(MarkdownSink::new(&output_dir));
    if let Some(temperature) = config.llm.temperature {
        agent = agent.with_temperature(temperature);
    }
    let executor = RoleAgentExecutor::new(agent, Arc::new(PlainTextExtractor::new()));

    let host = &config.agents.bind_host;
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;
    let card = role.agent_card(&format!("http://{}:{}/", host, port));

    println!("🚀 {} on http://{}", role.card_name(), addr);
    println!("   Artifacts: {}", output_dir.join(role.artifact_file()).display());

    serve(addr, router(card, Arc::new(executor))).await?;
    Ok(())
}
