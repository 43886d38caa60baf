//! Ask command - Send one request through the host agent.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use futures::StreamExt;
use tracing::warn;

use gmi_agents::LlmAdapter;
use gmi_core::{build_parts, GmiConfig};
use gmi_host::{HostAgent, HostEvent, HostRequest};

#[derive(Args)]
pub struct AskArgs {
    /// What to ask
    query: String,

    /// Send directly to this agent instead of letting the host decide
    #[arg(short, long)]
    agent: Option<String>,

    /// Attach a local file (requires --agent)
    #[arg(short, long, requires = "agent")]
    file: Option<PathBuf>,

    /// Attach a file by URI (requires --agent)
    #[arg(long, requires = "agent")]
    file_uri: Option<String>,

    /// MIME type of the attachment (guessed from the name when omitted)
    #[arg(long)]
    mime_type: Option<String>,

    /// Session to continue
    #[arg(short, long, default_value = "cli")]
    session: String,

    /// Agent base URL (repeatable; defaults to the configured addresses)
    #[arg(long = "endpoint")]
    endpoints: Vec<String>,
}

pub async fn execute(args: AskArgs, config: GmiConfig) -> Result<()> {
    let client = super::connect(&config, &args.endpoints).await?;

    let mut host = HostAgent::from_client(client)
        .with_max_tool_calls(config.host.max_tool_calls)
        .with_model_timeout(config.host.model_timeout())
        .with_max_sessions(config.host.max_sessions);
    match LlmAdapter::from_settings(&config.llm) {
        Ok(model) => host = host.with_model(Arc::new(model)),
        Err(e) => warn!("{}; routing by keyword", e),
    }
    let host = Arc::new(host);

    let request = match args.agent {
        Some(agent) => HostRequest::direct(
            agent,
            build_parts(
                Some(args.query.as_str()),
                args.file.as_deref(),
                args.file_uri.as_deref(),
                args.mime_type.as_deref(),
            ),
        ),
        None => HostRequest::query(args.query),
    };

    let mut events = host.stream(request, &args.session);
    while let Some(event) = events.next().await {
        match event {
            HostEvent::Working { status } => eprintln!("⏳ {}", status),
            HostEvent::Completed { content } => super::print_parts(&content),
        }
    }
    Ok(())
}
