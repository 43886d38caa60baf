//! CLI command definitions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gmi_a2a::{A2aClient, CapabilityRegistry, DiscoverySummary, HttpCardFetcher};
use gmi_core::{FilePayload, GmiConfig, MessagePart};

pub mod ask;
pub mod discover;
pub mod pipeline;
pub mod serve;

/// GMI - multi-agent business analysis
#[derive(Parser)]
#[command(name = "gmi")]
#[command(version, about = "GMI - multi-agent business analysis over A2A")]
#[command(long_about = r#"
GMI runs role-specialized business-analysis agents and a host that routes
work between them.

COMMANDS:
  serve     → Serve one role agent over A2A
  discover  → Fetch agent cards and list what is reachable
  ask       → Send a request through the host agent
  pipeline  → Run Stakeholder → BA → Domain Expert → PM → Agile PM

LLM credentials are read from GEMINI_API_KEY / GOOGLE_API_KEY,
OPENAI_API_KEY or ANTHROPIC_API_KEY.
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true, env = "GMI_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve one role agent
    Serve(serve::ServeArgs),

    /// Discover agents and print what was found
    Discover(discover::DiscoverArgs),

    /// Ask the host agent
    Ask(ask::AskArgs),

    /// Run the stakeholder hand-off pipeline
    Pipeline(pipeline::PipelineArgs),
}

pub fn load_config(path: Option<&Path>) -> Result<GmiConfig> {
    GmiConfig::load_or_default(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })
}

/// Discover `endpoints`, or the configured addresses when none are given.
pub async fn discover(
    config: &GmiConfig,
    endpoints: &[String],
) -> Result<(CapabilityRegistry, DiscoverySummary)> {
    let endpoints = if endpoints.is_empty() {
        config.host.agent_addresses.as_slice()
    } else {
        endpoints
    };
    let timeout = config.host.discovery_timeout();
    let fetcher = HttpCardFetcher::new(timeout)?;
    let mut registry = CapabilityRegistry::with_timeout(timeout);
    let summary = registry.discover_all(&fetcher, endpoints).await;
    Ok((registry, summary))
}

/// Discover agents and connect a client to them. Fails when none answered.
pub async fn connect(config: &GmiConfig, endpoints: &[String]) -> Result<A2aClient> {
    let (registry, summary) = discover(config, endpoints).await?;
    for failure in &summary.failures {
        eprintln!("⚠️  {} unreachable: {}", failure.endpoint, failure.error);
    }
    if registry.is_empty() {
        anyhow::bail!("No agents could be discovered");
    }
    Ok(A2aClient::from_registry(&registry, config.host.request_timeout())?)
}

/// Print message parts for a terminal.
pub fn print_parts(parts: &[MessagePart]) {
    for part in parts {
        match part {
            MessagePart::Text { text } => println!("{}", text),
            MessagePart::Data { data } => println!(
                "{}",
                serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
            ),
            MessagePart::File { file } => match &file.payload {
                FilePayload::Bytes(bytes) => {
                    println!("📎 {} ({}, {} bytes)", file.name, file.mime_type, bytes.len())
                }
                FilePayload::Uri(uri) => println!("📎 {} ({}) {}", file.name, file.mime_type, uri),
            },
        }
    }
}
