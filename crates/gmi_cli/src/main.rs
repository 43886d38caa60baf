//! GMI CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid configuration
//! - 3: No agent reachable or agent failure

use std::process::ExitCode;

use clap::Parser;
use gmi_core::{CoreError, ErrorKind};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const AGENT_ERROR: u8 = 3;
}

const CRATES: &[&str] = &["gmi_cli", "gmi_core", "gmi_a2a", "gmi_agents", "gmi_host"];

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let default_filter = std::iter::once("warn".to_string())
        .chain(CRATES.iter().map(|c| format!("{}={}", c, level)))
        .collect::<Vec<_>>()
        .join(",");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second subscriber (e.g. under a test harness) is not an error.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(ExitCodes::CONFIG_ERROR);
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Discover(args) => commands::discover::execute(args, config).await,
        Commands::Ask(args) => commands::ask::execute(args, config).await,
        Commands::Pipeline(args) => commands::pipeline::execute(args, config).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let Some(core) = e.chain().find_map(|cause| cause.downcast_ref::<CoreError>()) else {
        return ExitCodes::GENERAL_ERROR;
    };
    match core {
        CoreError::InvalidConfig(_) => ExitCodes::CONFIG_ERROR,
        other => match other.kind() {
            ErrorKind::AgentNotFound
            | ErrorKind::TransportTimeout
            | ErrorKind::RemoteError
            | ErrorKind::MalformedResponse => ExitCodes::AGENT_ERROR,
            _ => ExitCodes::GENERAL_ERROR,
        },
    }
}
