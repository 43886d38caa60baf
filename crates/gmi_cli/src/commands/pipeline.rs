//! Pipeline command - Run the stakeholder hand-off chain.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use gmi_agents::{render_report, stakeholder_plan};
use gmi_core::{GmiConfig, PipelineCoordinator};

#[derive(Args)]
pub struct PipelineArgs {
    /// Initial stakeholder input
    #[arg(required_unless_present = "input_file")]
    input: Option<String>,

    /// Read the initial input from a file
    #[arg(short, long, conflicts_with = "input")]
    input_file: Option<PathBuf>,

    /// Write the Markdown report here instead of stdout
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Agent base URL (repeatable; defaults to the configured addresses)
    #[arg(long = "endpoint")]
    endpoints: Vec<String>,
}

pub async fn execute(args: PipelineArgs, config: GmiConfig) -> Result<()> {
    let input = match (args.input, &args.input_file) {
        (Some(input), _) => input,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("Provide an input or --input-file"),
    };

    let client = super::connect(&config, &args.endpoints).await?;
    let coordinator = PipelineCoordinator::new(stakeholder_plan()?);

    info!(stages = coordinator.plan().len(), "Running stakeholder pipeline");
    let run = coordinator.run(&client, input).await;
    let report = render_report(&run);

    match &args.report {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &report)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("📄 Report written to {}", path.display());
        }
        None => println!("{}", report),
    }

    if let Some(stage) = run.failed_stage() {
        anyhow::bail!("Pipeline stopped at {}", stage);
    }
    Ok(())
}
