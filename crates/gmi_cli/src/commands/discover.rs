//! Discover command - Fetch agent cards and report.

use anyhow::Result;
use clap::Args;

use gmi_core::GmiConfig;

#[derive(Args)]
pub struct DiscoverArgs {
    /// Agent base URL (repeatable; defaults to the configured addresses)
    #[arg(long = "agent")]
    agents: Vec<String>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: DiscoverArgs, config: GmiConfig) -> Result<()> {
    let (registry, summary) = super::discover(&config, &args.agents).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("🔎 Discovered {} agent(s)", registry.len());
        for descriptor in registry.descriptors() {
            println!("   ✅ {} ({})", descriptor.name, descriptor.url);
            for skill in &descriptor.skills {
                println!("      - {}: {}", skill.name, skill.description);
            }
        }
        for failure in &summary.failures {
            println!("   ❌ {} [{}] {}", failure.endpoint, failure.kind.as_str(), failure.error);
        }
    }

    if registry.is_empty() {
        anyhow::bail!("No agents could be discovered");
    }
    Ok(())
}
