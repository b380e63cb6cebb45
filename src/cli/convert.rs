use std::path::PathBuf;

use action_flow::{convert_workflow, default_output_path};
use anyhow::{Context, Result};
use clap::Args;
use semantic_replay::workflow::read_json;
use tokio::fs;
use tracing::info;

use super::context::CliContext;
use super::output::{emit_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ConvertArgs {
    /// Recorded workflow JSON file
    pub input: PathBuf,

    /// Destination file (defaults to <input>.semantic.json)
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    pub destination: Option<PathBuf>,
}

pub async fn cmd_convert(args: ConvertArgs, ctx: &CliContext) -> Result<()> {
    let recorded = read_json(&args.input).await?;
    let converted = convert_workflow(recorded)
        .with_context(|| format!("converting {}", args.input.display()))?;

    let destination = args
        .destination
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    let rendered = serde_json::to_string_pretty(&converted)?;
    fs::write(&destination, rendered)
        .await
        .with_context(|| format!("writing {}", destination.display()))?;

    let semantic_steps = converted
        .get("steps")
        .and_then(|steps| steps.as_array())
        .map(|steps| {
            steps
                .iter()
                .filter(|step| step.get("target_text").is_some())
                .count()
        })
        .unwrap_or(0);
    info!(
        input = %args.input.display(),
        output = %destination.display(),
        semantic_steps,
        "Converted workflow"
    );

    match ctx.output() {
        OutputFormat::Json => emit_json(&serde_json::json!({
            "output": destination,
            "semantic_steps": semantic_steps,
        }))?,
        OutputFormat::Human => println!(
            "Converted {} step(s) to semantic targeting → {}",
            semantic_steps,
            destination.display()
        ),
    }
    Ok(())
}
