use std::path::PathBuf;

use action_flow::{validate_inputs, RunStatus, WorkflowRunner};
use anyhow::{bail, Context, Result};
use clap::Args;
use semantic_replay::{collect_inputs, load_workflow};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::context::CliContext;
use super::output::print_run_output;
use super::runtime::{build_session, headless_override, launch_browser};

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Workflow JSON file
    pub workflow: PathBuf,

    /// Workflow input (key=value), repeatable
    #[arg(short = 'i', long = "input", value_name = "KEY=VALUE")]
    pub inputs: Vec<String>,

    /// JSON object with workflow inputs
    #[arg(long, value_name = "FILE")]
    pub inputs_file: Option<PathBuf>,

    /// Run the browser headless
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let workflow = load_workflow(&args.workflow).await?;
    let raw_inputs = collect_inputs(&args.inputs, args.inputs_file.as_deref()).await?;
    let inputs = validate_inputs(&workflow.input_schema, raw_inputs)
        .context("Workflow inputs rejected")?;
    info!(
        workflow = %workflow.name,
        steps = workflow.steps.len(),
        "Loaded workflow"
    );

    let browser = launch_browser(
        ctx.config(),
        headless_override(args.headless, args.headed),
    )
    .await?;
    let session = build_session(ctx.config(), browser.clone())?;
    let mut runner = WorkflowRunner::new(workflow, session);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping before the next step");
            token.cancel();
        }
    });

    let result = runner.run(inputs, Some(cancel)).await;
    ctrl_c.abort();
    drop(runner);
    browser.close().await;

    let output = result.context("Workflow run aborted")?;
    print_run_output(&output, ctx.output())?;
    match &output.status {
        RunStatus::Completed => Ok(()),
        RunStatus::Cancelled { at_step } => bail!("run cancelled before step {}", at_step),
        RunStatus::Failed(report) => bail!(
            "workflow failed at step {} ({}): {}",
            report.step_index,
            report.kind,
            report.message
        ),
    }
}
