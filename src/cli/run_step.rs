use std::path::PathBuf;

use action_flow::{validate_inputs, WorkflowRunner, WorkflowStep};
use anyhow::{bail, Context, Result};
use clap::Args;
use semantic_replay::{collect_inputs, load_workflow};
use tracing::info;

use super::context::CliContext;
use super::output::{emit_json, print_outcome, OutputFormat};
use super::runtime::{build_session, headless_override, launch_browser};

#[derive(Args, Clone, Debug)]
pub struct RunStepArgs {
    /// Workflow JSON file
    pub workflow: PathBuf,

    /// Zero-based index of the step to execute
    pub index: usize,

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

/// Whether the workflow's opening navigation must run before `index`.
fn needs_initial_navigation(steps: &[WorkflowStep], index: usize) -> bool {
    index > 0
        && matches!(steps.first(), Some(WorkflowStep::Navigate(_)))
        && !matches!(steps.get(index), Some(WorkflowStep::Navigate(_)))
}

pub async fn cmd_run_step(args: RunStepArgs, ctx: &CliContext) -> Result<()> {
    let workflow = load_workflow(&args.workflow).await?;
    if args.index >= workflow.steps.len() {
        bail!(
            "step index {} is out of range; the workflow has {} step(s)",
            args.index,
            workflow.steps.len()
        );
    }
    let raw_inputs = collect_inputs(&args.inputs, args.inputs_file.as_deref()).await?;
    let inputs = validate_inputs(&workflow.input_schema, raw_inputs)
        .context("Workflow inputs rejected")?;
    let navigate_first = needs_initial_navigation(&workflow.steps, args.index);

    let browser = launch_browser(
        ctx.config(),
        headless_override(args.headless, args.headed),
    )
    .await?;
    let session = build_session(ctx.config(), browser.clone())?;
    let mut runner = WorkflowRunner::new(workflow, session);

    let result = async {
        if navigate_first {
            info!("Opening the workflow's start page first");
            runner.run_step(0, Some(inputs.clone())).await?;
        }
        runner.run_step(args.index, Some(inputs)).await
    }
    .await;
    drop(runner);
    browser.close().await;

    match result {
        Ok(outcome) => {
            match ctx.output() {
                OutputFormat::Json => emit_json(&outcome)?,
                OutputFormat::Human => print_outcome(&outcome),
            }
            Ok(())
        }
        Err(err) => {
            if let OutputFormat::Json = ctx.output() {
                let report = err.clone().into_report(args.index, "");
                emit_json(&report)?;
            }
            Err(err).context(format!("step {} failed", args.index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::{ClickStep, NavigateStep, StepTarget};

    fn navigate() -> WorkflowStep {
        WorkflowStep::Navigate(NavigateStep {
            url: "https://a.test".into(),
            description: None,
            output: None,
        })
    }

    fn click() -> WorkflowStep {
        WorkflowStep::Click(ClickStep {
            target: StepTarget::text("Go"),
            output: None,
        })
    }

    #[test]
    fn opens_start_page_only_when_needed() {
        let steps = vec![navigate(), click(), navigate()];
        assert!(!needs_initial_navigation(&steps, 0));
        assert!(needs_initial_navigation(&steps, 1));
        assert!(!needs_initial_navigation(&steps, 2));
        assert!(!needs_initial_navigation(&[click(), click()], 1));
    }
}
