use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use semantic_replay::{load_workflow, structure_problems};
use serde_json::json;

use super::context::CliContext;
use super::output::{emit_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Workflow JSON file
    pub workflow: PathBuf,
}

pub async fn cmd_validate(args: ValidateArgs, ctx: &CliContext) -> Result<()> {
    let workflow = load_workflow(&args.workflow).await?;
    let problems = structure_problems(&workflow);

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for step in &workflow.steps {
        *kinds.entry(step.kind()).or_default() += 1;
    }

    match ctx.output() {
        OutputFormat::Json => emit_json(&json!({
            "name": workflow.name,
            "version": workflow.version,
            "steps": workflow.steps.len(),
            "step_types": kinds,
            "inputs": workflow.input_schema,
            "valid": problems.is_empty(),
            "problems": problems,
        }))?,
        OutputFormat::Human => {
            println!("Workflow: {} (v{})", workflow.name, workflow.version);
            if !workflow.description.is_empty() {
                println!("  {}", workflow.description);
            }
            let breakdown: Vec<String> = kinds
                .iter()
                .map(|(kind, count)| format!("{} {}", count, kind))
                .collect();
            println!(
                "Steps: {} ({})",
                workflow.steps.len(),
                breakdown.join(", ")
            );
            for field in &workflow.input_schema {
                println!(
                    "Input: {} ({}{})",
                    field.name,
                    field.kind.as_str(),
                    if field.is_required() { ", required" } else { "" }
                );
            }
            if problems.is_empty() {
                println!("✅ Workflow is valid");
            } else {
                for problem in &problems {
                    println!("❌ {}", problem);
                }
            }
        }
    }

    if !problems.is_empty() {
        bail!(
            "{} has {} problem(s)",
            args.workflow.display(),
            problems.len()
        );
    }
    Ok(())
}
