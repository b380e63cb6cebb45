use action_flow::{ExecutionOutcome, ExecutionWarning, FailureReport, RunOutput, RunStatus};
use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Pretty JSON of any serializable payload.
pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_run_output(output: &RunOutput, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return emit_json(output);
    }

    for outcome in &output.step_results {
        print_outcome(outcome);
    }
    match &output.status {
        RunStatus::Completed => {
            println!("✅ Completed {} step(s)", output.step_results.len())
        }
        RunStatus::Cancelled { at_step } => {
            println!("⏹  Cancelled before step {}", at_step)
        }
        RunStatus::Failed(report) => print_failure(report),
    }
    if !output.final_context.is_empty() {
        println!("\nFinal context:");
        for (key, value) in output.final_context.iter() {
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}

pub fn print_outcome(outcome: &ExecutionOutcome) {
    let attempts = if outcome.attempts > 1 {
        format!(" after {} attempts", outcome.attempts)
    } else {
        String::new()
    };
    println!(
        "  [{}] {} - {}{} ({} ms)",
        outcome.step_index, outcome.step_type, outcome.summary, attempts, outcome.duration_ms
    );
    for warning in &outcome.warnings {
        match warning {
            ExecutionWarning::AmbiguousElement {
                target,
                matches,
                chosen,
            } => println!(
                "      ⚠ '{}' matched {} elements; used {}",
                target, matches, chosen
            ),
            ExecutionWarning::DegradedExtraction { reason } => {
                println!("      ⚠ extraction degraded: {}", reason)
            }
        }
    }
}

pub fn print_failure(report: &FailureReport) {
    println!(
        "❌ Step {} failed ({}): {}",
        report.step_index, report.kind, report.message
    );
    println!("   Step: {}", report.description);
    if let Some(target) = &report.target_text {
        println!("   Target: {}", target);
    }
    println!("   Attempts: {}", report.attempts);
    if let Some(diagnostics) = &report.diagnostics {
        if !diagnostics.url.is_empty() {
            println!("   Page: {}", diagnostics.url);
        }
        if !diagnostics.title.is_empty() {
            println!("   Title: {}", diagnostics.title);
        }
        for message in &diagnostics.validation_messages {
            println!("   Validation: {}", message);
        }
        if !diagnostics.similar_elements.is_empty() {
            println!(
                "   Similar elements: {}",
                diagnostics.similar_elements.join(", ")
            );
        }
    }
}
