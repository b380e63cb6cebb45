use clap::Subcommand;

use super::config::ConfigArgs;
use super::convert::ConvertArgs;
use super::index::IndexArgs;
use super::run::RunArgs;
use super::run_step::RunStepArgs;
use super::validate::ValidateArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Replay every step of a workflow
    Run(RunArgs),

    /// Execute a single workflow step against a fresh page
    RunStep(RunStepArgs),

    /// Check a workflow file without opening a browser
    Validate(ValidateArgs),

    /// Convert a selector-based recording to semantic targeting
    Convert(ConvertArgs),

    /// Print the semantic index of a live page
    Index(IndexArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}
