use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;

use super::output::{emit_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration, overrides included
    Show,

    /// Check the configuration against engine limits
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let source = match ctx.config_path() {
        Some(path) => path.display().to_string(),
        None => "built-in defaults".to_string(),
    };
    match args.action {
        ConfigAction::Show => match ctx.output() {
            OutputFormat::Json => emit_json(ctx.config())?,
            OutputFormat::Human => {
                println!("# Effective configuration ({})", source);
                print!("{}", ctx.config().to_yaml()?);
            }
        },
        ConfigAction::Validate => {
            let problems = ctx.config().problems();
            if problems.is_empty() {
                println!("Configuration from {} is valid", source);
            } else {
                for problem in &problems {
                    println!("❌ {}", problem);
                }
                bail!("configuration has {} problem(s)", problems.len());
            }
        }
    }

    Ok(())
}
