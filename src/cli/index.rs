use action_locator::SemanticIndexer;
use action_primitives::BrowserBackend;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use super::context::CliContext;
use super::output::{emit_json, OutputFormat};
use super::runtime::{headless_override, launch_browser};

#[derive(Args, Clone, Debug)]
pub struct IndexArgs {
    /// Page to index
    pub url: String,

    /// Run the browser headless
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

pub async fn cmd_index(args: IndexArgs, ctx: &CliContext) -> Result<()> {
    let engine = &ctx.config().engine;
    let browser = launch_browser(
        ctx.config(),
        headless_override(args.headless, args.headed),
    )
    .await?;

    let result = async {
        browser
            .navigate(&args.url)
            .await
            .with_context(|| format!("navigating to {}", args.url))?;
        SemanticIndexer::new(engine.network_idle_timeout())
            .build(browser.as_ref())
            .await
            .context("building semantic index")
    }
    .await;
    browser.close().await;
    let index = result?;

    match ctx.output() {
        OutputFormat::Json => {
            let elements: Vec<_> = index.iter().collect();
            emit_json(&json!({
                "url": index.url(),
                "snapshot": index.snapshot_id().to_string(),
                "elements": elements,
            }))?
        }
        OutputFormat::Human => {
            println!("{} interactive element(s) on {}", index.len(), index.url());
            for descriptor in index.iter() {
                let hints = if descriptor.interaction_hints.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", descriptor.interaction_hints.join(", "))
                };
                println!(
                    "  {:<40} {:<10} {}{}",
                    descriptor.display_key,
                    descriptor.element_type.as_str(),
                    descriptor.primary_locator,
                    hints
                );
            }
        }
    }
    Ok(())
}
