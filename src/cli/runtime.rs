use std::path::Path;
use std::sync::Arc;

use action_flow::EngineSession;
use action_primitives::BrowserBackend;
use anyhow::{Context, Result};
use cdp_adapter::CdpBackend;
use semantic_replay::{Config, LoadedConfig, OpenAiExtractor};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::output::LogFormat;

/// `RUST_LOG` wins; otherwise `--log-level`, forced to debug by `--debug`.
pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .context("Failed to initialise logging")?;

    Ok(())
}

pub async fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    semantic_replay::load_config(path)
        .await
        .context("Failed to load configuration")
}

/// `--headless` / `--headed` over the configured default.
pub fn headless_override(headless: bool, headed: bool) -> Option<bool> {
    match (headless, headed) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

pub async fn launch_browser(config: &Config, headless: Option<bool>) -> Result<Arc<CdpBackend>> {
    let mut browser_cfg = config.browser.clone();
    if let Some(headless) = headless {
        browser_cfg.headless = headless;
    }
    let backend = CdpBackend::launch(browser_cfg)
        .await
        .context("Failed to launch browser")?;
    Ok(Arc::new(backend))
}

/// Engine session over `backend`, with the extraction client when one is configured.
pub fn build_session(config: &Config, backend: Arc<CdpBackend>) -> Result<EngineSession> {
    let backend: Arc<dyn BrowserBackend> = backend;
    let mut session = EngineSession::new(backend, config.engine.clone());
    if let Some(extractor) = OpenAiExtractor::from_config(&config.extraction)
        .context("Failed to set up structured extraction")?
    {
        info!(model = %config.extraction.model, "Structured extraction enabled");
        session = session.with_extractor(Arc::new(extractor));
    }
    Ok(session)
}
