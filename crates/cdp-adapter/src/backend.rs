use crate::{
    config::CdpConfig,
    error::{AdapterError, AdapterErrorKind},
};
use action_primitives::{
    locator::is_xpath,
    scripts::{self, check_status},
    ActionError, BrowserBackend,
};
use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    Page,
};
use futures::StreamExt;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Time without new resource entries after which the page counts as idle.
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Chromium driven over the DevTools protocol, holding a single page.
pub struct CdpBackend {
    cfg: CdpConfig,
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl CdpBackend {
    /// Launch Chromium and open the working page on `about:blank`.
    pub async fn launch(cfg: CdpConfig) -> Result<Self, AdapterError> {
        let mut builder = BrowserConfig::builder()
            .window_size(cfg.window_width, cfg.window_height)
            .request_timeout(cfg.request_timeout());
        if cfg.no_sandbox {
            builder = builder.no_sandbox();
        }
        if !cfg.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &cfg.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let executable = cfg.resolve_executable();
        if let Some(path) = &executable {
            builder = builder.chrome_executable(path);
        }

        let browser_cfg = builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch).with_hint(format!(
                "{err}; set REPLAY_CHROME or browser.executable to a Chromium binary"
            ))
        })?;

        info!(
            headless = cfg.headless,
            executable = ?executable,
            "Launching chromium"
        );
        let (browser, mut handler) = Browser::launch(browser_cfg).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch).with_hint(err.to_string())
        })?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handler_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = handler.next() => match event {
                        Some(Ok(())) => {}
                        Some(Err(err)) => debug!(target: "cdp-adapter", error = %err, "handler event error"),
                        None => break,
                    },
                }
            }
            debug!(target: "cdp-adapter", "handler loop finished");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| AdapterError::from_cdp(err, "open page"))?;

        Ok(Self {
            cfg,
            browser: Mutex::new(Some(browser)),
            page,
            handler_task: Mutex::new(Some(handler_task)),
            cancel,
        })
    }

    pub fn config(&self) -> &CdpConfig {
        &self.cfg
    }

    /// Close the browser and stop the protocol handler.
    pub async fn close(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(err) = browser.close().await {
                warn!(target: "cdp-adapter", error = %err, "browser close returned error");
            }
            if let Err(err) = browser.wait().await {
                debug!(target: "cdp-adapter", error = %err, "waiting for browser exit failed");
            }
        }
        self.cancel.cancel();
        if let Some(task) = self.handler_task.lock().await.take() {
            let _ = task.await;
        }
        info!(target: "cdp-adapter", "Browser closed");
    }

    async fn run_script(&self, script: &str) -> Result<Value, AdapterError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|err| AdapterError::from_cdp(err, "evaluate"))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Run an element action script and map its `{ status }` onto an error.
    async fn act(&self, script: String, locator: &str) -> Result<(), ActionError> {
        let value = self.run_script(&script).await?;
        check_status(&value, locator)
    }

    async fn count(&self, locator: &str, visible_only: bool) -> Result<usize, ActionError> {
        let value = self
            .run_script(&scripts::count(locator, visible_only)?)
            .await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| ActionError::Script(format!("count returned {}", value)))
    }

    /// Trusted mouse click through the protocol; CSS locators only.
    async fn native_click(&self, locator: &str) -> Result<(), AdapterError> {
        let element = self
            .page
            .find_element(locator)
            .await
            .map_err(|err| AdapterError::from_cdp(err, "find element"))?;
        element
            .click()
            .await
            .map_err(|err| AdapterError::from_cdp(err, "click"))?;
        Ok(())
    }
}

impl Drop for CdpBackend {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl BrowserBackend for CdpBackend {
    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        url::Url::parse(url)
            .map_err(|err| ActionError::Backend(format!("invalid url '{}': {}", url, err)))?;
        debug!(target: "cdp-adapter", url, "goto");
        self.page
            .goto(url)
            .await
            .map_err(|err| AdapterError::from_cdp(err, &format!("goto {url}")))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ActionError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|err| AdapterError::from_cdp(err, "read url"))?;
        Ok(url.unwrap_or_default())
    }

    async fn current_title(&self) -> Result<String, ActionError> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|err| AdapterError::from_cdp(err, "read title"))?;
        Ok(title.unwrap_or_default())
    }

    async fn wait_for_selector(
        &self,
        locator: &str,
        timeout: Duration,
        visible: bool,
    ) -> Result<(), ActionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count(locator, visible).await? > 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ActionError::WaitTimeout(format!(
                    "'{}' not {} within {}ms",
                    locator,
                    if visible { "visible" } else { "attached" },
                    timeout.as_millis()
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn query_all(&self, locator: &str) -> Result<usize, ActionError> {
        self.count(locator, false).await
    }

    async fn click(&self, locator: &str) -> Result<(), ActionError> {
        let probe = self
            .probe(locator)
            .await?
            .ok_or_else(|| ActionError::AnchorNotFound(format!("No element matches '{}'", locator)))?;
        if probe.disabled {
            return Err(ActionError::NotEnabled(format!(
                "Element '{}' is disabled",
                locator
            )));
        }
        if probe.visible && !is_xpath(locator) {
            match self.native_click(locator).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!(target: "cdp-adapter", locator, error = %err, "native click failed; using script click")
                }
            }
        }
        self.act(scripts::click(locator)?, locator).await
    }

    async fn check(&self, locator: &str) -> Result<(), ActionError> {
        self.act(scripts::set_checked(locator, true)?, locator).await
    }

    async fn uncheck(&self, locator: &str) -> Result<(), ActionError> {
        self.act(scripts::set_checked(locator, false)?, locator).await
    }

    async fn fill(&self, locator: &str, value: &str) -> Result<(), ActionError> {
        self.act(scripts::fill(locator, value)?, locator).await
    }

    async fn select_option(&self, locator: &str, label: &str) -> Result<(), ActionError> {
        self.act(scripts::select_option(locator, label)?, locator)
            .await
            .map_err(|err| match err {
                ActionError::OptionNotFound(_) => ActionError::OptionNotFound(format!(
                    "No option labelled '{}' in '{}'",
                    label, locator
                )),
                other => other,
            })
    }

    async fn press(&self, locator: &str, key: &str) -> Result<(), ActionError> {
        self.act(scripts::press(locator, key)?, locator).await
    }

    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<(), ActionError> {
        self.run_script(&scripts::scroll_by(dx, dy)).await?;
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ActionError> {
        let deadline = Instant::now() + timeout;
        let mut last_resources: Option<u64> = None;
        let mut quiet_since = Instant::now();
        loop {
            let state = self.run_script(scripts::READY_STATE).await?;
            let complete = state.get("readyState").and_then(Value::as_str) == Some("complete");
            let resources = state.get("resources").and_then(Value::as_u64).unwrap_or(0);

            if last_resources != Some(resources) || !complete {
                last_resources = Some(resources);
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= NETWORK_QUIET_WINDOW {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(ActionError::WaitTimeout(format!(
                    "network not idle within {}ms",
                    timeout.as_millis()
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ActionError> {
        Ok(self.run_script(script).await?)
    }

    async fn rendered_content(&self) -> Result<String, ActionError> {
        let markup = self
            .page
            .content()
            .await
            .map_err(|err| AdapterError::from_cdp(err, "read content"))?;
        Ok(markup)
    }
}
