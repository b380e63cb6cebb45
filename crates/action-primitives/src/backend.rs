//! Browser automation contract consumed by the replay engine

use crate::{
    errors::ActionError,
    scripts,
    types::{ElementProbe, PageState, RawElement},
};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Primitive operations on the single active page.
///
/// Locators are CSS selectors or `xpath=`-prefixed XPath expressions. Element
/// actions target the first match. Every call suspends until the browser
/// answers; none of them retries on its own.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ActionError>;

    async fn current_url(&self) -> Result<String, ActionError>;

    async fn current_title(&self) -> Result<String, ActionError>;

    /// Wait until at least one element matches, optionally requiring visibility.
    async fn wait_for_selector(
        &self,
        locator: &str,
        timeout: Duration,
        visible: bool,
    ) -> Result<(), ActionError>;

    /// Number of live elements matching the locator.
    async fn query_all(&self, locator: &str) -> Result<usize, ActionError>;

    async fn click(&self, locator: &str) -> Result<(), ActionError>;

    async fn check(&self, locator: &str) -> Result<(), ActionError>;

    async fn uncheck(&self, locator: &str) -> Result<(), ActionError>;

    async fn fill(&self, locator: &str, value: &str) -> Result<(), ActionError>;

    /// Choose the option whose visible label equals `label`.
    async fn select_option(&self, locator: &str, label: &str) -> Result<(), ActionError>;

    async fn press(&self, locator: &str, key: &str) -> Result<(), ActionError>;

    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<(), ActionError>;

    /// Wait for the document to load and network activity to go quiet.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ActionError>;

    async fn evaluate(&self, script: &str) -> Result<Value, ActionError>;

    async fn rendered_content(&self) -> Result<String, ActionError>;

    async fn page_state(&self) -> Result<PageState, ActionError> {
        Ok(PageState {
            url: self.current_url().await?,
            title: self.current_title().await?,
        })
    }

    /// Read tag, type, value and checked state of the first match, if any.
    async fn probe(&self, locator: &str) -> Result<Option<ElementProbe>, ActionError> {
        let value = self.evaluate(&scripts::probe(locator)?).await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| ActionError::Script(format!("malformed probe result: {}", err)))
    }

    /// Enumerate visible interactive elements in document order.
    async fn scan_interactive(&self) -> Result<Vec<RawElement>, ActionError> {
        let value = self.evaluate(scripts::SCAN_INTERACTIVE).await?;
        serde_json::from_value(value)
            .map_err(|err| ActionError::Script(format!("malformed element scan: {}", err)))
    }

    /// Raw text of visible error-indicator elements, unfiltered.
    async fn scan_validation_messages(&self) -> Result<Vec<String>, ActionError> {
        let value = self.evaluate(scripts::SCAN_VALIDATION_MESSAGES).await?;
        serde_json::from_value(value)
            .map_err(|err| ActionError::Script(format!("malformed validation scan: {}", err)))
    }
}
