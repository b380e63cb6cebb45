//! Visibility waits across a locator fallback chain

use crate::{backend::BrowserBackend, errors::ActionError};
use std::time::Duration;
use tracing::{debug, warn};

/// Timeouts for the primary locator and for each fallback after it.
#[derive(Clone, Copy, Debug)]
pub struct WaitBudget {
    pub primary: Duration,
    pub fallback: Duration,
}

impl Default for WaitBudget {
    fn default() -> Self {
        Self {
            primary: Duration::from_millis(5000),
            fallback: Duration::from_millis(2000),
        }
    }
}

/// Return the first locator in `chain` that becomes visible.
///
/// The first entry gets the primary timeout, later entries the shorter fallback
/// timeout. The last wait error is returned when none appears.
pub async fn wait_for_first_visible(
    backend: &dyn BrowserBackend,
    chain: &[String],
    budget: WaitBudget,
) -> Result<String, ActionError> {
    let mut last_error = None;
    for (position, locator) in chain.iter().enumerate() {
        let timeout = if position == 0 {
            budget.primary
        } else {
            budget.fallback
        };
        match backend.wait_for_selector(locator, timeout, true).await {
            Ok(()) => {
                if position > 0 {
                    debug!(locator = %locator, position, "Using fallback locator");
                }
                return Ok(locator.clone());
            }
            Err(err) => {
                warn!(locator = %locator, error = %err, "Locator did not become visible");
                last_error = Some(err);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| {
        ActionError::AnchorNotFound("no locator available to wait for".to_string())
    }))
}
