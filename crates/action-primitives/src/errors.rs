//! Error types for browser and extraction primitives

use thiserror::Error;

/// Errors raised by browser backends and extraction collaborators
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    /// Navigation timed out waiting for page load
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    /// Wait operation timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Element is not clickable (obscured, disabled, or wrong kind)
    #[error("Element not clickable: {0}")]
    NotClickable(String),

    /// Element is not enabled for interaction
    #[error("Element not enabled: {0}")]
    NotEnabled(String),

    /// Dropdown option was not found
    #[error("Option not found in dropdown: {0}")]
    OptionNotFound(String),

    /// No live element matched the locator
    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    /// Page script evaluation failed or returned an unexpected shape
    #[error("Script error: {0}")]
    Script(String),

    /// Browser process or protocol failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Structured extraction collaborator failed
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::WaitTimeout(_)
                | ActionError::NotClickable(_)
                | ActionError::AnchorNotFound(_)
                | ActionError::Backend(_)
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::Internal(_) => 3,
            ActionError::NavTimeout(_) | ActionError::Backend(_) | ActionError::Script(_) => 2,
            ActionError::WaitTimeout(_)
            | ActionError::AnchorNotFound(_)
            | ActionError::NotEnabled(_) => 1,
            _ => 0,
        }
    }
}
