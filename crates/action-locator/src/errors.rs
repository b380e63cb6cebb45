//! Error types for indexing and resolution

use action_primitives::ActionError;
use replay_core_types::IndexError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// No strategy produced a match
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Multiple elements match (ambiguous)
    #[error("Multiple elements match: {0}")]
    AmbiguousMatch(String),

    /// Target description is empty or unusable
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Index snapshot could not be assembled
    #[error("Index build failed: {0}")]
    IndexBuild(String),

    /// Browser backend failed while reading the page
    #[error("Backend error: {0}")]
    Backend(String),

    /// Timeout during resolution
    #[error("Resolution timeout: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LocatorError::Timeout(_)
                | LocatorError::Backend(_)
                | LocatorError::ElementNotFound(_)
        )
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Internal(_) | LocatorError::IndexBuild(_) => 3,
            LocatorError::Backend(_) | LocatorError::Timeout(_) => 2,
            LocatorError::ElementNotFound(_) | LocatorError::InvalidTarget(_) => 1,
            LocatorError::AmbiguousMatch(_) => 0,
        }
    }
}

impl From<ActionError> for LocatorError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::WaitTimeout(msg) | ActionError::NavTimeout(msg) => {
                LocatorError::Timeout(msg)
            }
            other => LocatorError::Backend(other.to_string()),
        }
    }
}

impl From<IndexError> for LocatorError {
    fn from(err: IndexError) -> Self {
        LocatorError::IndexBuild(err.to_string())
    }
}
