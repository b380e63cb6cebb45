//! Error types for post-action verification

use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;

/// Gate error enumeration
///
/// These are failures of the verification machinery itself. A check that ran
/// and came out negative is a failing [`crate::GateResult`], not an error.
#[derive(Debug, Error, Clone)]
pub enum GateError {
    /// Verification timeout
    #[error("Verification timeout after {0}ms")]
    Timeout(u64),

    /// Check could not be evaluated
    #[error("Check evaluation failed: {0}")]
    CheckFailed(String),

    /// Browser backend error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Index refresh or resolution failed while verifying
    #[error("Locator error: {0}")]
    Locator(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GateError::Timeout(_) | GateError::Backend(_) | GateError::Locator(_)
        )
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            GateError::Internal(_) => 3,
            GateError::Backend(_) => 2,
            GateError::Timeout(_) | GateError::CheckFailed(_) | GateError::Locator(_) => 1,
        }
    }
}

impl From<ActionError> for GateError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::WaitTimeout(msg) | ActionError::NavTimeout(msg) => {
                GateError::CheckFailed(format!("timed out: {}", msg))
            }
            ActionError::Internal(msg) => GateError::Internal(msg),
            other => GateError::Backend(other.to_string()),
        }
    }
}

impl From<LocatorError> for GateError {
    fn from(err: LocatorError) -> Self {
        GateError::Locator(err.to_string())
    }
}
