//! Workflow execution error types

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure classification the retry governor acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ElementNotFound,
    ValidationErrorDetected,
    VerificationFailed,
    ExecutionException,
    SystemicFailure,
    UnsupportedStepType,
    InvalidInputs,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ElementNotFound => "element_not_found",
            FailureKind::ValidationErrorDetected => "validation_error_detected",
            FailureKind::VerificationFailed => "verification_failed",
            FailureKind::ExecutionException => "execution_exception",
            FailureKind::SystemicFailure => "systemic_failure",
            FailureKind::UnsupportedStepType => "unsupported_step_type",
            FailureKind::InvalidInputs => "invalid_inputs",
        }
    }

    /// Recovered locally by refreshing the index and retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::ElementNotFound
                | FailureKind::ValidationErrorDetected
                | FailureKind::VerificationFailed
                | FailureKind::ExecutionException
        )
    }

    /// The action ran but its post-condition did not hold
    pub fn is_verification_only(&self) -> bool {
        matches!(self, FailureKind::VerificationFailed)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one attempt at a step failed
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Messages behind a `ValidationErrorDetected` failure
    pub validation_messages: Vec<String>,
}

impl StepFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            validation_messages: Vec::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ElementNotFound, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ExecutionException, message)
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::new(FailureKind::VerificationFailed, message)
    }

    pub fn validation(messages: Vec<String>) -> Self {
        Self {
            kind: FailureKind::ValidationErrorDetected,
            message: messages.join("; "),
            validation_messages: messages,
        }
    }

    pub fn unsupported(kind: &str) -> Self {
        Self::new(FailureKind::UnsupportedStepType, kind)
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Page observations attached to a failed step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepDiagnostics {
    pub url: String,
    pub title: String,
    pub validation_messages: Vec<String>,
    /// Display keys textually close to the target, best first
    pub similar_elements: Vec<String>,
}

/// What a caller sees for a step that could not be completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub step_index: usize,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_text: Option<String>,
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<StepDiagnostics>,
}

/// Workflow execution errors
#[derive(Debug, Error, Clone)]
pub enum FlowError {
    /// Resolver exhausted every strategy
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Page surfaced form errors after the action
    #[error("Validation errors detected: {}", .0.join("; "))]
    ValidationErrorDetected(Vec<String>),

    /// Action ran but its post-condition is false
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Interaction primitive failed
    #[error("Execution failed: {0}")]
    ExecutionException(String),

    /// Failure budget crossed; the run is aborted
    #[error("Systemic failure: {0}")]
    SystemicFailure(String),

    /// Step type this engine cannot execute
    #[error("Unsupported step type: {0}")]
    UnsupportedStepType(String),

    /// Inputs do not satisfy the workflow's input schema
    #[error("Invalid workflow inputs: {0}")]
    InvalidInputs(String),

    /// Step index outside the workflow
    #[error("Step index {index} out of range (workflow has {len} steps)")]
    StepOutOfRange { index: usize, len: usize },

    /// Step exhausted its retries
    #[error("Step {} ({}) failed after {} attempt(s): {} - {}", .0.step_index + 1, .0.description, .0.attempts, .0.kind, .0.message)]
    StepFailed(Box<FailureReport>),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FlowError::ElementNotFound(_) => FailureKind::ElementNotFound,
            FlowError::ValidationErrorDetected(_) => FailureKind::ValidationErrorDetected,
            FlowError::VerificationFailed(_) => FailureKind::VerificationFailed,
            FlowError::SystemicFailure(_) => FailureKind::SystemicFailure,
            FlowError::UnsupportedStepType(_) => FailureKind::UnsupportedStepType,
            FlowError::InvalidInputs(_) | FlowError::StepOutOfRange { .. } => {
                FailureKind::InvalidInputs
            }
            FlowError::StepFailed(report) => report.kind,
            FlowError::ExecutionException(_) | FlowError::Internal(_) => {
                FailureKind::ExecutionException
            }
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::StepFailed(_) => false,
            other => other.kind().is_retryable(),
        }
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            FlowError::SystemicFailure(_) | FlowError::Internal(_) => 3,
            FlowError::StepFailed(_)
            | FlowError::UnsupportedStepType(_)
            | FlowError::InvalidInputs(_)
            | FlowError::StepOutOfRange { .. } => 2,
            FlowError::ExecutionException(_) | FlowError::ValidationErrorDetected(_) => 1,
            FlowError::ElementNotFound(_) | FlowError::VerificationFailed(_) => 1,
        }
    }

    /// Failure report for step `step_index`, reusing the one already attached.
    pub fn into_report(self, step_index: usize, description: &str) -> FailureReport {
        match self {
            FlowError::StepFailed(report) => *report,
            other => FailureReport {
                step_index,
                description: description.to_string(),
                target_text: None,
                kind: other.kind(),
                message: other.to_string(),
                attempts: 0,
                diagnostics: None,
            },
        }
    }
}

impl From<StepFailure> for FlowError {
    fn from(failure: StepFailure) -> Self {
        match failure.kind {
            FailureKind::ElementNotFound => FlowError::ElementNotFound(failure.message),
            FailureKind::ValidationErrorDetected => {
                FlowError::ValidationErrorDetected(failure.validation_messages)
            }
            FailureKind::VerificationFailed => FlowError::VerificationFailed(failure.message),
            FailureKind::ExecutionException => FlowError::ExecutionException(failure.message),
            FailureKind::SystemicFailure => FlowError::SystemicFailure(failure.message),
            FailureKind::UnsupportedStepType => FlowError::UnsupportedStepType(failure.message),
            FailureKind::InvalidInputs => FlowError::InvalidInputs(failure.message),
        }
    }
}

impl From<action_primitives::ActionError> for FlowError {
    fn from(err: action_primitives::ActionError) -> Self {
        FlowError::ExecutionException(err.to_string())
    }
}

impl From<action_locator::LocatorError> for FlowError {
    fn from(err: action_locator::LocatorError) -> Self {
        match err {
            action_locator::LocatorError::ElementNotFound(msg) => FlowError::ElementNotFound(msg),
            other => FlowError::ExecutionException(other.to_string()),
        }
    }
}
