//! Core types for post-action verification

use action_primitives::PageState;
use serde::{Deserialize, Serialize};

/// Target of the next interactive step, used to confirm progression clicks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextTarget {
    pub text: String,
    pub hints: Vec<String>,
}

impl NextTarget {
    pub fn new(text: impl Into<String>, hints: Vec<String>) -> Self {
        Self {
            text: text.into(),
            hints,
        }
    }
}

/// Action-specific post-condition, chosen by the executor for each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum VerificationCheck {
    /// Radio or checkbox must end in the intended state
    Toggle { locator: String, expect_checked: bool },

    /// Click on a next/continue/submit/finish control
    Progression {
        locator: String,
        next_target: Option<NextTarget>,
    },

    /// Any other click; present or gone both pass
    Click { locator: String },

    /// Field or dropdown must hold the requested value
    Value { locator: String, expected: String },

    /// Page must be at the requested URL
    Navigate { url: String },

    /// Only the validation-error scan applies
    ValidationOnly,

    /// Nothing to check
    None,
}

impl VerificationCheck {
    /// Whether newly-appeared validation messages fail this step.
    pub fn scans_validation(&self) -> bool {
        !matches!(
            self,
            VerificationCheck::Navigate { .. } | VerificationCheck::None
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            VerificationCheck::Toggle { .. } => "toggle",
            VerificationCheck::Progression { .. } => "progression",
            VerificationCheck::Click { .. } => "click",
            VerificationCheck::Value { .. } => "value",
            VerificationCheck::Navigate { .. } => "navigate",
            VerificationCheck::ValidationOnly => "validation-only",
            VerificationCheck::None => "none",
        }
    }
}

/// Page observations taken just before an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageBaseline {
    pub state: PageState,
    pub validation_messages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    Passed,
    /// The page surfaced a new form error
    ValidationError,
    /// The action ran but its post-condition is false
    Failed,
}

/// Verification result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub outcome: GateOutcome,

    /// Reasons for pass/fail
    pub reasons: Vec<String>,

    /// New validation messages, when the outcome is `ValidationError`
    pub validation_messages: Vec<String>,

    /// Verification latency in milliseconds
    pub latency_ms: u64,
}

impl GateResult {
    /// Create a passing result
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            outcome: GateOutcome::Passed,
            reasons: vec![reason.into()],
            validation_messages: Vec::new(),
            latency_ms: 0,
        }
    }

    /// Create a failing result
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            outcome: GateOutcome::Failed,
            reasons: vec![reason.into()],
            validation_messages: Vec::new(),
            latency_ms: 0,
        }
    }

    pub fn validation_error(messages: Vec<String>) -> Self {
        Self {
            outcome: GateOutcome::ValidationError,
            reasons: vec![format!("Validation errors appeared: {}", messages.join("; "))],
            validation_messages: messages,
            latency_ms: 0,
        }
    }

    /// Set latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn passed(&self) -> bool {
        self.outcome == GateOutcome::Passed
    }

    pub fn summary(&self) -> String {
        self.reasons.join("; ")
    }
}
