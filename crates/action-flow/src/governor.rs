//! Retry governor
//!
//! Drives one step through `Pending → Executing → Verifying → {Succeeded |
//! Retrying | Failed}` and keeps the run-wide failure budget.

use crate::{
    config::EngineConfig,
    errors::{FlowError, StepFailure},
    executor::StepEffect,
    session::FailureCounters,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Executing,
    Verifying,
    Retrying,
    Succeeded,
    Failed,
}

impl StepState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepState::Pending => "pending",
            StepState::Executing => "executing",
            StepState::Verifying => "verifying",
            StepState::Retrying => "retrying",
            StepState::Succeeded => "succeeded",
            StepState::Failed => "failed",
        }
    }
}

/// One retryable unit of work: an action followed by its verification.
#[async_trait]
pub trait StepAttempt: Send {
    async fn execute(&mut self) -> Result<StepEffect, StepFailure>;

    async fn verify(&mut self, effect: &StepEffect) -> Result<(), StepFailure>;

    /// Called between a failed attempt and the next one.
    async fn before_retry(&mut self, _attempt: u32, _failure: &StepFailure) {}
}

/// Result of driving one step to a terminal state
#[derive(Debug)]
pub struct Governed {
    pub result: Result<StepEffect, StepFailure>,
    pub attempts: u32,
}

impl Governed {
    pub fn state(&self) -> StepState {
        if self.result.is_ok() {
            StepState::Succeeded
        } else {
            StepState::Failed
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryGovernor {
    max_retries: u32,
    max_global_failures: u32,
    max_consecutive_failures: u32,
    max_verification_failures: u32,
    retry_delay: Duration,
}

impl Default for RetryGovernor {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl RetryGovernor {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            max_global_failures: config.max_global_failures,
            max_consecutive_failures: config.max_consecutive_failures,
            max_verification_failures: config.max_verification_failures,
            retry_delay: config.retry_delay(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Fail fast when the run-wide budget is already spent.
    pub fn check_budget(&self, counters: &FailureCounters) -> Result<(), FlowError> {
        let exceeded = if counters.global_failures >= self.max_global_failures {
            Some(format!(
                "{} steps failed in this run (limit {})",
                counters.global_failures, self.max_global_failures
            ))
        } else if counters.consecutive_failures >= self.max_consecutive_failures {
            Some(format!(
                "{} consecutive steps failed (limit {})",
                counters.consecutive_failures, self.max_consecutive_failures
            ))
        } else if counters.consecutive_verification_failures >= self.max_verification_failures {
            Some(format!(
                "{} consecutive verification failures (limit {})",
                counters.consecutive_verification_failures, self.max_verification_failures
            ))
        } else {
            None
        };

        match exceeded {
            Some(reason) => {
                let last = counters
                    .last_successful_step
                    .as_deref()
                    .map(|s| format!("; last successful step: {}", s))
                    .unwrap_or_default();
                warn!(
                    global = counters.global_failures,
                    consecutive = counters.consecutive_failures,
                    verification = counters.consecutive_verification_failures,
                    "Failure budget exceeded; aborting run"
                );
                Err(FlowError::SystemicFailure(format!("{}{}", reason, last)))
            }
            None => Ok(()),
        }
    }

    /// Attempt `step` until it succeeds, fails terminally or runs out of retries.
    pub async fn run<A: StepAttempt + ?Sized>(&self, step: &mut A, label: &str) -> Governed {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;
        let mut state = StepState::Pending;
        loop {
            attempt += 1;
            transition(label, &mut state, StepState::Executing);
            let outcome = match step.execute().await {
                Ok(effect) => {
                    transition(label, &mut state, StepState::Verifying);
                    step.verify(&effect).await.map(|_| effect)
                }
                Err(failure) => Err(failure),
            };

            let failure = match outcome {
                Ok(effect) => {
                    transition(label, &mut state, StepState::Succeeded);
                    return Governed {
                        result: Ok(effect),
                        attempts: attempt,
                    };
                }
                Err(failure) => failure,
            };

            if !failure.kind.is_retryable() || attempt >= max_attempts {
                transition(label, &mut state, StepState::Failed);
                return Governed {
                    result: Err(failure),
                    attempts: attempt,
                };
            }

            transition(label, &mut state, StepState::Retrying);
            info!(
                step = label,
                attempt,
                max_attempts,
                kind = %failure.kind,
                reason = %failure.message,
                "Retrying step"
            );
            step.before_retry(attempt, &failure).await;
        }
    }

    /// Fold a terminal step result into the run's failure budget.
    pub fn record(&self, counters: &mut FailureCounters, governed: &Governed, label: &str) {
        match &governed.result {
            Ok(_) => counters.record_success(label),
            Err(failure) if failure.kind.is_retryable() => {
                counters.record_failure(failure.kind.is_verification_only());
                warn!(
                    step = label,
                    kind = %failure.kind,
                    global = counters.global_failures,
                    consecutive = counters.consecutive_failures,
                    verification = counters.consecutive_verification_failures,
                    "Step failed after exhausting retries"
                );
            }
            Err(failure) => {
                debug!(step = label, kind = %failure.kind, "Non-retryable failure; budget unchanged");
            }
        }
    }
}

fn transition(label: &str, state: &mut StepState, next: StepState) {
    debug!(step = label, from = state.as_str(), to = next.as_str(), "Step state");
    *state = next;
}
