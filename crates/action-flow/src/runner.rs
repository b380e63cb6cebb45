//! Workflow orchestrator
//!
//! Runs steps strictly in order against one session, resolving placeholders,
//! storing outputs and stopping at the first step that cannot be completed.

use crate::{
    context::RunContext,
    errors::{FailureReport, FlowError, StepFailure},
    executor::{StepEffect, StepExecutor},
    governor::{RetryGovernor, StepAttempt},
    inputs::validate_inputs,
    session::EngineSession,
    types::*,
};
use action_gate::{GateOutcome, NextTarget, PageBaseline};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Executor and verifier bound to one step, retried by the governor.
struct SessionStep<'a> {
    session: &'a mut EngineSession,
    executor: &'a StepExecutor,
    step: &'a WorkflowStep,
    next: Option<NextTarget>,
    baseline: PageBaseline,
    retry_delay: Duration,
}

#[async_trait]
impl StepAttempt for SessionStep<'_> {
    async fn execute(&mut self) -> Result<StepEffect, StepFailure> {
        self.baseline = self
            .session
            .verifier()
            .capture_baseline(self.session.backend())
            .await
            .map_err(|err| StepFailure::execution(err.to_string()))?;
        self.executor
            .execute(self.session, self.step, self.next.clone())
            .await
    }

    async fn verify(&mut self, effect: &StepEffect) -> Result<(), StepFailure> {
        let result = self
            .session
            .verifier()
            .verify(self.session.backend(), &effect.check, &self.baseline)
            .await
            .map_err(|err| StepFailure::verification(err.to_string()))?;
        match result.outcome {
            GateOutcome::Passed => Ok(()),
            GateOutcome::ValidationError => Err(StepFailure::validation(result.validation_messages)),
            GateOutcome::Failed => Err(StepFailure::verification(result.summary())),
        }
    }

    async fn before_retry(&mut self, _attempt: u32, _failure: &StepFailure) {
        if !self.retry_delay.is_zero() {
            tokio::time::sleep(self.retry_delay).await;
        }
        if let Err(err) = self.session.refresh_index().await {
            warn!(error = %err, "Index refresh before retry failed");
        }
    }
}

pub struct WorkflowRunner {
    workflow: WorkflowDefinition,
    session: EngineSession,
    executor: StepExecutor,
    governor: RetryGovernor,
}

impl WorkflowRunner {
    pub fn new(workflow: WorkflowDefinition, session: EngineSession) -> Self {
        let governor = RetryGovernor::from_config(session.config());
        Self {
            workflow,
            session,
            executor: StepExecutor::new(),
            governor,
        }
    }

    pub fn workflow(&self) -> &WorkflowDefinition {
        &self.workflow
    }

    pub fn session(&self) -> &EngineSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EngineSession {
        &mut self.session
    }

    pub fn into_session(self) -> EngineSession {
        self.session
    }

    /// Execute every step in order.
    ///
    /// Only invalid inputs are returned as `Err`; step failures and cancellation
    /// end the run with the partial results gathered so far.
    pub async fn run(
        &mut self,
        inputs: Map<String, Value>,
        cancel: Option<CancellationToken>,
    ) -> Result<RunOutput, FlowError> {
        let validated = validate_inputs(&self.workflow.input_schema, inputs)?;
        let mut context = RunContext::from(validated);
        self.session.reset_counters();

        let total = self.workflow.steps.len();
        info!(
            run = %self.session.run_id(),
            workflow = %self.workflow.name,
            steps = total,
            "Starting workflow run"
        );

        let mut step_results = Vec::with_capacity(total);
        for index in 0..total {
            if cancel.as_ref().map_or(false, CancellationToken::is_cancelled) {
                info!(step = index, completed = step_results.len(), "Run cancelled");
                return Ok(RunOutput {
                    step_results,
                    final_context: context,
                    status: RunStatus::Cancelled { at_step: index },
                });
            }

            let step = context.resolve_step(&self.workflow.steps[index]);
            match self.execute_step(index, &step, &context).await {
                Ok(outcome) => {
                    context.store_output(&step, &outcome);
                    step_results.push(outcome);
                }
                Err(err) => {
                    let report = err.into_report(index, &step.label());
                    error!(
                        step = index,
                        kind = %report.kind,
                        message = %report.message,
                        "Workflow run failed"
                    );
                    return Ok(RunOutput {
                        step_results,
                        final_context: context,
                        status: RunStatus::Failed(Box::new(report)),
                    });
                }
            }
        }

        info!(
            run = %self.session.run_id(),
            steps = step_results.len(),
            "Workflow run completed"
        );
        Ok(RunOutput {
            step_results,
            final_context: context,
            status: RunStatus::Completed,
        })
    }

    /// Execute a single step with already-resolved inputs.
    ///
    /// The failure budget carries over between calls, as it does between the
    /// steps of a run.
    pub async fn run_step(
        &mut self,
        index: usize,
        inputs: Option<Map<String, Value>>,
    ) -> Result<ExecutionOutcome, FlowError> {
        let len = self.workflow.steps.len();
        let raw = self
            .workflow
            .steps
            .get(index)
            .ok_or(FlowError::StepOutOfRange { index, len })?;
        let context = inputs.map(RunContext::from).unwrap_or_default();
        let step = context.resolve_step(raw);
        self.execute_step(index, &step, &context).await
    }

    fn next_target(&self, index: usize, context: &RunContext) -> Option<NextTarget> {
        let next = self.workflow.steps.get(index + 1)?;
        if !next.is_interactive() {
            return None;
        }
        let resolved = context.resolve_step(next);
        let target = resolved.target()?;
        target
            .semantic_text()
            .map(|text| NextTarget::new(text, target.hints()))
    }

    async fn execute_step(
        &mut self,
        index: usize,
        step: &WorkflowStep,
        context: &RunContext,
    ) -> Result<ExecutionOutcome, FlowError> {
        let label = step.label();
        self.governor.check_budget(self.session.counters())?;
        if !step.is_supported() {
            return Err(FlowError::UnsupportedStepType(step.kind().to_string()));
        }

        info!(
            step = index,
            total = self.workflow.steps.len(),
            kind = step.kind(),
            description = %label,
            "Running step"
        );
        let start = Instant::now();
        if let Err(err) = self.session.refresh_index().await {
            warn!(step = index, error = %err, "Index refresh before step failed");
        }

        let next = self.next_target(index, context);
        let governed = {
            let mut attempt = SessionStep {
                session: &mut self.session,
                executor: &self.executor,
                step,
                next,
                baseline: PageBaseline::default(),
                retry_delay: self.governor.retry_delay(),
            };
            self.governor.run(&mut attempt, &label).await
        };
        self.governor
            .record(self.session.counters_mut(), &governed, &label);

        match governed.result {
            Ok(effect) => Ok(ExecutionOutcome {
                step_index: index,
                step_type: step.kind().to_string(),
                description: label,
                summary: effect.summary,
                extracted: effect.extracted,
                locator: effect.locator,
                attempts: governed.attempts,
                warnings: effect.warnings,
                duration_ms: start.elapsed().as_millis() as u64,
            }),
            Err(failure) => {
                let target_text = step
                    .target()
                    .and_then(StepTarget::identifier)
                    .map(str::to_string);
                let diagnostics = self.session.diagnostics(target_text.as_deref()).await;
                Err(FlowError::StepFailed(Box::new(FailureReport {
                    step_index: index,
                    description: label,
                    target_text,
                    kind: failure.kind,
                    message: failure.message,
                    attempts: governed.attempts,
                    diagnostics: Some(diagnostics),
                })))
            }
        }
    }
}
