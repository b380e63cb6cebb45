//! Workflow replay layer
//!
//! This crate runs recorded workflows step by step against one browser page:
//! - Workflow model with placeholder substitution and input validation
//! - Step executor resolving targets by visible text
//! - Retry governor with a run-wide failure budget
//! - Orchestrator returning partial results on failure or cancellation
//! - Converter from selector-based recordings to semantic steps

pub mod config;
pub mod context;
pub mod convert;
pub mod errors;
pub mod executor;
pub mod governor;
pub mod inputs;
pub mod runner;
pub mod session;
pub mod types;

pub use config::EngineConfig;
pub use context::{placeholder_names, RunContext};
pub use convert::{convert_workflow, default_output_path};
pub use errors::{FailureKind, FailureReport, FlowError, StepDiagnostics, StepFailure};
pub use executor::{StepEffect, StepExecutor};
pub use governor::{Governed, RetryGovernor, StepAttempt, StepState};
pub use inputs::{parse_truthy, validate_inputs, wants_checked};
pub use runner::WorkflowRunner;
pub use session::{EngineSession, FailureCounters};
pub use types::*;
