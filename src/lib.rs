//! Semantic workflow replay
//!
//! Library half of the `semantic-replay` binary: configuration loading, the
//! language-model extraction client and workflow file handling. The engine
//! itself lives in the `action-*` crates and the browser in `cdp-adapter`.

pub mod config;
pub mod extraction;
pub mod workflow;

pub use config::{load_config, Config, ConfigError, ExtractionConfig, LoadedConfig};
pub use extraction::OpenAiExtractor;
pub use workflow::{collect_inputs, load_workflow, structure_problems, WorkflowFileError};
