//! Browser and extraction primitives for the semantic replay engine
//!
//! This crate defines the collaborator contracts the engine drives:
//! - [`BrowserBackend`]: navigation, waits, element actions and DOM reads on one page
//! - [`StructuredExtractor`]: goal-driven extraction from page markup
//!
//! It also carries the page scripts that evaluate-based backends share, locator
//! helpers, and (behind the `fake` feature) an in-memory page for tests.

pub mod backend;
pub mod errors;
pub mod extraction;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod locator;
pub mod scripts;
pub mod types;
mod waiting;

pub use backend::*;
pub use errors::*;
pub use extraction::*;
pub use types::*;
pub use waiting::*;
