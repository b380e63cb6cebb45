//! Semantic indexing and text-to-element resolution
//!
//! This crate turns a live page into a snapshot of uniquely keyed elements and
//! maps human-readable target text back onto one of them with:
//! - Exact display key / raw text matching
//! - Direct id or `name` attribute lookup
//! - Hierarchical matching weighted by container and position hints
//! - Partial containment and word-overlap fallbacks

pub mod errors;
pub mod indexer;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use indexer::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
