//! Core types for resolution

use action_primitives::BrowserBackend;
use replay_core_types::{ElementDescriptor, SemanticIndex};
use serde::{Deserialize, Serialize};

/// Match strategies, in the order the resolver tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Case-insensitive equality with a display key or raw text
    Exact,

    /// Target treated as an id or name attribute on the live page
    DirectAttribute,

    /// Text match weighted by container/sibling hints and locator specificity
    Hierarchical,

    /// Substring containment in either direction
    Partial,

    /// Token overlap after camelCase and punctuation splitting
    WordOverlap,
}

impl MatchStrategy {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::DirectAttribute => "direct-attribute",
            MatchStrategy::Hierarchical => "hierarchical",
            MatchStrategy::Partial => "partial",
            MatchStrategy::WordOverlap => "word-overlap",
        }
    }

    /// Get all strategies in fallback order
    pub fn fallback_chain() -> Vec<MatchStrategy> {
        vec![
            MatchStrategy::Exact,
            MatchStrategy::DirectAttribute,
            MatchStrategy::Hierarchical,
            MatchStrategy::Partial,
            MatchStrategy::WordOverlap,
        ]
    }
}

/// One resolution request against an index snapshot.
pub struct ResolveRequest<'a> {
    pub backend: &'a dyn BrowserBackend,
    pub index: &'a SemanticIndex,
    pub target: &'a str,
    pub hints: &'a [String],
}

impl<'a> ResolveRequest<'a> {
    pub fn new(
        backend: &'a dyn BrowserBackend,
        index: &'a SemanticIndex,
        target: &'a str,
        hints: &'a [String],
    ) -> Self {
        Self {
            backend,
            index,
            target,
            hints,
        }
    }

    /// Hints with blanks removed, lowercased.
    pub fn normalized_hints(&self) -> Vec<String> {
        self.hints
            .iter()
            .map(|h| normalize(h))
            .filter(|h| !h.is_empty())
            .collect()
    }
}

/// Element candidate produced by a strategy
#[derive(Debug, Clone)]
pub struct Candidate {
    pub descriptor: ElementDescriptor,
    pub strategy: MatchStrategy,
    /// Strategy-specific score (0.0-1.0)
    pub score: f64,
}

impl Candidate {
    pub fn new(descriptor: ElementDescriptor, strategy: MatchStrategy, score: f64) -> Self {
        Self {
            descriptor,
            strategy,
            score,
        }
    }
}

/// Winning candidate of a resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub descriptor: ElementDescriptor,
    pub strategy: MatchStrategy,
    pub score: f64,
    /// Number of candidates that tied on the winning score
    pub tied: usize,
}

/// Lowercase, trimmed, whitespace-collapsed.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
