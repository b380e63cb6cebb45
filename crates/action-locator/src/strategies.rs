//! Match strategies
//!
//! Five strategies in fallback order:
//! 1. Exact - display key or raw text equality
//! 2. Direct attribute - target as id/name, checked against the live page
//! 3. Hierarchical - text match weighted by context hints and locator specificity
//! 4. Partial - substring containment
//! 5. Word overlap - token set similarity

use crate::{errors::LocatorError, types::*};
use action_primitives::{locator, ElementProbe};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use replay_core_types::{ElementAttributes, ElementDescriptor, ElementType};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

/// Partial matches below this length ratio are noise.
const MIN_PARTIAL_RATIO: f64 = 0.15;
const OVERLAP_THRESHOLD: f64 = 0.3;
const SHORT_OVERLAP_THRESHOLD: f64 = 0.4;
/// Targets with at most this many tokens use the stricter overlap threshold.
const SHORT_TEXT_TOKENS: usize = 2;

static DIRECT_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid direct attribute regex"));

/// Strategy trait for element resolution
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Candidates this strategy accepts, in index order
    async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Vec<Candidate>, LocatorError>;

    /// Get strategy type
    fn strategy_type(&self) -> MatchStrategy;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }
}

/// Exact equality with a display key, then with raw text.
pub struct ExactStrategy;

#[async_trait]
impl Strategy for ExactStrategy {
    async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Vec<Candidate>, LocatorError> {
        let target = normalize(request.target);
        if let Some(found) = request
            .index
            .iter()
            .find(|d| normalize(&d.display_key) == target)
        {
            return Ok(vec![Candidate::new(found.clone(), MatchStrategy::Exact, 1.0)]);
        }

        let by_raw: Vec<Candidate> = request
            .index
            .iter()
            .filter(|d| normalize(&d.raw_text) == target)
            .map(|d| Candidate::new(d.clone(), MatchStrategy::Exact, 1.0))
            .collect();

        // Duplicated raw text is left to the hierarchical strategy when hints can settle it.
        if by_raw.len() > 1 && !request.normalized_hints().is_empty() {
            debug!(
                target = request.target,
                matches = by_raw.len(),
                "Raw text is duplicated; deferring to context hints"
            );
            return Ok(Vec::new());
        }
        Ok(by_raw)
    }

    fn strategy_type(&self) -> MatchStrategy {
        MatchStrategy::Exact
    }
}

/// Treats identifier-like targets as an id or `name` attribute.
pub struct DirectAttributeStrategy {
    probe_timeout: Duration,
}

impl DirectAttributeStrategy {
    pub fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    async fn probe_live(
        &self,
        request: &ResolveRequest<'_>,
        selector: &str,
    ) -> Result<Option<ElementProbe>, LocatorError> {
        if request.backend.query_all(selector).await? == 0 {
            return Ok(None);
        }
        if request
            .backend
            .wait_for_selector(selector, self.probe_timeout, true)
            .await
            .is_err()
        {
            return Ok(None);
        }
        Ok(request.backend.probe(selector).await?)
    }
}

#[async_trait]
impl Strategy for DirectAttributeStrategy {
    async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Vec<Candidate>, LocatorError> {
        let target = request.target.trim();
        if !DIRECT_ATTRIBUTE.is_match(target) {
            return Ok(Vec::new());
        }

        let indexed: Vec<Candidate> = request
            .index
            .iter()
            .filter(|d| {
                d.attributes.id.as_deref() == Some(target)
                    || d.attributes.name.as_deref() == Some(target)
            })
            .map(|d| Candidate::new(d.clone(), MatchStrategy::DirectAttribute, 1.0))
            .collect();
        if !indexed.is_empty() {
            return Ok(indexed);
        }

        // Not in the snapshot: the element may be outside the interactive scan.
        for selector in [
            locator::css_id(target),
            locator::css_attr("name", target),
            locator::css_attr("id", target),
        ] {
            match self.probe_live(request, &selector).await {
                Ok(Some(probe)) if probe.visible => {
                    debug!(target, selector = %selector, "Matched live element by attribute");
                    return Ok(vec![Candidate::new(
                        descriptor_from_probe(target, &selector, &probe),
                        MatchStrategy::DirectAttribute,
                        0.9,
                    )]);
                }
                Ok(_) => {}
                Err(err) => debug!(selector = %selector, error = %err, "Attribute probe failed"),
            }
        }
        Ok(Vec::new())
    }

    fn strategy_type(&self) -> MatchStrategy {
        MatchStrategy::DirectAttribute
    }
}

fn descriptor_from_probe(target: &str, selector: &str, probe: &ElementProbe) -> ElementDescriptor {
    let element_type = match (probe.tag.as_str(), probe.input_type.as_deref()) {
        ("input", Some("radio")) => ElementType::Radio,
        ("input", Some("checkbox")) => ElementType::Checkbox,
        ("input", Some("submit")) | ("input", Some("button")) | ("button", _) => {
            ElementType::Button
        }
        ("select", _) => ElementType::Select,
        ("textarea", _) => ElementType::Textarea,
        ("a", _) => ElementType::Link,
        _ => ElementType::Input,
    };
    ElementDescriptor {
        display_key: target.to_string(),
        raw_text: if probe.text.is_empty() {
            target.to_string()
        } else {
            probe.text.clone()
        },
        element_type,
        primary_locator: selector.to_string(),
        fallback_locator: selector.to_string(),
        text_locator: String::new(),
        container_context: None,
        sibling_context: None,
        interaction_hints: vec!["direct_attribute".to_string()],
        attributes: ElementAttributes {
            tag: probe.tag.clone(),
            id: None,
            name: None,
            input_type: probe.input_type.clone(),
            value: probe.value.clone(),
        },
    }
}

/// Text match combined with context-hint agreement and locator specificity.
pub struct HierarchicalStrategy;

#[async_trait]
impl Strategy for HierarchicalStrategy {
    async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Vec<Candidate>, LocatorError> {
        let hints = request.normalized_hints();
        if hints.is_empty() {
            return Ok(Vec::new());
        }
        let target = normalize(request.target);
        Ok(request
            .index
            .iter()
            .filter_map(|d| {
                let quality = text_quality(&target, d);
                if quality <= 0.0 {
                    return None;
                }
                let score = 0.5 * quality
                    + 0.3 * context_score(&hints, d)
                    + 0.2 * locator_specificity(&d.primary_locator);
                Some(Candidate::new(d.clone(), MatchStrategy::Hierarchical, score))
            })
            .collect())
    }

    fn strategy_type(&self) -> MatchStrategy {
        MatchStrategy::Hierarchical
    }
}

/// Substring containment; toggles must also agree with their value attribute.
pub struct PartialStrategy;

#[async_trait]
impl Strategy for PartialStrategy {
    async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Vec<Candidate>, LocatorError> {
        let target = normalize(request.target);
        if target.is_empty() {
            return Ok(Vec::new());
        }
        Ok(request
            .index
            .iter()
            .filter_map(|d| {
                let score = [&d.display_key, &d.raw_text]
                    .iter()
                    .map(|field| containment_ratio(&target, &normalize(field)))
                    .fold(0.0, f64::max);
                if score < MIN_PARTIAL_RATIO {
                    return None;
                }
                if d.element_type.is_toggle() && !value_aligns(&target, &d.attributes) {
                    debug!(key = %d.display_key, "Rejecting toggle whose value does not match");
                    return None;
                }
                Some(Candidate::new(d.clone(), MatchStrategy::Partial, score))
            })
            .collect())
    }

    fn strategy_type(&self) -> MatchStrategy {
        MatchStrategy::Partial
    }
}

/// Token overlap over the union of both token sets.
pub struct WordOverlapStrategy;

#[async_trait]
impl Strategy for WordOverlapStrategy {
    async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Vec<Candidate>, LocatorError> {
        let target_tokens = tokenize(request.target);
        if target_tokens.is_empty() {
            return Ok(Vec::new());
        }
        let threshold = if target_tokens.len() <= SHORT_TEXT_TOKENS {
            SHORT_OVERLAP_THRESHOLD
        } else {
            OVERLAP_THRESHOLD
        };
        Ok(request
            .index
            .iter()
            .filter_map(|d| {
                let score = best_overlap(&target_tokens, d);
                (score > threshold)
                    .then(|| Candidate::new(d.clone(), MatchStrategy::WordOverlap, score))
            })
            .collect())
    }

    fn strategy_type(&self) -> MatchStrategy {
        MatchStrategy::WordOverlap
    }
}

/// Split on punctuation, whitespace, camelCase and letter/digit boundaries.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.insert(std::mem::take(&mut current).to_lowercase());
            }
            prev = None;
            continue;
        }
        let boundary = match prev {
            Some(p) => {
                (p.is_lowercase() && c.is_uppercase())
                    || (p.is_alphabetic() && c.is_numeric())
                    || (p.is_numeric() && c.is_alphabetic())
            }
            None => false,
        };
        if boundary && !current.is_empty() {
            tokens.insert(std::mem::take(&mut current).to_lowercase());
        }
        current.push(c);
        prev = Some(c);
    }
    if !current.is_empty() {
        tokens.insert(current.to_lowercase());
    }
    tokens
}

/// Jaccard ratio of two token sets.
pub fn overlap_ratio(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let common = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    common / union
}

pub(crate) fn best_overlap(target_tokens: &BTreeSet<String>, d: &ElementDescriptor) -> f64 {
    overlap_ratio(target_tokens, &tokenize(&d.raw_text))
        .max(overlap_ratio(target_tokens, &tokenize(&d.display_key)))
}

/// Length ratio when one string contains the other, else zero.
pub(crate) fn containment_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.contains(b) || b.contains(a) {
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        short.chars().count() as f64 / long.chars().count() as f64
    } else {
        0.0
    }
}

fn text_quality(target: &str, d: &ElementDescriptor) -> f64 {
    let raw = normalize(&d.raw_text);
    let key = normalize(&d.display_key);
    if raw == target || key == target {
        return 1.0;
    }
    let contained = containment_ratio(target, &raw).max(containment_ratio(target, &key));
    if contained >= MIN_PARTIAL_RATIO {
        return contained;
    }
    let overlap = overlap_ratio(&tokenize(target), &tokenize(&d.raw_text));
    if overlap >= 0.5 {
        overlap
    } else {
        0.0
    }
}

/// Fraction of hints that agree with the element's container, key or position.
fn context_score(hints: &[String], d: &ElementDescriptor) -> f64 {
    if hints.is_empty() {
        return 0.0;
    }
    let container = d.container_context.as_ref();
    // Heading text may be shorter than the hint; an id must contain every hint word.
    let text = container
        .and_then(|c| c.text.as_deref())
        .map(tokenize)
        .filter(|tokens| !tokens.is_empty());
    let id = container
        .and_then(|c| c.id.as_deref())
        .map(tokenize)
        .filter(|tokens| !tokens.is_empty());
    let position = d.sibling_context.map(|s| s.describe());
    let key = tokenize(&d.display_key);

    let matched = hints
        .iter()
        .filter(|hint| {
            let hint_tokens = tokenize(hint);
            if hint_tokens.is_empty() {
                return false;
            }
            text.as_ref().is_some_and(|text| {
                hint_tokens.is_subset(text) || text.is_subset(&hint_tokens)
            }) || id.as_ref().is_some_and(|id| hint_tokens.is_subset(id))
                || position.as_deref() == Some(hint.as_str())
                || hint_tokens.is_subset(&key)
        })
        .count();
    matched as f64 / hints.len() as f64
}

/// id > position-based > parent relationship > attribute > class-based.
pub fn locator_specificity(selector: &str) -> f64 {
    if selector.starts_with('#') || selector.starts_with("[id=") {
        return 1.0;
    }
    let structural = strip_quoted(selector);
    if structural.contains(":nth-") {
        0.8
    } else if structural.contains('>') || structural.trim().contains(' ') {
        0.6
    } else if structural.contains('[') {
        0.5
    } else if structural.contains('.') {
        0.4
    } else {
        0.2
    }
}

fn strip_quoted(selector: &str) -> String {
    let mut out = String::with_capacity(selector.len());
    let mut quote: Option<char> = None;
    for c in selector.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None => out.push(c),
        }
    }
    out
}

fn value_aligns(target: &str, attributes: &ElementAttributes) -> bool {
    match attributes.value.as_deref().map(normalize) {
        Some(value) if !value.is_empty() => target.contains(&value) || value.contains(target),
        _ => false,
    }
}
