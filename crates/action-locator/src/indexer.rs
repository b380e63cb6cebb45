//! Semantic indexer: page scan → disambiguated display keys
//!
//! The indexer is read-only with respect to the page. It turns the raw scan
//! into [`ElementDescriptor`]s, computes three locators per element, attaches
//! container and sibling context, then assigns each element a display key that
//! is unique within the snapshot.

use crate::errors::LocatorError;
use action_primitives::{locator, BrowserBackend, RawElement};
use once_cell::sync::Lazy;
use regex::Regex;
use replay_core_types::{
    ContainerContext, ElementAttributes, ElementDescriptor, ElementType, SemanticIndex,
    SiblingContext,
};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// At most this many classes are folded into a class-based locator.
const MAX_LOCATOR_CLASSES: usize = 3;

static SUBMIT_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(submit|save|send|sign ?in|log ?in|register|sign ?up|continue|next|finish|confirm|apply|place order)\b")
        .expect("valid submit regex")
});

/// Generated or state classes that change between renders.
static UNSTABLE_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(css-|sc-|jsx-|emotion-|_)|\d{3,}|^(active|hover|focus|focused|selected|disabled|hidden|open|show|visible|is-.*|has-.*)$")
        .expect("valid class regex")
});

/// Builds [`SemanticIndex`] snapshots from the live page.
#[derive(Debug, Clone)]
pub struct SemanticIndexer {
    idle_timeout: Duration,
}

impl Default for SemanticIndexer {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl SemanticIndexer {
    pub fn new(idle_timeout: Duration) -> Self {
        Self { idle_timeout }
    }

    /// Wait for the page to settle, scan it, and build a fresh snapshot.
    ///
    /// A page without interactive elements yields an empty index.
    pub async fn build(&self, backend: &dyn BrowserBackend) -> Result<SemanticIndex, LocatorError> {
        let started = Instant::now();
        if let Err(err) = backend.wait_for_network_idle(self.idle_timeout).await {
            warn!(error = %err, "Page did not go idle before indexing; scanning anyway");
        }
        let url = backend.current_url().await?;
        let raw = backend.scan_interactive().await?;
        let scanned = raw.len();
        let index = index_elements(url, raw)?;
        info!(
            elements = index.len(),
            scanned,
            elapsed_ms = started.elapsed().as_millis() as u64,
            url = %index.url(),
            "Semantic index rebuilt"
        );
        Ok(index)
    }
}

/// Pure half of the indexer: raw scan → snapshot.
pub fn index_elements(
    url: impl Into<String>,
    raw: Vec<RawElement>,
) -> Result<SemanticIndex, LocatorError> {
    let mut drafts: Vec<ElementDescriptor> = raw.iter().map(describe).collect();
    assign_siblings(&mut drafts);
    assign_display_keys(&mut drafts);
    Ok(SemanticIndex::new(url, drafts)?)
}

fn clean(text: Option<&str>) -> Option<String> {
    let text = text?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

pub fn classify(raw: &RawElement) -> ElementType {
    match raw.tag.as_str() {
        "input" => match raw.input_type.as_deref().unwrap_or("text") {
            "radio" => ElementType::Radio,
            "checkbox" => ElementType::Checkbox,
            "submit" | "button" | "reset" | "image" => ElementType::Button,
            _ => ElementType::Input,
        },
        "button" => ElementType::Button,
        "select" => ElementType::Select,
        "textarea" => ElementType::Textarea,
        "a" => ElementType::Link,
        _ => match raw.role.as_deref() {
            Some("link") => ElementType::Link,
            Some("textbox") => ElementType::Input,
            Some("combobox") | Some("listbox") => ElementType::Select,
            Some("radio") => ElementType::Radio,
            Some("checkbox") => ElementType::Checkbox,
            _ => ElementType::Button,
        },
    }
}

/// Label, content, placeholder, title, accessible name, value, name, id.
fn best_text(raw: &RawElement) -> Option<String> {
    [
        raw.label.as_deref(),
        raw.text.as_deref(),
        raw.placeholder.as_deref(),
        raw.title.as_deref(),
        raw.aria_label.as_deref(),
        raw.value.as_deref(),
        raw.name.as_deref(),
        raw.id.as_deref(),
    ]
    .into_iter()
    .find_map(clean)
}

fn stable_classes(class_name: Option<&str>) -> Vec<&str> {
    class_name
        .unwrap_or_default()
        .split_whitespace()
        .filter(|c| locator::is_css_ident(c) && !UNSTABLE_CLASS.is_match(c))
        .take(MAX_LOCATOR_CLASSES)
        .collect()
}

fn primary_locator(raw: &RawElement, element_type: ElementType) -> String {
    if let Some(id) = clean(raw.id.as_deref()) {
        return locator::css_id(&id);
    }
    let mut selector = raw.tag.clone();
    let name = clean(raw.name.as_deref());
    if let Some(name) = &name {
        selector.push_str(&locator::css_attr("name", name));
    }
    if let Some(kind) = raw.input_type.as_deref() {
        selector.push_str(&locator::css_attr("type", kind));
    }
    if element_type.is_toggle() {
        if let Some(value) = raw.value.as_deref() {
            selector.push_str(&locator::css_attr("value", value));
        }
    }
    if name.is_none() {
        for class in stable_classes(raw.class_name.as_deref()) {
            selector.push('.');
            selector.push_str(class);
        }
    }
    if selector == raw.tag {
        if let Some(role) = raw.role.as_deref() {
            selector.push_str(&locator::css_attr("role", role));
        }
    }
    selector
}

fn fallback_locator(raw: &RawElement, element_type: ElementType) -> String {
    let toggle_value = || {
        if element_type.is_toggle() {
            raw.value
                .as_deref()
                .map(|v| locator::css_attr("value", v))
                .unwrap_or_default()
        } else {
            String::new()
        }
    };
    if let Some(name) = clean(raw.name.as_deref()) {
        return format!("{}{}{}", raw.tag, locator::css_attr("name", &name), toggle_value());
    }
    if let Some(kind) = raw.input_type.as_deref() {
        return format!("{}{}{}", raw.tag, locator::css_attr("type", kind), toggle_value());
    }
    if let Some(role) = raw.role.as_deref() {
        return locator::css_attr("role", role);
    }
    raw.tag.clone()
}

fn text_locator(raw: &RawElement) -> String {
    if let Some(text) = clean(raw.text.as_deref()) {
        return locator::text_contains_xpath(&raw.tag, &text);
    }
    if let Some(placeholder) = clean(raw.placeholder.as_deref()) {
        return locator::attr_xpath(&raw.tag, "placeholder", &placeholder);
    }
    if let Some(value) = clean(raw.value.as_deref()) {
        return locator::attr_xpath(&raw.tag, "value", &value);
    }
    if let Some(label) = clean(raw.aria_label.as_deref()) {
        return locator::attr_xpath(&raw.tag, "aria-label", &label);
    }
    String::new()
}

fn interaction_hints(
    raw: &RawElement,
    element_type: ElementType,
    text: &str,
    container: Option<&ContainerContext>,
) -> Vec<String> {
    let mut hints = Vec::new();
    let in_form = container.map(|c| c.kind == "form").unwrap_or(false);
    let submit_type = raw.input_type.as_deref() == Some("submit")
        || (raw.tag == "button" && raw.input_type.is_none() && in_form);
    if element_type == ElementType::Button && (submit_type || (in_form && SUBMIT_TEXT.is_match(text))) {
        hints.push("form_submit");
    }
    if container.map(|c| c.kind == "row").unwrap_or(false) {
        hints.push("table_action");
    }
    match element_type {
        ElementType::Link => hints.push("navigation"),
        ElementType::Radio | ElementType::Checkbox => hints.push("toggle"),
        ElementType::Input | ElementType::Textarea => hints.push("text_entry"),
        ElementType::Select => hints.push("dropdown"),
        ElementType::Button => {}
    }
    hints.into_iter().map(str::to_string).collect()
}

fn describe(raw: &RawElement) -> ElementDescriptor {
    let element_type = classify(raw);
    let raw_text = best_text(raw)
        .unwrap_or_else(|| element_type.placeholder_text(raw.input_type.as_deref()));
    let container = raw.container.as_ref().map(|c| ContainerContext {
        kind: c.kind.clone(),
        text: clean(c.text.as_deref()),
        id: clean(c.id.as_deref()),
    });
    let hints = interaction_hints(raw, element_type, &raw_text, container.as_ref());
    ElementDescriptor {
        display_key: raw_text.clone(),
        primary_locator: primary_locator(raw, element_type),
        fallback_locator: fallback_locator(raw, element_type),
        text_locator: text_locator(raw),
        raw_text,
        element_type,
        container_context: container,
        sibling_context: None,
        interaction_hints: hints,
        attributes: ElementAttributes {
            tag: raw.tag.clone(),
            id: clean(raw.id.as_deref()),
            name: clean(raw.name.as_deref()),
            input_type: raw.input_type.clone(),
            value: raw.value.clone(),
        },
    }
}

fn text_group(descriptor: &ElementDescriptor) -> String {
    descriptor.raw_text.to_lowercase()
}

/// Number duplicates of the same raw text in page order.
fn assign_siblings(drafts: &mut [ElementDescriptor]) {
    let mut totals: HashMap<String, usize> = HashMap::new();
    for draft in drafts.iter() {
        *totals.entry(text_group(draft)).or_default() += 1;
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    for draft in drafts.iter_mut() {
        let group = text_group(draft);
        let total = totals.get(&group).copied().unwrap_or(1);
        if total > 1 {
            let position = seen.entry(group).or_default();
            *position += 1;
            draft.sibling_context = Some(SiblingContext {
                position: *position,
                total,
            });
        }
    }
}

/// Raw text, then container label, then sibling position, then a numeric suffix.
fn assign_display_keys(drafts: &mut [ElementDescriptor]) {
    let mut text_counts: HashMap<String, usize> = HashMap::new();
    let mut container_counts: HashMap<(String, String), usize> = HashMap::new();
    for draft in drafts.iter() {
        *text_counts.entry(text_group(draft)).or_default() += 1;
        if let Some(label) = draft.container_context.as_ref().and_then(|c| c.label()) {
            *container_counts
                .entry((text_group(draft), label.to_lowercase()))
                .or_default() += 1;
        }
    }

    let mut used: HashSet<String> = HashSet::new();
    for draft in drafts.iter_mut() {
        let group = text_group(draft);
        let raw = draft.raw_text.clone();
        let mut choices: Vec<String> = Vec::with_capacity(3);

        if text_counts.get(&group).copied().unwrap_or(0) <= 1 {
            choices.push(raw.clone());
        }
        if let Some(label) = draft.container_context.as_ref().and_then(|c| c.label()) {
            let shared = container_counts
                .get(&(group.clone(), label.to_lowercase()))
                .copied()
                .unwrap_or(0);
            if shared <= 1 {
                choices.push(format!("{} (in {})", raw, label));
            }
        }
        if let Some(sibling) = draft.sibling_context {
            choices.push(format!("{} ({})", raw, sibling.describe()));
        }

        let key = choices
            .into_iter()
            .find(|candidate| !used.contains(&candidate.to_lowercase()))
            .unwrap_or_else(|| {
                let mut n = 2;
                loop {
                    let candidate = format!("{} ({})", raw, n);
                    if !used.contains(&candidate.to_lowercase()) {
                        break candidate;
                    }
                    n += 1;
                }
            });
        if key != raw {
            debug!(raw = %raw, key = %key, "Disambiguated display key");
        }
        used.insert(key.to_lowercase());
        draft.display_key = key;
    }
}
