//! Recorded → semantic workflow conversion
//!
//! Recorded steps identify elements by `cssSelector`/`xpath` and a
//! `semanticInfo` blob captured in the page. Conversion derives a
//! `target_text` plus container/position hints so replay can go through the
//! text resolver; the recorded selectors stay on the step as a last resort.

use crate::errors::FlowError;
use once_cell::sync::Lazy;
use regex::Regex;
use replay_core_types::{format_container_id, MAX_CONTAINER_LABEL_CHARS};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const WORKFLOW_ANALYSIS: &str = "Semantic version of recorded workflow. Uses visible text to \
identify elements instead of CSS selectors for improved reliability.";

/// Longest recorded text accepted as a target.
const MAX_TARGET_CHARS: usize = 100;
/// Longest container id turned into a contextual suffix.
const MAX_CONTEXT_ID_CHARS: usize = 30;
/// Longest identifier pulled out of a selector.
const MAX_SELECTOR_VALUE_CHARS: usize = 50;

const INTERACTIVE_TYPES: &[&str] = &["click", "input", "select_change", "key_press"];

static ID_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[id=["']([^"']+)["']\]"#).expect("valid id regex"));
static NAME_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[name=["']([^"']+)["']\]"#).expect("valid name regex"));
static VALUE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[value=["']([^"']+)["']\]"#).expect("valid value regex"));
static CLASS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([a-zA-Z][a-zA-Z0-9_-]*)").expect("valid class regex"));

/// Utility-class fragments that never name a button.
const GENERIC_CLASS_PARTS: &[&str] = &[
    "btn", "button", "flex", "inline", "items", "justify", "gap", "rounded", "text", "font",
    "ring", "transition", "colors", "bg", "primary", "foreground",
];

/// Convert a recorded workflow document to semantic targeting.
pub fn convert_workflow(mut workflow: Value) -> Result<Value, FlowError> {
    let doc = workflow
        .as_object_mut()
        .ok_or_else(|| FlowError::InvalidInputs("workflow must be a JSON object".to_string()))?;

    doc.insert(
        "workflow_analysis".to_string(),
        Value::String(WORKFLOW_ANALYSIS.to_string()),
    );
    if let Some(Value::String(name)) = doc.get_mut("name") {
        name.push_str(" (Semantic)");
    }

    if let Some(steps) = doc.get_mut("steps") {
        let steps = steps
            .as_array_mut()
            .ok_or_else(|| FlowError::InvalidInputs("'steps' must be an array".to_string()))?;
        for step in steps.iter_mut().filter_map(Value::as_object_mut) {
            convert_step(step);
        }
    }
    Ok(workflow)
}

/// `flow.json` → `flow.semantic.json`.
pub fn default_output_path(input: &Path) -> PathBuf {
    match input.extension().and_then(|e| e.to_str()) {
        Some("json") => input.with_extension("semantic.json"),
        _ => {
            let mut name = input.as_os_str().to_os_string();
            name.push(".semantic.json");
            PathBuf::from(name)
        }
    }
}

fn convert_step(step: &mut Map<String, Value>) {
    let step_type = str_field(step, "type").to_string();
    if !INTERACTIVE_TYPES.contains(&step_type.as_str()) {
        return;
    }
    let Some(target_text) = semantic_target_text(step) else {
        warn!(step_type = %step_type, "No semantic text for recorded step; keeping selector only");
        return;
    };

    let mut hints: Vec<(&str, String)> = Vec::new();
    if let Some(info) = step.get("semanticInfo").and_then(Value::as_object) {
        if let Some(container) = info.get("container_context").and_then(Value::as_object) {
            if let Some(hint) = container_hint(container, usize::MAX) {
                hints.push(("container_hint", hint));
            }
        }
        if let Some(sibling) = info.get("sibling_context").and_then(Value::as_object) {
            let position = sibling.get("position").and_then(Value::as_u64);
            let total = sibling.get("total").and_then(Value::as_u64);
            if let (Some(position), Some(total)) = (position, total) {
                if total > 1 {
                    hints.push(("position_hint", format!("item {} of {}", position + 1, total)));
                }
            }
        }
        let first_hint = info
            .get("interaction_hints")
            .and_then(Value::as_array)
            .and_then(|hints| hints.first())
            .and_then(Value::as_str);
        if let Some(kind) = first_hint {
            hints.push(("interaction_type", kind.to_string()));
        }
    }

    info!(step_type = %step_type, target = %target_text, "Converted step to semantic targeting");
    step.insert("target_text".to_string(), Value::String(target_text));
    for (key, value) in hints {
        step.insert(key.to_string(), Value::String(value));
    }
    if str_field(step, "description").is_empty() {
        let action = match step_type.as_str() {
            "click" => "Click",
            "input" => "Input",
            "select_change" => "Select",
            "key_press" => "Press key on",
            _ => "Interact with",
        };
        step.insert(
            "description".to_string(),
            Value::String(format!("{} element", action)),
        );
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).map(str::trim).unwrap_or("")
}

fn short(value: &str, max: usize) -> Option<String> {
    (!value.is_empty() && value.chars().count() < max).then(|| value.to_string())
}

/// Container text when short, else the Title-Cased id (no longer than `max_id`).
fn container_hint(container: &Map<String, Value>, max_id: usize) -> Option<String> {
    let text = str_field(container, "text");
    if let Some(text) = short(text, MAX_CONTAINER_LABEL_CHARS) {
        return Some(text);
    }
    let id = str_field(container, "id");
    short(id, max_id).map(|id| format_container_id(&id))
}

fn semantic_target_text(step: &Map<String, Value>) -> Option<String> {
    let recorded = str_field(step, "targetText");
    if !recorded.is_empty() {
        return Some(recorded.to_string());
    }

    if let Some(info) = step.get("semanticInfo").and_then(Value::as_object) {
        let base = ["labelText", "textContent", "name", "id"]
            .iter()
            .find_map(|field| short(str_field(info, field), MAX_TARGET_CHARS));
        if let Some(base) = base {
            let context = info
                .get("container_context")
                .and_then(Value::as_object)
                .and_then(|c| container_hint(c, MAX_CONTEXT_ID_CHARS));
            return Some(match context {
                Some(context) => format!("{} (in {})", base, context),
                None => base,
            });
        }
        let labelled = ["placeholder", "ariaLabel"]
            .iter()
            .find_map(|field| short(str_field(info, field), MAX_TARGET_CHARS));
        if labelled.is_some() {
            return labelled;
        }
    }

    if let Some(text) = short(str_field(step, "elementText"), MAX_TARGET_CHARS) {
        return Some(text);
    }

    let selector = str_field(step, "cssSelector");
    if selector.is_empty() {
        None
    } else {
        target_from_selector(selector)
    }
}

/// Id, then name, then a toggle's value, then a meaningful button class.
fn target_from_selector(selector: &str) -> Option<String> {
    let captured = |re: &Regex| {
        re.captures(selector)
            .and_then(|caps| short(&caps[1], MAX_SELECTOR_VALUE_CHARS))
    };
    if let Some(id) = captured(&ID_ATTR) {
        return Some(id);
    }
    if let Some((_, after_hash)) = selector.split_once('#') {
        let id = after_hash
            .split(|c| matches!(c, '.' | '[' | ':'))
            .next()
            .unwrap_or_default();
        if !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Some(id.to_string());
        }
    }
    if let Some(name) = captured(&NAME_ATTR) {
        return Some(name);
    }
    if selector.contains("radio") || selector.contains("checkbox") {
        if let Some(value) = captured(&VALUE_ATTR) {
            return Some(value);
        }
    }
    if selector.contains("button") && selector.matches('.').count() < 10 {
        return CLASS_NAME
            .captures_iter(selector)
            .map(|caps| caps[1].to_string())
            .find(|class| {
                let lower = class.to_lowercase();
                (3..20).contains(&class.len())
                    && !GENERIC_CLASS_PARTS.iter().any(|part| lower.contains(part))
            });
    }
    None
}
