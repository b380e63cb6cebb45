//! Run context, `{placeholder}` substitution and output storage

use crate::types::{ExecutionOutcome, WorkflowStep};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Variables accumulated over one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunContext {
    values: BTreeMap<String, Value>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Substitute `{name}` tokens in `template`.
    ///
    /// Strings are inserted as-is, other values as compact JSON. Unknown names
    /// are left untouched; `{{` and `}}` produce literal braces.
    pub fn render(&self, template: &str) -> String {
        if !template.contains('{') && !template.contains('}') {
            return template.to_string();
        }
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with("{{") || tail.starts_with("}}") {
                out.push_str(&tail[..1]);
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with('}') {
                out.push('}');
                rest = &tail[1..];
                continue;
            }
            match tail[1..].find('}') {
                Some(close) => {
                    let name = &tail[1..1 + close];
                    match self.lookup(name) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&tail[..close + 2]),
                    }
                    rest = &tail[close + 2..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() || name.contains('{') {
            return None;
        }
        self.values.get(name).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// A copy of `step` with every string field rendered.
    pub fn resolve_step(&self, step: &WorkflowStep) -> WorkflowStep {
        let mut resolved = step.clone();
        for field in resolved.strings_mut() {
            let rendered = self.render(field);
            if rendered != *field {
                *field = rendered;
            }
        }
        resolved
    }

    /// Store a step result under the step's declared `output` key, if any.
    pub fn store_output(&mut self, step: &WorkflowStep, outcome: &ExecutionOutcome) {
        let Some(key) = step.output() else {
            return;
        };
        let value = match &outcome.extracted {
            Some(payload) => payload.clone(),
            None => serde_json::from_str(&outcome.summary)
                .unwrap_or_else(|_| Value::String(outcome.summary.clone())),
        };
        debug!(key, "Storing step output");
        self.values.insert(key.to_string(), value);
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values.into_iter().collect()
    }
}

/// Names referenced by `{name}` tokens in `template`, in order of appearance.
///
/// Escaped braces are skipped the same way [`RunContext::render`] skips them.
pub fn placeholder_names(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            rest = &tail[2..];
            continue;
        }
        let Some(close) = tail[1..].find('}') else {
            break;
        };
        let name = tail[1..1 + close].trim();
        if !name.is_empty() && !name.contains('{') {
            names.push(name.to_string());
        }
        rest = &tail[close + 2..];
    }
    names
}

impl From<Map<String, Value>> for RunContext {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            values: map.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClickStep, ExtractStep, InputStep, StepTarget};
    use serde_json::json;

    fn context() -> RunContext {
        let mut ctx = RunContext::new();
        ctx.set("email", json!("ada@example.com"));
        ctx.set("count", json!(3));
        ctx.set("filters", json!({"size": "M"}));
        ctx
    }

    #[test]
    fn renders_known_tokens() {
        let ctx = context();
        assert_eq!(ctx.render("Send to {email}"), "Send to ada@example.com");
        assert_eq!(ctx.render("{count} items"), "3 items");
        assert_eq!(ctx.render("{filters}"), "{\"size\":\"M\"}");
    }

    #[test]
    fn leaves_unknown_tokens_and_unescapes_braces() {
        let ctx = context();
        assert_eq!(ctx.render("Hi {name}!"), "Hi {name}!");
        assert_eq!(ctx.render("{{email}} is {email}"), "{email} is ada@example.com");
        assert_eq!(ctx.render("open { brace"), "open { brace");
        assert_eq!(ctx.render("a } b"), "a } b");
        assert_eq!(ctx.render("no tokens"), "no tokens");
    }

    #[test]
    fn lists_placeholder_names() {
        assert_eq!(
            placeholder_names("{first} and { second } but {{not}}"),
            vec!["first", "second"]
        );
        assert!(placeholder_names("plain {").is_empty());
    }

    #[test]
    fn resolves_every_step_field() {
        let ctx = context();
        let step = WorkflowStep::Input(InputStep {
            target: StepTarget::text("Email").with_container("{missing}"),
            value: "{email}".into(),
            output: None,
        });
        match ctx.resolve_step(&step) {
            WorkflowStep::Input(s) => {
                assert_eq!(s.value, "ada@example.com");
                assert_eq!(s.target.container_hint.as_deref(), Some("{missing}"));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    fn outcome(summary: &str, extracted: Option<Value>) -> ExecutionOutcome {
        ExecutionOutcome {
            step_index: 0,
            step_type: "extract".into(),
            description: String::new(),
            summary: summary.into(),
            extracted,
            locator: None,
            attempts: 1,
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn output_storage_prefers_payload_then_json_then_text() {
        let mut ctx = RunContext::new();
        let extract = WorkflowStep::Extract(ExtractStep {
            goal: "price".into(),
            description: None,
            output: Some("price".into()),
        });
        ctx.store_output(&extract, &outcome("ignored", Some(json!({"price": 12}))));
        assert_eq!(ctx.get("price"), Some(&json!({"price": 12})));

        let click = WorkflowStep::Click(ClickStep {
            target: StepTarget::text("Go"),
            output: Some("clicked".into()),
        });
        ctx.store_output(&click, &outcome("{\"ok\": true}", None));
        assert_eq!(ctx.get("clicked"), Some(&json!({"ok": true})));
        ctx.store_output(&click, &outcome("Clicked 'Go'", None));
        assert_eq!(ctx.get("clicked"), Some(&json!("Clicked 'Go'")));
    }
}
