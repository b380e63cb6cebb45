//! Core types for workflow replay

use crate::context::RunContext;
use crate::errors::FailureReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Workflow definition - an ordered list of recorded steps
///
/// Immutable once loaded; runs only ever mutate their own [`RunContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow name
    pub name: String,

    /// Workflow description
    #[serde(default)]
    pub description: String,

    /// Version identifier
    #[serde(default = "default_version")]
    pub version: String,

    /// Steps, executed strictly in order
    pub steps: Vec<WorkflowStep>,

    /// Declared inputs
    #[serde(default, alias = "inputSchema")]
    pub input_schema: Vec<InputField>,

    /// Free-form notes left by whoever produced the workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_analysis: Option<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl WorkflowDefinition {
    /// Create a new workflow
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: default_version(),
            steps,
            input_schema: Vec::new(),
            workflow_analysis: None,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare an input
    pub fn with_input(mut self, field: InputField) -> Self {
        self.input_schema.push(field);
        self
    }
}

/// Declared workflow input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: InputType,

    /// `None` means optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Informational format hint for string inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl InputField {
    pub fn new(name: impl Into<String>, kind: InputType) -> Self {
        Self {
            name: name.into(),
            kind,
            required: None,
            format: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    Number,
    #[serde(alias = "boolean")]
    Bool,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::String => "string",
            InputType::Number => "number",
            InputType::Bool => "bool",
        }
    }
}

/// How an interactive step names its element.
///
/// Resolution order: `target_text`, then `description`, then the legacy
/// selectors recorded alongside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(
        default,
        rename = "cssSelector",
        alias = "legacySelector",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_hint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_hint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_type: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl StepTarget {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            target_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_container(mut self, hint: impl Into<String>) -> Self {
        self.container_hint = Some(hint.into());
        self
    }

    pub fn with_position(mut self, hint: impl Into<String>) -> Self {
        self.position_hint = Some(hint.into());
        self
    }

    pub fn with_legacy_selector(mut self, selector: impl Into<String>) -> Self {
        self.legacy_selector = Some(selector.into());
        self
    }

    /// Text handed to the resolver: target text, else description.
    pub fn semantic_text(&self) -> Option<&str> {
        non_empty(&self.target_text).or_else(|| non_empty(&self.description))
    }

    /// Recorded selectors, CSS first, as engine locators.
    pub fn legacy_locators(&self) -> Vec<String> {
        let mut locators = Vec::new();
        if let Some(css) = non_empty(&self.legacy_selector) {
            locators.push(css.to_string());
        }
        if let Some(xpath) = non_empty(&self.xpath) {
            if xpath.starts_with(action_primitives::locator::XPATH_PREFIX) {
                locators.push(xpath.to_string());
            } else {
                locators.push(format!("{}{}", action_primitives::locator::XPATH_PREFIX, xpath));
            }
        }
        locators
    }

    pub fn has_target(&self) -> bool {
        self.semantic_text().is_some() || !self.legacy_locators().is_empty()
    }

    /// Container and position hints, for the resolver.
    pub fn hints(&self) -> Vec<String> {
        [non_empty(&self.container_hint), non_empty(&self.position_hint)]
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect()
    }

    /// Human label for logs and reports.
    pub fn identifier(&self) -> Option<&str> {
        self.semantic_text()
            .or_else(|| non_empty(&self.legacy_selector))
            .or_else(|| non_empty(&self.xpath))
    }

    fn strings_mut(&mut self) -> Vec<&mut String> {
        [
            &mut self.target_text,
            &mut self.description,
            &mut self.legacy_selector,
            &mut self.xpath,
            &mut self.container_hint,
            &mut self.position_hint,
            &mut self.interaction_type,
        ]
        .into_iter()
        .filter_map(Option::as_mut)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigateStep {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickStep {
    #[serde(flatten)]
    pub target: StepTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputStep {
    #[serde(flatten)]
    pub target: StepTarget,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStep {
    #[serde(flatten)]
    pub target: StepTarget,
    #[serde(rename = "selectedText", alias = "selectedOptionText")]
    pub selected_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPressStep {
    #[serde(flatten)]
    pub target: StepTarget,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollStep {
    #[serde(default, rename = "scrollX")]
    pub dx: i64,
    #[serde(default, rename = "scrollY")]
    pub dy: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractStep {
    #[serde(alias = "extractionGoal")]
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Agent-driven step; recognised so workflows load, never executed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    #[serde(default)]
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// One recorded step, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowStep {
    #[serde(rename = "navigation")]
    Navigate(NavigateStep),
    Click(ClickStep),
    Input(InputStep),
    #[serde(rename = "select_change")]
    Select(SelectStep),
    KeyPress(KeyPressStep),
    Scroll(ScrollStep),
    #[serde(alias = "extract_page_content")]
    Extract(ExtractStep),
    Agent(AgentStep),
    /// Any tag this engine does not know
    #[serde(other)]
    Unknown,
}

impl WorkflowStep {
    /// The step's `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowStep::Navigate(_) => "navigation",
            WorkflowStep::Click(_) => "click",
            WorkflowStep::Input(_) => "input",
            WorkflowStep::Select(_) => "select_change",
            WorkflowStep::KeyPress(_) => "key_press",
            WorkflowStep::Scroll(_) => "scroll",
            WorkflowStep::Extract(_) => "extract",
            WorkflowStep::Agent(_) => "agent",
            WorkflowStep::Unknown => "unknown",
        }
    }

    pub fn target(&self) -> Option<&StepTarget> {
        match self {
            WorkflowStep::Click(s) => Some(&s.target),
            WorkflowStep::Input(s) => Some(&s.target),
            WorkflowStep::Select(s) => Some(&s.target),
            WorkflowStep::KeyPress(s) => Some(&s.target),
            _ => None,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.target().is_some()
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, WorkflowStep::Agent(_) | WorkflowStep::Unknown)
    }

    pub fn description(&self) -> Option<&str> {
        let description = match self {
            WorkflowStep::Navigate(s) => &s.description,
            WorkflowStep::Scroll(s) => &s.description,
            WorkflowStep::Extract(s) => &s.description,
            WorkflowStep::Agent(s) => &s.description,
            WorkflowStep::Click(ClickStep { target, .. })
            | WorkflowStep::Input(InputStep { target, .. })
            | WorkflowStep::Select(SelectStep { target, .. })
            | WorkflowStep::KeyPress(KeyPressStep { target, .. }) => &target.description,
            WorkflowStep::Unknown => return None,
        };
        non_empty(description)
    }

    /// Context key the step's result is stored under
    pub fn output(&self) -> Option<&str> {
        let output = match self {
            WorkflowStep::Navigate(s) => &s.output,
            WorkflowStep::Click(s) => &s.output,
            WorkflowStep::Input(s) => &s.output,
            WorkflowStep::Select(s) => &s.output,
            WorkflowStep::KeyPress(s) => &s.output,
            WorkflowStep::Scroll(s) => &s.output,
            WorkflowStep::Extract(s) => &s.output,
            WorkflowStep::Agent(s) => &s.output,
            WorkflowStep::Unknown => return None,
        };
        non_empty(output)
    }

    /// Description, else target, else the type tag.
    pub fn label(&self) -> String {
        if let Some(description) = self.description() {
            return description.to_string();
        }
        match self {
            WorkflowStep::Navigate(s) => format!("navigate to {}", s.url),
            WorkflowStep::Scroll(s) => format!("scroll by ({}, {})", s.dx, s.dy),
            WorkflowStep::Extract(s) => format!("extract: {}", s.goal),
            WorkflowStep::Agent(s) if !s.task.is_empty() => format!("agent: {}", s.task),
            other => match other.target().and_then(StepTarget::identifier) {
                Some(id) => format!("{} '{}'", other.kind(), id),
                None => other.kind().to_string(),
            },
        }
    }

    /// Distinct placeholder names used by any of the step's string fields.
    pub fn placeholders(&self) -> Vec<String> {
        let mut step = self.clone();
        let mut names: Vec<String> = Vec::new();
        for field in step.strings_mut() {
            for name in crate::context::placeholder_names(field) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Every string field a `{placeholder}` may appear in.
    pub(crate) fn strings_mut(&mut self) -> Vec<&mut String> {
        let mut fields: Vec<&mut String> = Vec::new();
        match self {
            WorkflowStep::Navigate(s) => {
                fields.push(&mut s.url);
                fields.extend(s.description.as_mut());
            }
            WorkflowStep::Click(s) => fields.extend(s.target.strings_mut()),
            WorkflowStep::Input(s) => {
                fields.extend(s.target.strings_mut());
                fields.push(&mut s.value);
            }
            WorkflowStep::Select(s) => {
                fields.extend(s.target.strings_mut());
                fields.push(&mut s.selected_text);
            }
            WorkflowStep::KeyPress(s) => {
                fields.extend(s.target.strings_mut());
                fields.push(&mut s.key);
            }
            WorkflowStep::Scroll(s) => fields.extend(s.description.as_mut()),
            WorkflowStep::Extract(s) => {
                fields.push(&mut s.goal);
                fields.extend(s.description.as_mut());
            }
            WorkflowStep::Agent(s) => {
                fields.push(&mut s.task);
                fields.extend(s.description.as_mut());
            }
            WorkflowStep::Unknown => {}
        }
        fields
    }
}

/// Non-fatal conditions noticed while executing a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionWarning {
    /// Several elements matched; the first was used
    AmbiguousElement {
        target: String,
        matches: usize,
        chosen: String,
    },
    /// Structured extraction failed or is unavailable; a raw excerpt was returned
    DegradedExtraction { reason: String },
}

/// Result of one successful step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub step_index: usize,
    pub step_type: String,
    pub description: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    /// Attempts used, including the first
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExecutionWarning>,
    pub duration_ms: u64,
}

/// How a run ended
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Cancellation was observed before this step started
    Cancelled { at_step: usize },
    Failed(Box<FailureReport>),
}

/// Everything a run produced, including partial results on failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub step_results: Vec<ExecutionOutcome>,
    pub final_context: RunContext,
    pub status: RunStatus,
}

impl RunOutput {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    pub fn failure(&self) -> Option<&FailureReport> {
        match &self.status {
            RunStatus::Failed(report) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_recorded_step_shapes() {
        let workflow: WorkflowDefinition = serde_json::from_value(json!({
            "name": "Checkout",
            "description": "Buy the thing",
            "version": "1.0",
            "input_schema": [{"name": "email", "type": "string", "required": true}],
            "steps": [
                {"type": "navigation", "url": "https://shop.test/"},
                {"type": "click", "target_text": "Submit", "container_hint": "Billing Information"},
                {"type": "input", "target_text": "Email", "value": "{email}"},
                {"type": "select_change", "target_text": "Country", "selectedText": "France"},
                {"type": "key_press", "cssSelector": "#q", "key": "Enter"},
                {"type": "scroll", "scrollX": 0, "scrollY": 400},
                {"type": "extract_page_content", "goal": "order number", "output": "order"},
                {"type": "agent", "task": "do something clever"},
                {"type": "hover", "target_text": "Menu"}
            ]
        }))
        .unwrap();

        let kinds: Vec<&str> = workflow.steps.iter().map(WorkflowStep::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "navigation", "click", "input", "select_change", "key_press", "scroll",
                "extract", "agent", "unknown"
            ]
        );
        assert_eq!(
            workflow.steps[1].target().unwrap().hints(),
            vec!["Billing Information".to_string()]
        );
        assert_eq!(
            workflow.steps[4].target().unwrap().legacy_locators(),
            vec!["#q".to_string()]
        );
        assert_eq!(workflow.steps[6].output(), Some("order"));
        assert!(workflow.input_schema[0].is_required());
        assert!(!workflow.steps[7].is_supported());
    }

    #[test]
    fn extraction_goal_alias() {
        let step: WorkflowStep =
            serde_json::from_value(json!({"type": "extract", "extractionGoal": "prices"})).unwrap();
        match step {
            WorkflowStep::Extract(s) => assert_eq!(s.goal, "prices"),
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn labels_fall_back_to_target() {
        let step = WorkflowStep::Click(ClickStep {
            target: StepTarget::text("Save"),
            output: None,
        });
        assert_eq!(step.label(), "click 'Save'");
        let xpath = StepTarget {
            xpath: Some("//button[1]".into()),
            ..StepTarget::default()
        };
        assert_eq!(xpath.legacy_locators(), vec!["xpath=//button[1]".to_string()]);
    }
}
