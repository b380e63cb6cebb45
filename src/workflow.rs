//! Workflow files and run inputs as the CLI reads them

use action_flow::{WorkflowDefinition, WorkflowStep};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum WorkflowFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid workflow: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid input '{0}': expected key=value")]
    InputPair(String),

    #[error("inputs file {0} must hold a JSON object")]
    InputsNotObject(PathBuf),
}

/// Read any JSON document.
pub async fn read_json(path: &Path) -> Result<Value, WorkflowFileError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| WorkflowFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&raw).map_err(|source| WorkflowFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn load_workflow(path: &Path) -> Result<WorkflowDefinition, WorkflowFileError> {
    let value = read_json(path).await?;
    serde_json::from_value(value).map_err(|source| WorkflowFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge an optional JSON inputs file with `key=value` pairs; pairs win.
pub async fn collect_inputs(
    pairs: &[String],
    inputs_file: Option<&Path>,
) -> Result<Map<String, Value>, WorkflowFileError> {
    let mut inputs = match inputs_file {
        Some(path) => match read_json(path).await? {
            Value::Object(map) => map,
            _ => return Err(WorkflowFileError::InputsNotObject(path.to_path_buf())),
        },
        None => Map::new(),
    };
    inputs.extend(parse_input_pairs(pairs)?);
    Ok(inputs)
}

/// `key=value` pairs as string inputs; typing happens during schema validation.
pub fn parse_input_pairs(pairs: &[String]) -> Result<Map<String, Value>, WorkflowFileError> {
    let mut inputs = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| WorkflowFileError::InputPair(pair.clone()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(WorkflowFileError::InputPair(pair.clone()));
        }
        inputs.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(inputs)
}

fn is_placeholder_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Structural problems that would make a run fail regardless of the page.
pub fn structure_problems(workflow: &WorkflowDefinition) -> Vec<String> {
    let mut problems = Vec::new();
    if workflow.steps.is_empty() {
        problems.push("workflow has no steps".to_string());
    }

    let mut known: Vec<String> = workflow
        .input_schema
        .iter()
        .map(|field| field.name.clone())
        .collect();
    for (index, step) in workflow.steps.iter().enumerate() {
        if let Some(target) = step.target() {
            if !target.has_target() {
                problems.push(format!(
                    "step {} ({}) has neither target_text nor a selector",
                    index,
                    step.kind()
                ));
            }
        }
        if matches!(step, WorkflowStep::Unknown) {
            problems.push(format!("step {} has an unknown type", index));
        }
        for name in step.placeholders() {
            if is_placeholder_name(&name) && !known.contains(&name) {
                problems.push(format!(
                    "step {} references '{{{}}}', which is neither a declared input nor an earlier output",
                    index, name
                ));
            }
        }
        if let Some(output) = step.output() {
            known.push(output.to_string());
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow(value: Value) -> WorkflowDefinition {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_well_formed_workflow() {
        let wf = workflow(json!({
            "name": "Login",
            "input_schema": [{"name": "email", "type": "string", "required": true}],
            "steps": [
                {"type": "navigation", "url": "https://app.test/login"},
                {"type": "input", "target_text": "Email", "value": "{email}"},
                {"type": "extract", "goal": "greeting", "output": "greeting"},
                {"type": "input", "target_text": "Note", "value": "{greeting} {{literal}}"}
            ]
        }));
        assert!(structure_problems(&wf).is_empty(), "{:?}", structure_problems(&wf));
    }

    #[test]
    fn reports_missing_targets_and_placeholders() {
        let wf = workflow(json!({
            "name": "Broken",
            "steps": [
                {"type": "click"},
                {"type": "input", "target_text": "Email", "value": "{email}"},
                {"type": "teleport"}
            ]
        }));
        let problems = structure_problems(&wf);
        assert_eq!(problems.len(), 3, "{:?}", problems);
        assert!(problems[0].contains("step 0"));
        assert!(problems[1].contains("'{email}'"));
        assert!(problems[2].contains("unknown type"));
    }

    #[test]
    fn empty_workflow_is_a_problem() {
        let wf = workflow(json!({"name": "Empty", "steps": []}));
        assert_eq!(structure_problems(&wf), vec!["workflow has no steps"]);
    }

    #[test]
    fn parses_input_pairs() {
        let inputs =
            parse_input_pairs(&["email=a@b.test".to_string(), "query=x=y".to_string()]).unwrap();
        assert_eq!(inputs["email"], "a@b.test");
        assert_eq!(inputs["query"], "x=y");
        assert!(parse_input_pairs(&["novalue".to_string()]).is_err());
        assert!(parse_input_pairs(&["=v".to_string()]).is_err());
    }

    #[tokio::test]
    async fn pairs_override_inputs_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inputs.json");
        std::fs::write(&path, r#"{"email": "file@b.test", "count": 2}"#).unwrap();
        let inputs = collect_inputs(&["email=cli@b.test".to_string()], Some(&path))
            .await
            .unwrap();
        assert_eq!(inputs["email"], "cli@b.test");
        assert_eq!(inputs["count"], 2);

        std::fs::write(&path, "[1]").unwrap();
        assert!(matches!(
            collect_inputs(&[], Some(&path)).await,
            Err(WorkflowFileError::InputsNotObject(_))
        ));
    }
}
