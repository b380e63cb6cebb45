//! Input schema validation

use crate::errors::FlowError;
use crate::types::{InputField, InputType};
use serde_json::{Map, Number, Value};
use tracing::debug;

const TRUTHY: &[&str] = &["true", "1", "on", "yes", "checked"];
const FALSY: &[&str] = &["false", "0", "off", "no", "unchecked", ""];

/// `Some(true)` for truthy tokens, `Some(false)` for falsy ones.
pub fn parse_truthy(token: &str) -> Option<bool> {
    let token = token.trim().to_ascii_lowercase();
    if TRUTHY.contains(&token.as_str()) {
        Some(true)
    } else if FALSY.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Desired checkbox state for an input value; anything not truthy means off.
pub fn wants_checked(value: &str) -> bool {
    parse_truthy(value).unwrap_or(false)
}

fn coerce_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(int) = s.parse::<i64>() {
                return Some(Value::Number(int.into()));
            }
            s.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        }
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::String(s) if !s.trim().is_empty() => parse_truthy(s).map(Value::Bool),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        _ => None,
    }
}

/// Check `inputs` against `schema`, normalising numbers and booleans.
///
/// Inputs not named by the schema are passed through unchanged.
pub fn validate_inputs(
    schema: &[InputField],
    mut inputs: Map<String, Value>,
) -> Result<Map<String, Value>, FlowError> {
    let mut problems = Vec::new();
    for field in schema {
        let present = inputs.get(&field.name).filter(|v| !v.is_null()).cloned();
        let Some(value) = present else {
            if field.is_required() {
                problems.push(format!("missing required input '{}'", field.name));
            }
            continue;
        };
        let coerced = match field.kind {
            InputType::String => value.is_string().then(|| value.clone()),
            InputType::Number => coerce_number(&value),
            InputType::Bool => coerce_bool(&value),
        };
        match coerced {
            Some(normalised) => {
                inputs.insert(field.name.clone(), normalised);
            }
            None => problems.push(format!(
                "input '{}' must be a {} (got {})",
                field.name,
                field.kind.as_str(),
                value
            )),
        }
    }

    if problems.is_empty() {
        debug!(inputs = inputs.len(), "Workflow inputs validated");
        Ok(inputs)
    } else {
        Err(FlowError::InvalidInputs(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Vec<InputField> {
        vec![
            InputField::new("email", InputType::String).required(),
            InputField::new("quantity", InputType::Number),
            InputField::new("gift", InputType::Bool),
        ]
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn normalises_numbers_and_bools() {
        let validated = validate_inputs(
            &schema(),
            map(json!({"email": "a@b.c", "quantity": "3", "gift": "yes", "extra": 1})),
        )
        .unwrap();
        assert_eq!(validated["quantity"], json!(3));
        assert_eq!(validated["gift"], json!(true));
        assert_eq!(validated["extra"], json!(1));

        let validated =
            validate_inputs(&schema(), map(json!({"email": "a@b.c", "quantity": "2.5"}))).unwrap();
        assert_eq!(validated["quantity"], json!(2.5));
    }

    #[test]
    fn collects_every_problem() {
        let err = validate_inputs(&schema(), map(json!({"quantity": "lots", "gift": "maybe"})))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("missing required input 'email'"));
        assert!(message.contains("'quantity' must be a number"));
        assert!(message.contains("'gift' must be a bool"));
    }

    #[test]
    fn strings_are_not_coerced() {
        let err = validate_inputs(&schema(), map(json!({"email": 42}))).unwrap_err();
        assert!(matches!(err, FlowError::InvalidInputs(_)));
    }

    #[test]
    fn truthy_tokens() {
        for token in ["true", "1", "on", "yes", "checked", " YES "] {
            assert!(wants_checked(token), "{token}");
        }
        for token in ["false", "0", "off", "no", "nope"] {
            assert!(!wants_checked(token), "{token}");
        }
    }
}
