//! Plan validation against the closed action grammar.
//!
//! The validator is the system's only defense against model format drift:
//! raw text goes in, a typed [`ActionPlan`] or a diagnostic-rich error comes
//! out. It is pure and deterministic, with no network or execution side
//! effects, and the wire format is the one place untyped JSON is touched.
//!
//! Failed validation keeps the offending raw text in the error so operators
//! can see exactly what the model produced.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{Action, ActionPlan, GRAMMAR_KINDS};

/// Errors produced while turning raw model output into an [`ActionPlan`].
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("plan is not valid JSON: {source}; raw output: {raw_text}")]
    MalformedJson {
        raw_text: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("plan violates the action schema: {detail}; raw output: {raw_text}")]
    SchemaViolation { raw_text: String, detail: String },
    #[error("action {action_index} is missing required field `{field}`")]
    MissingField {
        field: &'static str,
        action_index: usize,
    },
}

impl ValidationError {
    fn schema(raw_text: &str, detail: impl Into<String>) -> Self {
        ValidationError::SchemaViolation {
            raw_text: raw_text.to_string(),
            detail: detail.into(),
        }
    }
}

/// Parse and validate raw model output into an ordered action plan.
///
/// Plan length is not checked against any budget here; budget enforcement is
/// the executor's job at run time.
pub fn validate_plan(raw_text: &str) -> Result<ActionPlan, ValidationError> {
    let parsed: Value =
        serde_json::from_str(raw_text).map_err(|source| ValidationError::MalformedJson {
            raw_text: raw_text.to_string(),
            source,
        })?;

    let elements = parsed
        .as_array()
        .ok_or_else(|| ValidationError::schema(raw_text, "top-level value is not an array"))?;

    if elements.is_empty() {
        return Err(ValidationError::schema(raw_text, "plan contains no actions"));
    }

    let mut actions = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let record = element.as_object().ok_or_else(|| {
            ValidationError::schema(raw_text, format!("element {index} is not an object"))
        })?;
        actions.push(action_from_record(raw_text, record, index)?);
    }

    ActionPlan::new(actions)
        .ok_or_else(|| ValidationError::schema(raw_text, "plan contains no actions"))
}

fn action_from_record(
    raw_text: &str,
    record: &Map<String, Value>,
    index: usize,
) -> Result<Action, ValidationError> {
    let kind = record
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ValidationError::schema(raw_text, format!("element {index} has no `action` key"))
        })?;

    match kind {
        "navigate" => Ok(Action::Navigate {
            url: required_string(record, "url", index, true)?,
        }),
        "click" => Ok(Action::Click {
            selector: required_string(record, "selector", index, true)?,
        }),
        "input" => Ok(Action::Input {
            selector: required_string(record, "selector", index, false)?,
            text: required_string(record, "text", index, false)?,
        }),
        "wait" => Ok(Action::Wait {
            seconds: required_seconds(record, index)?,
        }),
        "scroll" => Ok(Action::Scroll {
            pixels: required_pixels(record, index)?,
        }),
        other => Err(ValidationError::schema(
            raw_text,
            format!(
                "element {index} has unsupported action kind '{other}' (allowed: {})",
                GRAMMAR_KINDS.join(", ")
            ),
        )),
    }
}

/// Look up a required string field. Single-payload kinds also accept the
/// `value` key, which model output commonly uses.
fn required_string(
    record: &Map<String, Value>,
    field: &'static str,
    index: usize,
    accept_value_key: bool,
) -> Result<String, ValidationError> {
    record
        .get(field)
        .or_else(|| {
            if accept_value_key {
                record.get("value")
            } else {
                None
            }
        })
        .and_then(Value::as_str)
        .map(|value| value.to_string())
        .ok_or(ValidationError::MissingField {
            field,
            action_index: index,
        })
}

fn required_seconds(record: &Map<String, Value>, index: usize) -> Result<f64, ValidationError> {
    record
        .get("seconds")
        .or_else(|| record.get("value"))
        .and_then(Value::as_f64)
        .filter(|seconds| *seconds >= 0.0)
        .ok_or(ValidationError::MissingField {
            field: "seconds",
            action_index: index,
        })
}

fn required_pixels(record: &Map<String, Value>, index: usize) -> Result<i64, ValidationError> {
    record
        .get("pixels")
        .or_else(|| record.get("value"))
        .and_then(Value::as_i64)
        .ok_or(ValidationError::MissingField {
            field: "pixels",
            action_index: index,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_plan_round_trips_structurally() {
        let raw = r##"[
            {"action": "navigate", "url": "https://shop.example/search?q=laptops"},
            {"action": "wait", "seconds": 3},
            {"action": "click", "selector": "#sort-price-asc"},
            {"action": "input", "selector": "#q", "text": "laptops"},
            {"action": "scroll", "pixels": -200}
        ]"##;

        let plan = validate_plan(raw).expect("valid plan");
        assert_eq!(plan.len(), 5);
        assert_eq!(
            plan.actions()[0],
            Action::Navigate {
                url: "https://shop.example/search?q=laptops".into()
            }
        );
        assert_eq!(plan.actions()[1], Action::Wait { seconds: 3.0 });
        assert_eq!(plan.actions()[4], Action::Scroll { pixels: -200 });
    }

    #[test]
    fn value_key_is_accepted_for_single_payload_kinds() {
        let raw = r##"[
            {"action": "navigate", "value": "https://shop.example/search?q=laptops"},
            {"action": "wait", "value": 3},
            {"action": "click", "selector": "#sort-price-asc"}
        ]"##;

        let plan = validate_plan(raw).expect("valid plan");
        assert_eq!(plan.len(), 3);
        assert_eq!(
            plan.actions()[0],
            Action::Navigate {
                url: "https://shop.example/search?q=laptops".into()
            }
        );
        assert_eq!(plan.actions()[1], Action::Wait { seconds: 3.0 });
    }

    #[test]
    fn non_json_output_is_malformed_and_keeps_raw_text() {
        let raw = "Sure, here are the steps: ...";
        let err = validate_plan(raw).expect_err("not JSON");
        match err {
            ValidationError::MalformedJson { ref raw_text, .. } => {
                assert_eq!(raw_text, raw);
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert!(err.to_string().contains("Sure, here are the steps: ..."));
    }

    #[test]
    fn non_array_json_is_a_schema_violation() {
        let err = validate_plan(r#"{"action": "wait", "seconds": 1}"#).expect_err("not an array");
        assert!(matches!(err, ValidationError::SchemaViolation { .. }));
    }

    #[test]
    fn empty_plan_is_a_schema_violation() {
        let err = validate_plan("[]").expect_err("empty plan");
        match err {
            ValidationError::SchemaViolation { detail, .. } => {
                assert!(detail.contains("no actions"));
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected_not_ignored() {
        let err = validate_plan(r##"[{"action": "hover", "selector": "#menu"}]"##)
            .expect_err("unknown kind");
        match err {
            ValidationError::SchemaViolation { detail, .. } => {
                assert!(detail.contains("hover"));
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn missing_field_names_field_and_index() {
        let raw = r##"[
            {"action": "navigate", "url": "https://example.com"},
            {"action": "input", "selector": "#q"}
        ]"##;

        let err = validate_plan(raw).expect_err("missing text");
        match err {
            ValidationError::MissingField {
                field,
                action_index,
            } => {
                assert_eq!(field, "text");
                assert_eq!(action_index, 1);
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn negative_wait_is_rejected() {
        let err = validate_plan(r#"[{"action": "wait", "seconds": -1}]"#).expect_err("negative");
        assert!(matches!(err, ValidationError::MissingField { field: "seconds", .. }));
    }

    #[test]
    fn parsing_is_idempotent() {
        let raw = r#"[
            {"action": "navigate", "url": "https://example.com"},
            {"action": "wait", "seconds": 2.5}
        ]"#;

        let first = validate_plan(raw).expect("first parse");
        let second = validate_plan(raw).expect("second parse");
        assert_eq!(first, second);
    }
}
