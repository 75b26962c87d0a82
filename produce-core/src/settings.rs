//! Team settings schema.
//!
//! Reads are lenient (the caller decides what to do with a [`SchemaError`]);
//! writes go through [`TeamSettings::parse`] first and [`merge_shallow`]
//! second, which is `{ ...existing, ...input }` and nothing deeper.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Validated per-team configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSettings {
    pub example_string: String,
    pub example_secret: String,
    pub example_boolean: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_number: Option<f64>,
}

/// One failed check, addressed by field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

/// Every issue found while validating a settings value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaError {
    pub issues: Vec<SchemaIssue>,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|i| format!("{}: {}", i.path, i.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for SchemaError {}

impl TeamSettings {
    /// Validate an arbitrary JSON value against the schema, collecting every
    /// issue rather than stopping at the first.
    pub fn parse(value: &Value) -> Result<Self, SchemaError> {
        let Some(obj) = value.as_object() else {
            return Err(SchemaError {
                issues: vec![issue("", format!("expected object, received {}", kind(value)))],
            });
        };

        let mut issues = Vec::new();
        let example_string = required_string(obj, "exampleString", &mut issues);
        let example_secret = required_string(obj, "exampleSecret", &mut issues);

        let example_boolean = match obj.get("exampleBoolean") {
            Some(Value::Bool(b)) => Some(*b),
            None | Some(Value::Null) => {
                issues.push(issue("exampleBoolean", "required".into()));
                None
            }
            Some(other) => {
                issues.push(issue(
                    "exampleBoolean",
                    format!("expected boolean, received {}", kind(other)),
                ));
                None
            }
        };

        let example_number = match obj.get("exampleNumber") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n.as_f64(),
            Some(other) => {
                issues.push(issue(
                    "exampleNumber",
                    format!("expected number, received {}", kind(other)),
                ));
                None
            }
        };

        match (example_string, example_secret, example_boolean) {
            (Some(example_string), Some(example_secret), Some(example_boolean))
                if issues.is_empty() =>
            {
                Ok(Self {
                    example_string,
                    example_secret,
                    example_boolean,
                    example_number,
                })
            }
            _ => Err(SchemaError { issues }),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Overlay `input` onto `existing`, key by key. Nested objects are replaced,
/// not merged. A non-object `existing` is treated as empty.
pub fn merge_shallow(existing: &Value, input: &TeamSettings) -> Value {
    let mut merged: Map<String, Value> = existing.as_object().cloned().unwrap_or_default();
    if let Value::Object(overlay) = input.to_value() {
        for (key, value) in overlay {
            merged.insert(key, value);
        }
    }
    Value::Object(merged)
}

fn required_string(
    obj: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<SchemaIssue>,
) -> Option<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            issues.push(issue(field, "must contain at least 1 character".into()));
            None
        }
        None | Some(Value::Null) => {
            issues.push(issue(field, "required".into()));
            None
        }
        Some(other) => {
            issues.push(issue(
                field,
                format!("expected string, received {}", kind(other)),
            ));
            None
        }
    }
}

fn issue(path: &str, message: String) -> SchemaIssue {
    SchemaIssue {
        path: path.to_string(),
        message,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "exampleString": "hello",
            "exampleSecret": "s3cret",
            "exampleBoolean": true,
        })
    }

    #[test]
    fn parses_valid_settings() {
        let settings = TeamSettings::parse(&valid()).expect("valid");
        assert_eq!(settings.example_string, "hello");
        assert!(settings.example_boolean);
        assert_eq!(settings.example_number, None);
    }

    #[test]
    fn collects_every_issue() {
        let err = TeamSettings::parse(&json!({
            "exampleString": "",
            "exampleBoolean": "yes",
            "exampleNumber": "7",
        }))
        .unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["exampleString", "exampleSecret", "exampleBoolean", "exampleNumber"]
        );
        assert!(err.to_string().contains("at least 1 character"));
    }

    #[test]
    fn rejects_non_object() {
        let err = TeamSettings::parse(&json!([1, 2])).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(err.issues[0].message.contains("array"));
    }

    #[test]
    fn merge_overrides_input_keys_and_keeps_the_rest() {
        let existing = json!({
            "exampleString": "old",
            "exampleSecret": "old-secret",
            "exampleBoolean": false,
            "exampleNumber": 3,
            "legacy": { "nested": true },
        });
        let input = TeamSettings::parse(&json!({
            "exampleString": "new",
            "exampleSecret": "new-secret",
            "exampleBoolean": true,
        }))
        .expect("valid");

        let merged = merge_shallow(&existing, &input);
        assert_eq!(merged["exampleString"], "new");
        assert_eq!(merged["exampleSecret"], "new-secret");
        assert_eq!(merged["exampleBoolean"], true);
        assert_eq!(merged["exampleNumber"], 3);
        assert_eq!(merged["legacy"], json!({ "nested": true }));
    }

    #[test]
    fn merge_over_non_object_yields_input() {
        let input = TeamSettings::parse(&valid()).expect("valid");
        assert_eq!(merge_shallow(&json!("garbage"), &input), valid());
    }
}
