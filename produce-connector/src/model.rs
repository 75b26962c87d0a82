//! Content model definitions.
//!
//! | Model    | Kind     | Fields                                         |
//! |----------|----------|------------------------------------------------|
//! | `User`   | document | `name: String!`, `posts: [Post]`               |
//! | `Post`   | document | `title: String!`, `blocks: [Blocks]!`          |
//! | `Blocks` | object   | `title: String`, `content: String`             |
//!
//! Documents have identity and are stored by the model store; objects are
//! embedded in a document and live and die with it.

use serde::Serialize;
use serde_json::Value;

use crate::error::ConnectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Document,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum FieldType {
    String,
    /// Weak reference to a document model, by id.
    Reference(&'static str),
    /// Embedded object model.
    Object(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub ty: FieldType,
    pub list: bool,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDefinition {
    pub name: &'static str,
    pub kind: ModelKind,
    pub fields: Vec<FieldDefinition>,
}

fn field(name: &'static str, ty: FieldType, list: bool, required: bool) -> FieldDefinition {
    FieldDefinition {
        name,
        ty,
        list,
        required,
    }
}

/// Every model the connector declares, documents first.
pub fn definitions() -> Vec<ModelDefinition> {
    vec![
        ModelDefinition {
            name: "User",
            kind: ModelKind::Document,
            fields: vec![
                field("name", FieldType::String, false, true),
                field("posts", FieldType::Reference("Post"), true, false),
            ],
        },
        ModelDefinition {
            name: "Post",
            kind: ModelKind::Document,
            fields: vec![
                field("title", FieldType::String, false, true),
                field("blocks", FieldType::Object("Blocks"), true, true),
            ],
        },
        ModelDefinition {
            name: "Blocks",
            kind: ModelKind::Object,
            fields: vec![
                field("title", FieldType::String, false, false),
                field("content", FieldType::String, false, false),
            ],
        },
    ]
}

/// Look up a definition by unprefixed name.
pub fn find(name: &str) -> Option<ModelDefinition> {
    definitions().into_iter().find(|d| d.name == name)
}

/// Public type name under the connector's prefix: `Example` + `User`.
pub fn type_name(prefix: &str, model: &str) -> String {
    format!("{prefix}{model}")
}

impl ModelDefinition {
    /// Check a serialized record against this definition. Embedded objects are
    /// checked recursively; references are not resolved.
    pub fn check(&self, record: &Value) -> Result<(), String> {
        let Some(obj) = record.as_object() else {
            return Err("record must be an object".to_string());
        };
        for f in &self.fields {
            let value = obj.get(f.name).filter(|v| !v.is_null());
            let Some(value) = value else {
                if f.required {
                    return Err(format!("missing required field '{}'", f.name));
                }
                continue;
            };
            if f.list {
                let Some(items) = value.as_array() else {
                    return Err(format!("field '{}' must be a list", f.name));
                };
                for (i, item) in items.iter().enumerate() {
                    check_value(&f.ty, item).map_err(|e| format!("{}[{i}]: {e}", f.name))?;
                }
            } else {
                check_value(&f.ty, value).map_err(|e| format!("{}: {e}", f.name))?;
            }
        }
        Ok(())
    }
}

fn check_value(ty: &FieldType, value: &Value) -> Result<(), String> {
    match ty {
        FieldType::String if value.is_string() => Ok(()),
        FieldType::String => Err("expected string".to_string()),
        FieldType::Reference(target) => {
            let id_ok = value.get("id").is_some_and(Value::is_string);
            let type_ok = value
                .get("__typename")
                .and_then(Value::as_str)
                .map_or(true, |t| t == *target);
            if id_ok && type_ok {
                Ok(())
            } else {
                Err(format!("expected reference to {target}"))
            }
        }
        FieldType::Object(name) => {
            let def = find(name).ok_or_else(|| format!("unknown object model {name}"))?;
            def.check(value)
        }
    }
}

/// Check `record` against the named document model.
pub(crate) fn check_document(model: &str, id: &str, record: &Value) -> Result<(), ConnectorError> {
    let def = find(model).ok_or_else(|| ConnectorError::UnknownModel(model.to_string()))?;
    def.check(record).map_err(|reason| ConnectorError::InvalidRecord {
        model: model.to_string(),
        id: id.to_string(),
        reason,
    })
}
