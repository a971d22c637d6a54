//! Typed view of the JSON schemas attached to parameter declarations.
//!
//! Coercion dispatches on [`SchemaKind`] with exhaustive matches instead of
//! comparing `type`/`format` strings at every step.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// String formats that change how a string is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Plain,
    Byte,
    Binary,
    Date,
    DateTime,
}

impl StringFormat {
    fn from_format(format: Option<&str>) -> Self {
        match format {
            Some("byte") => StringFormat::Byte,
            Some("binary") => StringFormat::Binary,
            Some("date") => StringFormat::Date,
            Some("date-time") => StringFormat::DateTime,
            _ => StringFormat::Plain,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Integer,
    Number,
    Boolean,
    String(StringFormat),
    Array(Box<Schema>),
    Object(IndexMap<String, Schema>),
    /// Swagger 2.0 `type: file` form parameter
    File,
    /// No usable `type`: strings stay strings, JSON input is kept structurally
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: SchemaKind,
    pub title: Option<String>,
    pub default: Option<Value>,
}

impl Schema {
    pub fn plain() -> Self {
        Schema::of(SchemaKind::String(StringFormat::Plain))
    }

    /// Schema for undeclared properties and values without a `type`.
    pub fn untyped() -> Self {
        Schema::of(SchemaKind::Any)
    }

    pub fn of(kind: SchemaKind) -> Self {
        Schema {
            kind,
            title: None,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Compile a raw JSON schema (already `$ref`-expanded).
    ///
    /// A missing or unrecognised `type` yields [`SchemaKind::Any`]. OpenAPI 3.1
    /// `type: [T, "null"]` arrays use the first non-null entry. `allOf`
    /// members are folded into one schema first.
    pub fn from_json(value: &Value) -> Self {
        if let Some(merged) = merge_all_of(value) {
            return Schema::from_json(&merged);
        }
        let title = value
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);
        let default = value.get("default").cloned();

        let ty = match value.get("type") {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null"),
            _ => None,
        };
        let ty = ty.or_else(|| {
            if value.get("properties").is_some() {
                Some("object")
            } else if value.get("items").is_some() {
                Some("array")
            } else {
                None
            }
        });

        let kind = match ty {
            Some("integer") => SchemaKind::Integer,
            Some("number") => SchemaKind::Number,
            Some("boolean") => SchemaKind::Boolean,
            Some("file") => SchemaKind::File,
            Some("array") => {
                let items = value
                    .get("items")
                    .map(Schema::from_json)
                    .unwrap_or_else(Schema::untyped);
                SchemaKind::Array(Box::new(items))
            }
            Some("object") => {
                let props = value
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(k, v)| (k.clone(), Schema::from_json(v)))
                            .collect()
                    })
                    .unwrap_or_default();
                SchemaKind::Object(props)
            }
            Some("string") => SchemaKind::String(StringFormat::from_format(
                value.get("format").and_then(Value::as_str),
            )),
            _ => SchemaKind::Any,
        };

        Schema {
            kind,
            title,
            default,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, SchemaKind::Array(_) | SchemaKind::Object(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, SchemaKind::String(_))
    }
}

/// Fold `allOf` members into a single schema. Properties are unioned; any
/// other keyword comes from the schema itself, else the first member that
/// declares it.
fn merge_all_of(value: &Value) -> Option<Value> {
    let obj = value.as_object()?;
    let members = obj.get("allOf")?.as_array()?;

    let mut merged: Map<String, Value> = obj
        .iter()
        .filter(|(key, _)| key.as_str() != "allOf")
        .map(|(key, v)| (key.clone(), v.clone()))
        .collect();
    let mut props = merged
        .remove("properties")
        .and_then(|p| match p {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    for member in members {
        let member = merge_all_of(member).unwrap_or_else(|| member.clone());
        let Value::Object(member) = member else {
            continue;
        };
        for (key, v) in member {
            match (key.as_str(), v) {
                ("properties", Value::Object(more)) => {
                    for (name, schema) in more {
                        props.entry(name).or_insert(schema);
                    }
                }
                (_, v) => {
                    merged.entry(key).or_insert(v);
                }
            }
        }
    }
    if !props.is_empty() {
        merged.insert("properties".to_string(), Value::Object(props));
    }
    Some(Value::Object(merged))
}
