//! Placeholder values synthesized from response schemas.

use serde_json::{json, Map, Value};

const MAX_DEPTH: usize = 8;

/// A representative value for `schema`.
///
/// `example`, then `default`, then the first `enum` entry win over anything
/// synthesized from `type`/`format`.
pub fn sample_value(schema: &Value) -> Value {
    sample_at(schema, 0)
}

fn sample_at(schema: &Value, depth: usize) -> Value {
    let Some(obj) = schema.as_object() else {
        return Value::Null;
    };
    if let Some(v) = obj.get("example").or_else(|| obj.get("default")) {
        return v.clone();
    }
    if let Some(first) = obj.get("enum").and_then(Value::as_array).and_then(|e| e.first()) {
        return first.clone();
    }
    if depth >= MAX_DEPTH {
        return Value::Null;
    }

    if let Some(all_of) = obj.get("allOf").and_then(Value::as_array) {
        let mut merged = Map::new();
        for part in all_of {
            if let Value::Object(props) = sample_at(part, depth + 1) {
                merged.extend(props);
            }
        }
        return Value::Object(merged);
    }
    if let Some(first) = obj
        .get("oneOf")
        .or_else(|| obj.get("anyOf"))
        .and_then(Value::as_array)
        .and_then(|v| v.first())
    {
        return sample_at(first, depth + 1);
    }

    let ty = match obj.get("type") {
        Some(Value::String(t)) => t.as_str(),
        // OAS 3.1 type arrays: first non-null entry
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .unwrap_or("null"),
        _ if obj.contains_key("properties") => "object",
        _ if obj.contains_key("items") => "array",
        _ => return Value::Null,
    };

    match ty {
        "string" => sample_string(obj.get("format").and_then(Value::as_str)),
        "integer" => json!(42),
        "number" => json!(1.5),
        "boolean" => json!(true),
        "array" => match obj.get("items") {
            Some(items) => json!([sample_at(items, depth + 1)]),
            None => json!([]),
        },
        "object" => {
            let props = obj
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(k, v)| (k.clone(), sample_at(v, depth + 1)))
                        .collect::<Map<_, _>>()
                })
                .unwrap_or_default();
            Value::Object(props)
        }
        _ => Value::Null,
    }
}

fn sample_string(format: Option<&str>) -> Value {
    let s = match format {
        Some("date") => "2024-01-01",
        Some("date-time") => "2024-01-01T00:00:00Z",
        Some("byte") => "ZXhhbXBsZQ==",
        Some("email") => "user@example.com",
        Some("uuid") => "00000000-0000-0000-0000-000000000000",
        Some("uri") => "https://example.com",
        _ => "example",
    };
    Value::String(s.to_string())
}
