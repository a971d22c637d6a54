//! Style decomposers: rebuild arrays and objects from their serialized form.
//!
//! Every OpenAPI style (`simple`, `form`, `deepObject`, `spaceDelimited`,
//! `pipeDelimited`) only differs in how a *string* is split into elements or
//! key/value pairs. That split is the [`StyleDecomposer`] trait; the recursion
//! over schemas, defaults and path labels is shared in [`decompose`].
//!
//! Input that is already structured (repeated query keys, bracket notation,
//! JSON bodies) is never re-split: elements and properties recurse directly.

use super::coerce::coerce;
use super::context::{resolve_default, ParseContext, Working};
use super::error::ParseError;
use super::schema::{Schema, SchemaKind};
use super::value::{ParamValue, RawValue};
use crate::spec::ParameterStyle;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// How one style splits serialized strings.
///
/// `Err` carries the message suffix for the resulting [`ParseError`].
pub trait StyleDecomposer {
    fn name(&self) -> &'static str;

    fn split_array(&self, raw: &str) -> Result<Vec<RawValue>, &'static str>;

    fn split_object(&self, raw: &str) -> Result<Vec<(String, RawValue)>, &'static str>;
}

/// `simple`: comma separated, `k=v` pairs when exploded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleStyle {
    pub explode: bool,
}

/// `form`: comma separated when not exploded; exploded arrays come from
/// repeated keys and exploded objects from `k=v&k=v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormStyle {
    pub explode: bool,
}

/// `deepObject`: the query parser already built the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeepObjectStyle;

/// `spaceDelimited`, `pipeDelimited` and Swagger's `tsv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedStyle {
    pub delimiter: char,
}

/// Parameters described through `content` and request bodies: strings are
/// parsed as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonContent;

impl StyleDecomposer for SimpleStyle {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn split_array(&self, raw: &str) -> Result<Vec<RawValue>, &'static str> {
        Ok(split_segments(raw, ','))
    }

    fn split_object(&self, raw: &str) -> Result<Vec<(String, RawValue)>, &'static str> {
        if self.explode {
            Ok(raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|pair| match pair.split_once('=') {
                    Some((k, v)) => (k.to_string(), RawValue::text(v)),
                    None => (pair.to_string(), RawValue::text("")),
                })
                .collect())
        } else {
            Ok(alternating_pairs(raw, ','))
        }
    }
}

impl StyleDecomposer for FormStyle {
    fn name(&self) -> &'static str {
        "form"
    }

    fn split_array(&self, raw: &str) -> Result<Vec<RawValue>, &'static str> {
        if self.explode {
            // Two or more occurrences already arrived as an array.
            Ok(vec![RawValue::text(raw)])
        } else {
            Ok(split_segments(raw, ','))
        }
    }

    fn split_object(&self, raw: &str) -> Result<Vec<(String, RawValue)>, &'static str> {
        if self.explode {
            Ok(url::form_urlencoded::parse(raw.as_bytes())
                .map(|(k, v)| (k.into_owned(), RawValue::text(v.into_owned())))
                .collect())
        } else {
            Ok(alternating_pairs(raw, ','))
        }
    }
}

impl StyleDecomposer for DeepObjectStyle {
    fn name(&self) -> &'static str {
        "deepObject"
    }

    fn split_array(&self, raw: &str) -> Result<Vec<RawValue>, &'static str> {
        Ok(vec![RawValue::text(raw)])
    }

    fn split_object(&self, _raw: &str) -> Result<Vec<(String, RawValue)>, &'static str> {
        Err("is not a valid object")
    }
}

impl StyleDecomposer for DelimitedStyle {
    fn name(&self) -> &'static str {
        match self.delimiter {
            ' ' => "spaceDelimited",
            '|' => "pipeDelimited",
            '\t' => "tabDelimited",
            _ => "delimited",
        }
    }

    fn split_array(&self, raw: &str) -> Result<Vec<RawValue>, &'static str> {
        Ok(split_segments(raw, self.delimiter))
    }

    fn split_object(&self, raw: &str) -> Result<Vec<(String, RawValue)>, &'static str> {
        Ok(alternating_pairs(raw, self.delimiter))
    }
}

impl StyleDecomposer for JsonContent {
    fn name(&self) -> &'static str {
        "json"
    }

    fn split_array(&self, raw: &str) -> Result<Vec<RawValue>, &'static str> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => Ok(items.into_iter().map(RawValue::Json).collect()),
            Ok(_) => Err("is not a valid array"),
            Err(_) => Err("is not valid JSON"),
        }
    }

    fn split_object(&self, raw: &str) -> Result<Vec<(String, RawValue)>, &'static str> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(props)) => Ok(props
                .into_iter()
                .map(|(k, v)| (k, RawValue::Json(v)))
                .collect()),
            Ok(_) => Err("is not a valid object"),
            Err(_) => Err("is not valid JSON"),
        }
    }
}

/// Decomposer for a declared style and explode flag.
pub fn decomposer_for(style: ParameterStyle, explode: bool) -> Box<dyn StyleDecomposer> {
    match style {
        ParameterStyle::Simple => Box::new(SimpleStyle { explode }),
        ParameterStyle::Form => Box::new(FormStyle { explode }),
        ParameterStyle::DeepObject => Box::new(DeepObjectStyle),
        ParameterStyle::SpaceDelimited => Box::new(DelimitedStyle { delimiter: ' ' }),
        ParameterStyle::PipeDelimited => Box::new(DelimitedStyle { delimiter: '|' }),
        ParameterStyle::TabDelimited => Box::new(DelimitedStyle { delimiter: '\t' }),
    }
}

/// Parse the context's value against `schema`, splitting strings with `style`.
///
/// Non-composite schemas go straight to [`coerce`].
pub fn decompose<S: StyleDecomposer + ?Sized>(
    style: &S,
    schema: &Schema,
    ctx: &ParseContext<'_>,
) -> Result<Option<ParamValue>, ParseError> {
    if !schema.is_composite() {
        return coerce(schema, ctx);
    }

    let (working, status) = resolve_default(schema, ctx);
    let ctx = ParseContext {
        status,
        ..ctx.clone()
    };
    let raw = match &working {
        Working::Absent => return Ok(None),
        Working::Supplied(raw) => *raw,
        Working::Default(raw) => raw,
    };

    match &schema.kind {
        SchemaKind::Array(items) => decompose_array(style, schema, items, &ctx, raw).map(Some),
        SchemaKind::Object(props) => decompose_object(style, schema, props, &ctx, raw).map(Some),
        _ => coerce(schema, &ctx),
    }
}

fn decompose_array<S: StyleDecomposer + ?Sized>(
    style: &S,
    schema: &Schema,
    items: &Schema,
    ctx: &ParseContext<'_>,
    raw: &RawValue,
) -> Result<ParamValue, ParseError> {
    let elements: Vec<RawValue> = match raw {
        RawValue::Json(Value::Array(values)) => values.iter().cloned().map(RawValue::Json).collect(),
        RawValue::Json(Value::String(s)) => style
            .split_array(s)
            .map_err(|suffix| ctx.error(schema, s, suffix))?,
        RawValue::Json(Value::Object(props)) => indexed_elements(props)
            .ok_or_else(|| ctx.error(schema, &raw.to_string(), "is not a valid array"))?,
        other => vec![other.clone()],
    };

    let mut out = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let child = ctx.child_index(index, Some(element));
        if let Some(value) = decompose(style, items, &child)? {
            out.push(value);
        }
    }
    Ok(ParamValue::Array(out))
}

fn decompose_object<S: StyleDecomposer + ?Sized>(
    style: &S,
    schema: &Schema,
    props: &IndexMap<String, Schema>,
    ctx: &ParseContext<'_>,
    raw: &RawValue,
) -> Result<ParamValue, ParseError> {
    let entries: Vec<(String, RawValue)> = match raw {
        RawValue::Json(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| (k.clone(), RawValue::Json(v.clone())))
            .collect(),
        RawValue::Json(Value::String(s)) => style
            .split_object(s)
            .map_err(|suffix| ctx.error(schema, s, suffix))?,
        other => return Err(ctx.error(schema, &other.to_string(), "is not a valid object")),
    };

    let untyped = Schema::untyped();
    let mut out = IndexMap::with_capacity(entries.len());
    for (key, value) in &entries {
        let prop_schema = props.get(key).unwrap_or(&untyped);
        let child = ctx.child_key(key, Some(value));
        if let Some(parsed) = decompose(style, prop_schema, &child)? {
            out.insert(key.clone(), parsed);
        }
    }

    // Declared properties that were not sent still get their defaults.
    for (key, prop_schema) in props {
        if out.contains_key(key) || prop_schema.default.is_none() {
            continue;
        }
        let child = ctx.child_key(key, None);
        if let Some(parsed) = decompose(style, prop_schema, &child)? {
            out.insert(key.clone(), parsed);
        }
    }

    Ok(ParamValue::Object(out))
}

/// `{"0": a, "1": b}` from bracket notation with numeric indices.
fn indexed_elements(props: &serde_json::Map<String, Value>) -> Option<Vec<RawValue>> {
    let mut indexed = props
        .iter()
        .map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
        .collect::<Option<Vec<_>>>()?;
    indexed.sort_by_key(|(i, _)| *i);
    Some(
        indexed
            .into_iter()
            .map(|(_, v)| RawValue::Json(v.clone()))
            .collect(),
    )
}

fn split_segments(raw: &str, delimiter: char) -> Vec<RawValue> {
    raw.split(delimiter)
        .filter(|s| !s.is_empty())
        .map(RawValue::text)
        .collect()
}

/// `k1,v1,k2,v2` pairing. A trailing key without a value is dropped.
fn alternating_pairs(raw: &str, delimiter: char) -> Vec<(String, RawValue)> {
    let parts: Vec<&str> = raw.split(delimiter).collect();
    if parts.len() % 2 == 1 {
        debug!(
            raw = %raw,
            dangling_key = parts.last().copied().unwrap_or_default(),
            "Dropping key without value"
        );
    }
    parts
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), RawValue::text(pair[1])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::schema::StringFormat;
    use serde_json::json;

    fn tags_schema() -> Schema {
        Schema::from_json(&json!({"type": "array", "items": {"type": "string"}}))
    }

    fn address_schema() -> Schema {
        Schema::from_json(&json!({
            "type": "object",
            "properties": {
                "City": {"type": "string"},
                "State": {"type": "string"},
                "ZipCode": {"type": "integer"}
            }
        }))
    }

    fn run<S: StyleDecomposer>(style: &S, schema: &Schema, raw: RawValue) -> Result<Option<ParamValue>, ParseError> {
        let ctx = ParseContext::new(Some(&raw), "Address");
        decompose(style, schema, &ctx)
    }

    fn strings(values: &[&str]) -> ParamValue {
        ParamValue::Array(values.iter().map(|s| ParamValue::from(*s)).collect())
    }

    #[test]
    fn test_simple_array_and_exploded_form_agree() {
        let simple = run(&SimpleStyle { explode: false }, &tags_schema(), "a,b,c".into()).unwrap();
        let form = run(
            &FormStyle { explode: true },
            &tags_schema(),
            RawValue::Json(json!(["a", "b", "c"])),
        )
        .unwrap();
        assert_eq!(simple, Some(strings(&["a", "b", "c"])));
        assert_eq!(simple, form);
    }

    #[test]
    fn test_form_exploded_scalar_is_wrapped() {
        let v = run(&FormStyle { explode: true }, &tags_schema(), "big".into()).unwrap();
        assert_eq!(v, Some(strings(&["big"])));
    }

    #[test]
    fn test_form_non_exploded_splits() {
        let v = run(&FormStyle { explode: false }, &tags_schema(), "big,brown".into()).unwrap();
        assert_eq!(v, Some(strings(&["big", "brown"])));
    }

    #[test]
    fn test_simple_object_alternating() {
        let v = run(
            &SimpleStyle { explode: false },
            &address_schema(),
            "City,Orlando,State,FL,ZipCode,12345".into(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            v.to_json(),
            json!({"City": "Orlando", "State": "FL", "ZipCode": 12345})
        );
    }

    #[test]
    fn test_simple_object_exploded() {
        let v = run(
            &SimpleStyle { explode: true },
            &address_schema(),
            "City=Orlando,ZipCode=32801".into(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(v.to_json(), json!({"City": "Orlando", "ZipCode": 32801}));
    }

    #[test]
    fn test_form_object_exploded_query_string() {
        let v = run(
            &FormStyle { explode: true },
            &address_schema(),
            "City=New%20York&State=NY".into(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(v.to_json(), json!({"City": "New York", "State": "NY"}));
    }

    #[test]
    fn test_segments_keep_surrounding_spaces() {
        let v = run(&SimpleStyle { explode: false }, &tags_schema(), "a, b".into()).unwrap();
        assert_eq!(v, Some(strings(&["a", " b"])));

        let v = run(
            &SimpleStyle { explode: false },
            &address_schema(),
            "City, Orlando,ZipCode, 32801".into(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(v.to_json(), json!({"City": " Orlando", "ZipCode": 32801}));
    }

    #[test]
    fn test_trailing_key_is_dropped() {
        let v = run(
            &DelimitedStyle { delimiter: '|' },
            &address_schema(),
            "City|Orlando|State".into(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(v.to_json(), json!({"City": "Orlando"}));
    }

    #[test]
    fn test_delimited_arrays() {
        let space = run(&DelimitedStyle { delimiter: ' ' }, &tags_schema(), "a b  c".into()).unwrap();
        assert_eq!(space, Some(strings(&["a", "b", "c"])));
        let pipe = run(&DelimitedStyle { delimiter: '|' }, &tags_schema(), "a|b".into()).unwrap();
        assert_eq!(pipe, Some(strings(&["a", "b"])));
    }

    #[test]
    fn test_deep_object_passthrough() {
        let raw = RawValue::Json(json!({"City": "Orlando", "ZipCode": "32801"}));
        let v = run(&DeepObjectStyle, &address_schema(), raw).unwrap().unwrap();
        assert_eq!(v.to_json(), json!({"City": "Orlando", "ZipCode": 32801}));

        let err = run(&DeepObjectStyle, &address_schema(), "City".into()).unwrap_err();
        assert!(err.message.ends_with("is not a valid object"));
    }

    #[test]
    fn test_bracket_indices_become_array() {
        let raw = RawValue::Json(json!({"1": "b", "0": "a"}));
        let v = run(&DeepObjectStyle, &tags_schema(), raw).unwrap();
        assert_eq!(v, Some(strings(&["a", "b"])));
    }

    #[test]
    fn test_nested_error_path() {
        let err = run(
            &SimpleStyle { explode: false },
            &address_schema(),
            "City,Orlando,ZipCode,abc".into(),
        )
        .unwrap_err();
        assert_eq!(err.status, 400);
        assert!(err.message.contains("Address.ZipCode"), "{}", err.message);
    }

    #[test]
    fn test_array_index_in_error_path() {
        let schema = Schema::from_json(&json!({"type": "array", "items": {"type": "integer"}}));
        let err = run(&SimpleStyle { explode: false }, &schema, "1,2,x".into()).unwrap_err();
        assert!(err.message.starts_with("Error in Address[2]."), "{}", err.message);
    }

    #[test]
    fn test_object_default_for_empty_value() {
        let schema = Schema::from_json(&json!({"type": "object", "default": {}}));
        let v = run(&FormStyle { explode: true }, &schema, "".into()).unwrap();
        assert_eq!(v, Some(ParamValue::Object(IndexMap::new())));
    }

    #[test]
    fn test_property_defaults_applied() {
        let schema = Schema::from_json(&json!({
            "type": "object",
            "properties": {
                "City": {"type": "string"},
                "Country": {"type": "string", "default": "US"}
            }
        }));
        let v = run(&SimpleStyle { explode: false }, &schema, "City,Orlando".into())
            .unwrap()
            .unwrap();
        assert_eq!(v.to_json(), json!({"City": "Orlando", "Country": "US"}));
    }

    #[test]
    fn test_invalid_item_default_is_server_error() {
        let schema = Schema::of(SchemaKind::Array(Box::new(
            Schema::of(SchemaKind::String(StringFormat::Date)).with_default(json!("not-a-date")),
        )));
        let raw = RawValue::Json(json!(["2024-01-01", ""]));
        let err = run(&FormStyle { explode: true }, &schema, raw).unwrap_err();
        assert_eq!(err.status, 500);
    }

    #[test]
    fn test_json_content() {
        let v = run(&JsonContent, &address_schema(), r#"{"City":"Orlando","ZipCode":1}"#.into())
            .unwrap()
            .unwrap();
        assert_eq!(v.to_json(), json!({"City": "Orlando", "ZipCode": 1}));
        let err = run(&JsonContent, &address_schema(), "{oops".into()).unwrap_err();
        assert!(err.message.ends_with("is not valid JSON"));
    }
}
