use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Descriptor of a file uploaded through a multipart form.
///
/// The transport owns multipart decoding; the parser only checks that a
/// `type: file` parameter received one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Form field name the file was sent under
    pub field_name: String,
    /// Client supplied file name
    pub original_name: String,
    /// Declared content type of the part
    pub mime_type: String,
    /// File contents
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Untyped value handed over by the transport for a single parameter.
///
/// Query strings and form bodies are represented as JSON: a plain string for a
/// single occurrence, an array for repeated keys and an object for bracket
/// notation (`Address[City]=Orlando`). Parsed JSON bodies arrive as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Json(Value),
    Bytes(Vec<u8>),
    File(UploadedFile),
}

impl RawValue {
    pub fn text(s: impl Into<String>) -> Self {
        RawValue::Json(Value::String(s.into()))
    }

    /// `true` for `""`, the value a transport produces for `name=`.
    pub fn is_empty_string(&self) -> bool {
        matches!(self, RawValue::Json(Value::String(s)) if s.is_empty())
    }

    /// `""` or JSON `null`: treated like an absent value.
    pub fn is_missing(&self) -> bool {
        self.is_empty_string() || matches!(self, RawValue::Json(Value::Null))
    }

    /// `true` for an object with no keys, the default some body readers produce
    /// when nothing was sent.
    pub fn is_empty_object(&self) -> bool {
        matches!(self, RawValue::Json(Value::Object(o)) if o.is_empty())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Json(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::text(value)
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::text(value)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Json(Value::String(s)) => f.write_str(s),
            RawValue::Json(v) => write!(f, "{v}"),
            RawValue::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            RawValue::File(file) => write!(f, "{}", file.original_name),
        }
    }
}

/// A schema-typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(i64),
    Number(f64),
    Boolean(bool),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Array(Vec<ParamValue>),
    Object(IndexMap<String, ParamValue>),
    File(UploadedFile),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(n) => Some(*n as f64),
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, ParamValue>> {
        match self {
            ParamValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// Structural conversion for values no schema describes. `null` maps to `None`.
    pub fn from_json(value: &Value) -> Option<ParamValue> {
        Some(match value {
            Value::Null => return None,
            Value::Bool(b) => ParamValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Integer(i),
                None => ParamValue::Number(n.as_f64()?),
            },
            Value::String(s) => ParamValue::String(s.clone()),
            Value::Array(items) => {
                ParamValue::Array(items.iter().filter_map(ParamValue::from_json).collect())
            }
            Value::Object(props) => ParamValue::Object(
                props
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), ParamValue::from_json(v)?)))
                    .collect(),
            ),
        })
    }

    /// JSON form of the value: bytes become base64, dates ISO-8601 strings.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Compare against a JSON literal using the JSON form of the value.
    ///
    /// Numbers compare numerically so `Integer(4)` matches both `4` and `4.0`.
    pub fn matches_json(&self, other: &Value) -> bool {
        match (self, other) {
            (ParamValue::Integer(_) | ParamValue::Number(_), Value::Number(n)) => {
                self.as_f64() == n.as_f64()
            }
            (_, other) => &self.to_json() == other,
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Integer(n) => serializer.serialize_i64(*n),
            ParamValue::Number(n) => serializer.serialize_f64(*n),
            ParamValue::Boolean(b) => serializer.serialize_bool(*b),
            ParamValue::String(s) => serializer.serialize_str(s),
            ParamValue::Bytes(b) => serializer.serialize_str(&STANDARD.encode(b)),
            ParamValue::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            ParamValue::DateTime(dt) => {
                serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            ParamValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ParamValue::Object(props) => {
                let mut map = serializer.serialize_map(Some(props.len()))?;
                for (k, v) in props {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            ParamValue::File(file) => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("fieldName", &file.field_name)?;
                map.serialize_entry("originalName", &file.original_name)?;
                map.serialize_entry("mimeType", &file.mime_type)?;
                map.serialize_entry("size", &file.size())?;
                map.end()
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_json_encodes_bytes_and_dates() {
        let mut props = IndexMap::new();
        props.insert("raw".to_string(), ParamValue::Bytes(b"hi".to_vec()));
        props.insert(
            "day".to_string(),
            ParamValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
        );
        let v = ParamValue::Object(props);
        assert_eq!(v.to_json(), json!({"raw": "aGk=", "day": "2024-02-29"}));
    }

    #[test]
    fn test_matches_json_numbers() {
        assert!(ParamValue::Integer(4).matches_json(&json!(4.0)));
        assert!(ParamValue::Number(1.5).matches_json(&json!(1.5)));
        assert!(!ParamValue::String("4".into()).matches_json(&json!(4)));
    }

    #[test]
    fn test_raw_value_helpers() {
        assert!(RawValue::text("").is_empty_string());
        assert!(RawValue::Json(json!({})).is_empty_object());
        assert_eq!(RawValue::Json(json!([1, 2])).to_string(), "[1,2]");
    }
}
