//! Transport-neutral requests and the typed parameter bag produced for them.

use crate::params::query::{parse_query, split_target};
use crate::params::{ParamValue, RawValue, UploadedFile};
use crate::spec::{is_json_media_type, media_type_essence, ParameterLocation, RouteMeta};
use http::Method;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// An HTTP request as handed over by whatever transport sits in front.
///
/// Header names are stored lowercase. The body is already decoded as far as
/// its content type allows: JSON bodies as parsed JSON, url-encoded forms as
/// bracket-nested objects, text as a string, anything else as bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: Option<RawValue>,
    /// Multipart file parts
    pub files: Vec<UploadedFile>,
}

impl Request {
    /// `target` is the request target, e.g. `/pets?limit=10`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: query.to_string(),
            headers: HashMap::new(),
            body: None,
            files: Vec::new(),
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.headers
            .entry("content-type".to_string())
            .or_insert_with(|| "application/json".to_string());
        self.body = Some(RawValue::Json(body));
        self
    }

    /// Attach a raw body and decode it according to `content_type`.
    pub fn with_body(mut self, content_type: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        self.headers
            .insert("content-type".to_string(), content_type.to_string());
        self.headers
            .entry("content-length".to_string())
            .or_insert_with(|| bytes.len().to_string());
        self.body = Some(decode_body(content_type, bytes));
        self
    }

    /// Multipart form: plain fields plus file parts.
    pub fn with_multipart(mut self, fields: Map<String, Value>, files: Vec<UploadedFile>) -> Self {
        self.headers.insert(
            "content-type".to_string(),
            "multipart/form-data".to_string(),
        );
        self.body = Some(RawValue::Json(Value::Object(fields)));
        self.files = files;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn cookies(&self) -> HashMap<String, String> {
        parse_cookies(&self.headers)
    }

    pub fn query_params(&self) -> Map<String, Value> {
        parse_query(&self.query)
    }

    /// Whether the transport captured a body with any content.
    pub fn has_body_content(&self) -> bool {
        match &self.body {
            None => false,
            Some(RawValue::Bytes(b)) => !b.is_empty(),
            Some(raw) => !raw.is_missing() && !raw.is_empty_object(),
        }
    }
}

fn decode_body(content_type: &str, bytes: Vec<u8>) -> RawValue {
    let essence = media_type_essence(content_type);
    if is_json_media_type(&essence) {
        return match serde_json::from_slice::<Value>(&bytes) {
            Ok(v) => RawValue::Json(v),
            // Left as text so the body parameter reports it as invalid JSON.
            Err(_) => RawValue::text(String::from_utf8_lossy(&bytes).into_owned()),
        };
    }
    if essence == "application/x-www-form-urlencoded" {
        let text = String::from_utf8_lossy(&bytes);
        return RawValue::Json(Value::Object(parse_query(&text)));
    }
    if essence.starts_with("text/") {
        return match String::from_utf8(bytes) {
            Ok(s) => RawValue::text(s),
            Err(e) => RawValue::Bytes(e.into_bytes()),
        };
    }
    RawValue::Bytes(bytes)
}

/// Split a `Cookie` header into name/value pairs.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Typed parameters of one request, grouped by location.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedRequest {
    #[serde(skip)]
    pub route: Arc<RouteMeta>,
    pub path: IndexMap<String, ParamValue>,
    pub query: IndexMap<String, ParamValue>,
    pub header: IndexMap<String, ParamValue>,
    pub cookie: IndexMap<String, ParamValue>,
    #[serde(rename = "formData")]
    pub form_data: IndexMap<String, ParamValue>,
    pub body: Option<ParamValue>,
}

impl ParsedRequest {
    pub fn new(route: Arc<RouteMeta>) -> Self {
        Self {
            route,
            path: IndexMap::new(),
            query: IndexMap::new(),
            header: IndexMap::new(),
            cookie: IndexMap::new(),
            form_data: IndexMap::new(),
            body: None,
        }
    }

    pub fn bag(&self, location: ParameterLocation) -> Option<&IndexMap<String, ParamValue>> {
        match location {
            ParameterLocation::Path => Some(&self.path),
            ParameterLocation::Query => Some(&self.query),
            ParameterLocation::Header => Some(&self.header),
            ParameterLocation::Cookie => Some(&self.cookie),
            ParameterLocation::FormData => Some(&self.form_data),
            ParameterLocation::Body => None,
        }
    }

    pub(crate) fn insert(&mut self, location: ParameterLocation, name: &str, value: ParamValue) {
        debug!(param = %name, location = %location, "Parameter parsed");
        let bag = match location {
            ParameterLocation::Path => &mut self.path,
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::Header => &mut self.header,
            ParameterLocation::Cookie => &mut self.cookie,
            ParameterLocation::FormData => &mut self.form_data,
            ParameterLocation::Body => {
                self.body = Some(value);
                return;
            }
        };
        bag.insert(name.to_string(), value);
    }

    /// Look a parameter up by name across locations: path, query, header,
    /// cookie, then form data.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.path
            .get(name)
            .or_else(|| self.query.get(name))
            .or_else(|| self.header.get(name))
            .or_else(|| self.cookie.get(name))
            .or_else(|| self.form_data.get(name))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
