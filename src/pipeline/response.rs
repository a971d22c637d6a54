use crate::params::ParseError;
use http::StatusCode;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Transport-neutral response produced by [`Pipeline::handle`](super::Pipeline::handle).
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl Response {
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status,
            headers,
            body,
        }
    }

    /// `{"error": message, "status": status}`
    pub fn error(err: &ParseError) -> Self {
        Self::json(
            err.status,
            json!({ "error": err.message, "status": err.status }),
        )
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }

    /// Body bytes as a transport would write them.
    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            Value::Null => Vec::new(),
            Value::String(s) if !self.is_json() => s.clone().into_bytes(),
            other => other.to_string().into_bytes(),
        }
    }

    fn is_json(&self) -> bool {
        self.header("content-type")
            .is_some_and(crate::spec::is_json_media_type)
    }
}
