use http::Method;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Which dialect the document was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    /// `swagger: "2.0"`
    Swagger2,
    /// `openapi: 3.0.x`
    OpenApi30,
    /// `openapi: 3.1.x`
    OpenApi31,
}

impl SpecVersion {
    pub fn is_swagger(&self) -> bool {
        matches!(self, SpecVersion::Swagger2)
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecVersion::Swagger2 => write!(f, "Swagger 2.0"),
            SpecVersion::OpenApi30 => write!(f, "OpenAPI 3.0"),
            SpecVersion::OpenApi31 => write!(f, "OpenAPI 3.1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    FormData,
    Body,
}

impl ParameterLocation {
    /// Parse the `in` field of a parameter object.
    pub fn from_in(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            "formData" => Some(ParameterLocation::FormData),
            "body" => Some(ParameterLocation::Body),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
            ParameterLocation::FormData => "formData",
            ParameterLocation::Body => "body",
        }
    }

    /// Style used when a parameter does not declare one.
    pub fn default_style(&self) -> ParameterStyle {
        match self {
            ParameterLocation::Path | ParameterLocation::Header => ParameterStyle::Simple,
            _ => ParameterStyle::Form,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    /// Swagger 2.0 `collectionFormat: tsv`
    TabDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "form" => Some(ParameterStyle::Form),
            "simple" => Some(ParameterStyle::Simple),
            "spaceDelimited" => Some(ParameterStyle::SpaceDelimited),
            "pipeDelimited" => Some(ParameterStyle::PipeDelimited),
            "tabDelimited" => Some(ParameterStyle::TabDelimited),
            "deepObject" => Some(ParameterStyle::DeepObject),
            _ => None,
        }
    }

    /// Explode flag used when a parameter does not declare one.
    pub fn default_explode(&self) -> bool {
        matches!(self, ParameterStyle::Form | ParameterStyle::DeepObject)
    }
}

impl fmt::Display for ParameterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParameterStyle::Form => "form",
            ParameterStyle::Simple => "simple",
            ParameterStyle::SpaceDelimited => "spaceDelimited",
            ParameterStyle::PipeDelimited => "pipeDelimited",
            ParameterStyle::TabDelimited => "tabDelimited",
            ParameterStyle::DeepObject => "deepObject",
        };
        write!(f, "{s}")
    }
}

/// One declared operation parameter, references already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// JSON schema with `$ref`s expanded
    pub schema: Option<Value>,
    pub style: Option<ParameterStyle>,
    pub explode: Option<bool>,
    /// Media type to schema; takes precedence over `schema`
    pub content: Option<IndexMap<String, Value>>,
}

impl ParameterMeta {
    pub fn new(name: impl Into<String>, location: ParameterLocation) -> Self {
        Self {
            name: name.into(),
            location,
            required: location == ParameterLocation::Path,
            schema: None,
            style: None,
            explode: None,
            content: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_style(mut self, style: ParameterStyle, explode: Option<bool>) -> Self {
        self.style = Some(style);
        self.explode = explode;
        self
    }

    pub fn with_content(mut self, content: IndexMap<String, Value>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn effective_style(&self) -> ParameterStyle {
        self.style.unwrap_or_else(|| self.location.default_style())
    }

    pub fn effective_explode(&self) -> bool {
        let style = self.effective_style();
        if style == ParameterStyle::DeepObject {
            return true;
        }
        self.explode.unwrap_or_else(|| style.default_explode())
    }

    /// Schema for a given media type: the matching `content` entry (exact,
    /// then by essence without parameters, then wildcard), else the first one.
    pub fn content_schema(&self, content_type: Option<&str>) -> Option<(&str, &Value)> {
        let content = self.content.as_ref()?;
        let wanted = content_type.map(media_type_essence);
        let found = wanted.and_then(|wanted| {
            content
                .iter()
                .find(|(mt, _)| media_type_essence(mt) == wanted)
                .or_else(|| {
                    content
                        .iter()
                        .find(|(mt, _)| media_type_matches(mt, &wanted))
                })
        });
        found
            .or_else(|| content.first())
            .map(|(mt, schema)| (mt.as_str(), schema))
    }

    pub fn is_body_like(&self) -> bool {
        matches!(
            self.location,
            ParameterLocation::Body | ParameterLocation::FormData
        )
    }
}

/// `application/json; charset=utf-8` gives `application/json`.
pub fn media_type_essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Wildcard-aware comparison: `*/*`, `application/*`, `application/*+json`.
pub fn media_type_matches(pattern: &str, media_type: &str) -> bool {
    let pattern = media_type_essence(pattern);
    let media_type = media_type_essence(media_type);
    if pattern == "*/*" || pattern == media_type {
        return true;
    }
    match (pattern.split_once('/'), media_type.split_once('/')) {
        (Some((pt, ps)), Some((mt, ms))) => {
            (pt == "*" || pt == mt)
                && (ps == "*"
                    || ps == ms
                    || ps
                        .strip_prefix("*+")
                        .is_some_and(|suffix| ms.ends_with(&format!("+{suffix}"))))
        }
        _ => false,
    }
}

pub fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type_essence(media_type);
    essence == "application/json" || essence.ends_with("+json") || essence == "text/json"
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub schema: Option<Value>,
    pub example: Option<Value>,
}

/// Status code to media type to response description.
pub type Responses = BTreeMap<u16, IndexMap<String, ResponseSpec>>;

#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    /// Template as written under `paths`
    pub path_pattern: String,
    pub operation_id: Option<String>,
    pub parameters: Vec<ParameterMeta>,
    /// Media types the operation accepts
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub responses: Responses,
    pub base_path: String,
}

impl RouteMeta {
    /// Base path and template joined, as matched against request paths.
    pub fn full_path(&self) -> String {
        join_paths(&self.base_path, &self.path_pattern)
    }

    /// `GET /pets/{id}`
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.full_path())
    }

    pub fn content_type_for(&self, status: u16) -> Option<String> {
        self.responses
            .get(&status)
            .and_then(|m| m.keys().next())
            .cloned()
    }

    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &ParameterMeta> {
        self.parameters.iter().filter(move |p| p.location == location)
    }

    pub fn has_body_params(&self) -> bool {
        self.parameters.iter().any(ParameterMeta::is_body_like)
    }

    /// Status a successful mock response uses: 201 for `POST` when declared,
    /// else the lowest declared 2xx, else 200.
    pub fn success_status(&self) -> u16 {
        if self.method == Method::POST && self.responses.contains_key(&201) {
            return 201;
        }
        self.responses
            .keys()
            .copied()
            .find(|s| (200..300).contains(s))
            .unwrap_or(200)
    }
}

pub(crate) fn join_paths(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_styles() {
        let q = ParameterMeta::new("Tags", ParameterLocation::Query);
        assert_eq!(q.effective_style(), ParameterStyle::Form);
        assert!(q.effective_explode());

        let h = ParameterMeta::new("Address", ParameterLocation::Header);
        assert_eq!(h.effective_style(), ParameterStyle::Simple);
        assert!(!h.effective_explode());

        let d = ParameterMeta::new("Filter", ParameterLocation::Query)
            .with_style(ParameterStyle::DeepObject, Some(false));
        assert!(d.effective_explode());
    }

    #[test]
    fn test_content_schema_selection() {
        let mut content = IndexMap::new();
        content.insert("application/xml".to_string(), json!({"type": "string"}));
        content.insert("application/json".to_string(), json!({"type": "object"}));
        let p = ParameterMeta::new("body", ParameterLocation::Body).with_content(content);

        let (mt, _) = p.content_schema(Some("application/json; charset=utf-8")).unwrap();
        assert_eq!(mt, "application/json");
        let (mt, _) = p.content_schema(None).unwrap();
        assert_eq!(mt, "application/xml");
        let (mt, _) = p.content_schema(Some("text/plain")).unwrap();
        assert_eq!(mt, "application/xml");
    }

    #[test]
    fn test_media_type_matching() {
        assert!(media_type_matches("*/*", "text/plain"));
        assert!(media_type_matches("application/*", "application/json"));
        assert!(media_type_matches("application/*+json", "application/vnd.api+json"));
        assert!(!media_type_matches("text/plain", "application/json"));
        assert!(is_json_media_type("application/problem+json"));
    }

    #[test]
    fn test_full_path() {
        assert_eq!(join_paths("/api/v1/", "/pets"), "/api/v1/pets");
        assert_eq!(join_paths("", "/pets"), "/pets");
    }
}
