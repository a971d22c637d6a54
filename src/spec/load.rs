use super::build::build_routes;
use super::types::{RouteMeta, SpecVersion};
use crate::validator::{fail_if_issues, ValidationIssue};
use anyhow::{bail, Context};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// A loaded and dereferenced API document.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub version: SpecVersion,
    pub title: String,
    pub api_version: String,
    pub base_path: String,
    pub routes: Vec<RouteMeta>,
    /// First 16 hex chars of the SHA-256 of the source text
    pub content_hash: String,
}

/// Accept only the HTTP verbs and the documented path item keys.
fn strip_unknown_verbs(val: &mut Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    if let Some(Value::Object(paths_map)) = val.get_mut("paths") {
        for item in paths_map.values_mut() {
            if let Value::Object(obj) = item {
                obj.retain(|k, _| {
                    let lk = k.to_ascii_lowercase();
                    match lk.as_str() {
                        "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                        m if METHODS.contains(&m) => k == &lk,
                        _ => k.starts_with("x-"),
                    }
                });
            }
        }
    }
}

fn detect_version(doc: &Value) -> anyhow::Result<SpecVersion> {
    if let Some(v) = doc.get("swagger").and_then(Value::as_str) {
        if v.starts_with("2.") {
            return Ok(SpecVersion::Swagger2);
        }
        bail!("Unsupported Swagger version \"{v}\"");
    }
    match doc.get("openapi").and_then(Value::as_str) {
        Some(v) if v.starts_with("3.1") => Ok(SpecVersion::OpenApi31),
        Some(v) if v.starts_with("3.") => Ok(SpecVersion::OpenApi30),
        Some(v) => bail!("Unsupported OpenAPI version \"{v}\""),
        None => bail!("Document declares neither \"swagger\" nor \"openapi\""),
    }
}

/// Parse YAML or JSON text. JSON is tried first for `.json` names, YAML
/// otherwise; YAML also accepts JSON so either order works.
pub fn parse_document(content: &str, name_hint: &str) -> anyhow::Result<Value> {
    if name_hint.ends_with(".json") {
        if let Ok(v) = serde_json::from_str(content) {
            return Ok(v);
        }
    }
    let value: Value = serde_yaml::from_str(content)
        .with_context(|| format!("{name_hint} is not valid YAML or JSON"))?;
    if !value.is_object() {
        bail!("{name_hint} does not contain an API document object");
    }
    Ok(value)
}

pub fn content_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Build a [`LoadedSpec`] from document text.
pub fn load_spec_str(content: &str, name_hint: &str) -> anyhow::Result<LoadedSpec> {
    let mut value = parse_document(content, name_hint)?;
    strip_unknown_verbs(&mut value);
    let mut spec = load_spec_from_value(&value)?;
    spec.content_hash = content_hash(content.as_bytes());
    Ok(spec)
}

/// Build a [`LoadedSpec`] from an already parsed document.
pub fn load_spec_from_value(value: &Value) -> anyhow::Result<LoadedSpec> {
    let version = detect_version(value)?;
    let mut issues: Vec<ValidationIssue> = Vec::new();
    let routes = build_routes(value, version, &mut issues);
    fail_if_issues(&issues)?;

    let info_str = |key: &str| {
        value
            .pointer(&format!("/info/{key}"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let base_path = routes
        .first()
        .map(|r| r.base_path.clone())
        .unwrap_or_else(|| super::build::extract_base_path(value, version));

    Ok(LoadedSpec {
        version,
        title: info_str("title"),
        api_version: info_str("version"),
        base_path,
        routes,
        content_hash: content_hash(value.to_string().as_bytes()),
    })
}

/// Collect document issues without failing on them.
pub fn lint_document(
    content: &str,
    name_hint: &str,
) -> anyhow::Result<(SpecVersion, Vec<ValidationIssue>)> {
    let mut value = parse_document(content, name_hint)?;
    strip_unknown_verbs(&mut value);
    let version = detect_version(&value)?;
    let mut issues = Vec::new();
    let routes: Vec<RouteMeta> = build_routes(&value, version, &mut issues);
    if routes.is_empty() {
        issues.push(ValidationIssue::new(
            "paths",
            "NoOperations",
            "the document declares no operations",
        ));
    }
    Ok((version, issues))
}

/// Read and load a document from disk.
pub fn load_spec(file_path: impl AsRef<Path>) -> anyhow::Result<LoadedSpec> {
    let file_path = file_path.as_ref();
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("Cannot read {}", file_path.display()))?;
    let spec = load_spec_str(&content, &file_path.to_string_lossy())?;
    info!(
        path = %file_path.display(),
        version = %spec.version,
        title = %spec.title,
        routes = spec.routes.len(),
        hash = %spec.content_hash,
        "API document loaded"
    );
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_unknown_verbs() {
        let mut v = json!({
            "paths": {
                "/x": { "get": {}, "patch": {}, "unknown": {}, "GET": {}, "x-extra": 1 }
            }
        });
        strip_unknown_verbs(&mut v);
        assert!(v["paths"]["/x"].get("unknown").is_none());
        assert!(v["paths"]["/x"].get("GET").is_none());
        assert!(v["paths"]["/x"].get("x-extra").is_some());
        assert!(v["paths"]["/x"].get("patch").is_some());
    }

    #[test]
    fn test_detect_version() {
        assert_eq!(detect_version(&json!({"swagger": "2.0"})).unwrap(), SpecVersion::Swagger2);
        assert_eq!(detect_version(&json!({"openapi": "3.0.3"})).unwrap(), SpecVersion::OpenApi30);
        assert_eq!(detect_version(&json!({"openapi": "3.1.0"})).unwrap(), SpecVersion::OpenApi31);
        assert!(detect_version(&json!({"openapi": "4.0"})).is_err());
        assert!(detect_version(&json!({})).is_err());
    }

    #[test]
    fn test_load_yaml() {
        let yaml = r#"
openapi: 3.0.0
info: {title: Pets, version: "1.2"}
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        "200": {description: ok}
"#;
        let spec = load_spec_str(yaml, "pets.yaml").unwrap();
        assert_eq!(spec.title, "Pets");
        assert_eq!(spec.api_version, "1.2");
        assert_eq!(spec.routes.len(), 1);
        assert_eq!(spec.routes[0].operation_id.as_deref(), Some("listPets"));
        assert_eq!(spec.content_hash.len(), 16);
    }

    #[test]
    fn test_load_rejects_broken_reference() {
        let yaml = r##"
swagger: "2.0"
info: {title: Broken, version: "1"}
paths:
  /pets:
    get:
      parameters:
        - $ref: "#/parameters/Missing"
      responses:
        "200": {description: ok}
"##;
        let err = load_spec_str(yaml, "broken.yaml").unwrap_err();
        assert!(err.to_string().contains("UnresolvedRef"), "{err}");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_spec("/definitely/not/here.yaml").is_err());
    }

    #[test]
    fn test_lint_collects_all_issues() {
        let yaml = r##"
swagger: "2.0"
info: {title: Broken, version: "1"}
paths:
  /pets:
    get:
      parameters:
        - $ref: "#/parameters/Missing"
        - {name: q, in: nowhere, type: string}
      responses:
        "200": {description: ok}
"##;
        let (version, issues) = lint_document(yaml, "broken.yaml").unwrap();
        assert_eq!(version, SpecVersion::Swagger2);
        assert!(issues.len() >= 2, "{issues:?}");
    }
}
