use super::types::{
    join_paths, media_type_essence, ParameterLocation, ParameterMeta, ParameterStyle,
    ResponseSpec, Responses, RouteMeta, SpecVersion,
};
use crate::validator::ValidationIssue;
use http::Method;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

const METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Keys of a Swagger 2.0 non-body parameter that describe its value.
const SWAGGER_SCHEMA_KEYS: [&str; 17] = [
    "type",
    "format",
    "items",
    "default",
    "enum",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "title",
];

const FORM_MEDIA_TYPES: [&str; 2] = ["application/x-www-form-urlencoded", "multipart/form-data"];

/// Resolve a local `$ref` such as `#/definitions/Pet` or
/// `#/components/schemas/Pet` against the document.
pub fn resolve_schema_ref<'a>(doc: &'a Value, ref_path: &str) -> Option<&'a Value> {
    let pointer = ref_path.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(doc);
    }
    doc.pointer(pointer)
}

/// Recursively replace every `$ref` in `value` with the referenced schema.
///
/// The last path segment of the reference is kept as `x-ref-name`. A
/// reference that points back into its own expansion is replaced by an
/// empty schema.
pub fn expand_schema_refs(doc: &Value, value: &mut Value, issues: &mut Vec<ValidationIssue>) {
    let mut stack = Vec::new();
    expand_inner(doc, value, &mut stack, issues);
}

fn expand_inner(
    doc: &Value,
    value: &mut Value,
    stack: &mut Vec<String>,
    issues: &mut Vec<ValidationIssue>,
) {
    match value {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(Value::as_str).map(str::to_string) {
                let name = ref_path.rsplit('/').next().unwrap_or_default().to_string();
                if stack.contains(&ref_path) {
                    debug!(reference = %ref_path, "Recursive reference left untyped");
                    *value = json!({ "x-ref-name": name });
                    return;
                }
                match resolve_schema_ref(doc, &ref_path) {
                    Some(target) => {
                        let mut new_val = target.clone();
                        stack.push(ref_path);
                        expand_inner(doc, &mut new_val, stack, issues);
                        stack.pop();
                        if let Value::Object(o) = &mut new_val {
                            o.insert("x-ref-name".to_string(), Value::String(name));
                        }
                        *value = new_val;
                    }
                    None => {
                        issues.push(ValidationIssue::new(
                            ref_path.clone(),
                            "UnresolvedRef",
                            format!("Cannot resolve reference \"{ref_path}\""),
                        ));
                        *value = Value::Object(Map::new());
                    }
                }
                return;
            }
            for v in obj.values_mut() {
                expand_inner(doc, v, stack, issues);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_inner(doc, v, stack, issues);
            }
        }
        _ => {}
    }
}

/// Follow a `$ref` on a parameter, request body or response object.
fn deref_object(doc: &Value, value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
    match value.get("$ref").and_then(Value::as_str) {
        Some(ref_path) => match resolve_schema_ref(doc, ref_path) {
            Some(target) => deref_object(doc, target, issues),
            None => {
                issues.push(ValidationIssue::new(
                    ref_path,
                    "UnresolvedRef",
                    format!("Cannot resolve reference \"{ref_path}\""),
                ));
                None
            }
        },
        None => Some(value.clone()),
    }
}

fn expanded(doc: &Value, schema: &Value, issues: &mut Vec<ValidationIssue>) -> Value {
    let mut schema = schema.clone();
    expand_schema_refs(doc, &mut schema, issues);
    schema
}

/// Schema equivalent of a Swagger 2.0 parameter that carries its type inline.
fn swagger_inline_schema(param: &Map<String, Value>) -> Value {
    let mut schema = Map::new();
    for key in SWAGGER_SCHEMA_KEYS {
        if let Some(v) = param.get(key) {
            schema.insert(key.to_string(), v.clone());
        }
    }
    Value::Object(schema)
}

/// Style and explode implied by a Swagger 2.0 `collectionFormat`.
fn collection_format_style(
    format: Option<&str>,
    location: ParameterLocation,
) -> (Option<ParameterStyle>, Option<bool>) {
    match format {
        Some("ssv") => (Some(ParameterStyle::SpaceDelimited), Some(false)),
        Some("tsv") => (Some(ParameterStyle::TabDelimited), Some(false)),
        Some("pipes") => (Some(ParameterStyle::PipeDelimited), Some(false)),
        Some("multi") => (Some(ParameterStyle::Form), Some(true)),
        _ => (Some(location.default_style()), Some(false)),
    }
}

fn media_schemas(
    doc: &Value,
    content: &Map<String, Value>,
    issues: &mut Vec<ValidationIssue>,
) -> IndexMap<String, Value> {
    content
        .iter()
        .map(|(mt, media)| {
            let schema = media
                .get("schema")
                .map(|s| expanded(doc, s, issues))
                .unwrap_or_else(|| Value::Object(Map::new()));
            (mt.clone(), schema)
        })
        .collect()
}

fn parse_parameter(
    doc: &Value,
    version: SpecVersion,
    raw: &Value,
    location_label: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<ParameterMeta> {
    let param = deref_object(doc, raw, issues)?;
    let obj = param.as_object()?;

    let Some(name) = obj.get("name").and_then(Value::as_str) else {
        issues.push(ValidationIssue::new(
            location_label,
            "InvalidParameter",
            "Parameter is missing a name",
        ));
        return None;
    };
    let in_value = obj.get("in").and_then(Value::as_str).unwrap_or_default();
    let location = match ParameterLocation::from_in(in_value) {
        Some(ParameterLocation::FormData | ParameterLocation::Body) if !version.is_swagger() => None,
        Some(ParameterLocation::Cookie) if version.is_swagger() => None,
        other => other,
    };
    let Some(location) = location else {
        issues.push(ValidationIssue::new(
            location_label,
            "InvalidParameter",
            format!("Parameter \"{name}\" has an unsupported location \"{in_value}\""),
        ));
        return None;
    };

    let required = location == ParameterLocation::Path
        || obj.get("required").and_then(Value::as_bool).unwrap_or(false);
    let mut meta = ParameterMeta::new(name, location).required(required);

    if version.is_swagger() {
        if location == ParameterLocation::Body {
            meta.schema = obj.get("schema").map(|s| expanded(doc, s, issues));
        } else {
            meta.schema = Some(expanded(doc, &swagger_inline_schema(obj), issues));
            let (style, explode) = collection_format_style(
                obj.get("collectionFormat").and_then(Value::as_str),
                location,
            );
            meta.style = style;
            meta.explode = explode;
        }
    } else {
        meta.schema = obj.get("schema").map(|s| expanded(doc, s, issues));
        meta.content = obj
            .get("content")
            .and_then(Value::as_object)
            .map(|content| media_schemas(doc, content, issues));
        meta.style = obj
            .get("style")
            .and_then(Value::as_str)
            .and_then(ParameterStyle::from_name);
        meta.explode = obj.get("explode").and_then(Value::as_bool);
    }

    Some(meta)
}

/// Resolve path-level and operation-level parameters. Operation parameters
/// replace path-level ones with the same name and location.
pub fn extract_parameters(
    doc: &Value,
    version: SpecVersion,
    path_params: &[Value],
    op_params: &[Value],
    location_label: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Vec<ParameterMeta> {
    let mut out: Vec<ParameterMeta> = Vec::new();
    for raw in path_params.iter().chain(op_params) {
        let Some(meta) = parse_parameter(doc, version, raw, location_label, issues) else {
            continue;
        };
        match out
            .iter_mut()
            .find(|p| p.name == meta.name && p.location == meta.location)
        {
            Some(existing) => *existing = meta,
            None => out.push(meta),
        }
    }
    out
}

/// OAS3 `requestBody` as parameters: a synthetic body parameter, or one
/// `formData` parameter per property when only form media types are declared.
pub fn extract_request_body(
    doc: &Value,
    operation: &Map<String, Value>,
    location_label: &str,
    issues: &mut Vec<ValidationIssue>,
) -> (Vec<ParameterMeta>, Vec<String>) {
    let Some(raw) = operation.get("requestBody") else {
        return (Vec::new(), Vec::new());
    };
    let Some(body) = deref_object(doc, raw, issues) else {
        return (Vec::new(), Vec::new());
    };
    let required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
    let content = body
        .get("content")
        .and_then(Value::as_object)
        .map(|c| media_schemas(doc, c, issues))
        .unwrap_or_default();
    let consumes: Vec<String> = content.keys().cloned().collect();

    if content.is_empty() {
        issues.push(ValidationIssue::new(
            location_label,
            "InvalidRequestBody",
            "requestBody declares no content",
        ));
        return (Vec::new(), consumes);
    }

    let form_only = content
        .keys()
        .all(|mt| FORM_MEDIA_TYPES.contains(&media_type_essence(mt).as_str()));
    if form_only {
        let multipart = content
            .keys()
            .any(|mt| media_type_essence(mt) == "multipart/form-data");
        let schema = content.values().next().cloned().unwrap_or_default();
        return (form_parameters(&schema, multipart), consumes);
    }

    let name = operation
        .get("x-codegen-request-body-name")
        .and_then(Value::as_str)
        .unwrap_or("body");
    let param = ParameterMeta::new(name, ParameterLocation::Body)
        .required(required)
        .with_content(content);
    (vec![param], consumes)
}

fn form_parameters(schema: &Value, multipart: bool) -> Vec<ParameterMeta> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let Some(props) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    props
        .iter()
        .map(|(name, prop)| {
            let is_upload = multipart
                && prop.get("type").and_then(Value::as_str) == Some("string")
                && prop.get("format").and_then(Value::as_str) == Some("binary");
            let prop_schema = if is_upload {
                json!({ "type": "file" })
            } else {
                prop.clone()
            };
            ParameterMeta::new(name.clone(), ParameterLocation::FormData)
                .required(required.contains(&name.as_str()))
                .with_schema(prop_schema)
        })
        .collect()
}

fn first_example(media: &Value) -> Option<Value> {
    media.get("example").cloned().or_else(|| {
        media
            .get("examples")
            .and_then(Value::as_object)
            .and_then(|ex| ex.values().find_map(|e| e.get("value").cloned()))
    })
}

/// Response schemas and examples keyed by status and media type.
pub fn extract_responses(
    doc: &Value,
    version: SpecVersion,
    operation: &Map<String, Value>,
    produces: &[String],
    issues: &mut Vec<ValidationIssue>,
) -> Responses {
    let mut all = Responses::new();
    let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
        return all;
    };

    for (status_str, raw) in responses {
        let Ok(status) = status_str.parse::<u16>() else {
            continue;
        };
        let Some(resp) = deref_object(doc, raw, issues) else {
            continue;
        };
        let entry = all.entry(status).or_default();

        if version.is_swagger() {
            let schema = resp.get("schema").map(|s| expanded(doc, s, issues));
            let examples = resp.get("examples").and_then(Value::as_object);
            let media_types: Vec<String> = if produces.is_empty() {
                vec!["application/json".to_string()]
            } else {
                produces.to_vec()
            };
            for mt in media_types {
                let example = examples
                    .and_then(|ex| ex.get(&mt).cloned())
                    .or_else(|| schema.as_ref().and_then(|s| s.get("example").cloned()));
                entry.insert(
                    mt,
                    ResponseSpec {
                        schema: schema.clone(),
                        example,
                    },
                );
            }
        } else if let Some(content) = resp.get("content").and_then(Value::as_object) {
            for (mt, media) in content {
                let schema = media.get("schema").map(|s| expanded(doc, s, issues));
                let example = first_example(media)
                    .or_else(|| schema.as_ref().and_then(|s| s.get("example").cloned()));
                entry.insert(mt.clone(), ResponseSpec { schema, example });
            }
        }
    }
    all
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

/// Base path from Swagger `basePath` or the path part of `servers[0].url`.
pub fn extract_base_path(doc: &Value, version: SpecVersion) -> String {
    let raw = if version.is_swagger() {
        doc.get("basePath")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    } else {
        doc.pointer("/servers/0/url")
            .and_then(Value::as_str)
            .map(|url_str| {
                url::Url::parse(url_str)
                    .or_else(|_| url::Url::parse(&format!("http://localhost{url_str}")))
                    .map(|u| u.path().to_string())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    };
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// `{name}` placeholders in a path template.
fn template_params(path: &str) -> Vec<&str> {
    path.split('{')
        .skip(1)
        .filter_map(|s| s.split_once('}').map(|(name, _)| name))
        .collect()
}

/// Build route metadata for every operation in the document.
///
/// Problems that make an operation unusable are collected into `issues`;
/// the caller decides whether they are fatal.
pub fn build_routes(
    doc: &Value,
    version: SpecVersion,
    issues: &mut Vec<ValidationIssue>,
) -> Vec<RouteMeta> {
    let mut routes = Vec::new();
    let base_path = extract_base_path(doc, version);
    let global_consumes = string_list(doc.get("consumes")).unwrap_or_default();
    let global_produces = string_list(doc.get("produces")).unwrap_or_default();

    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return routes;
    };

    for (path, raw_item) in paths {
        let Some(item) = deref_object(doc, raw_item, issues) else {
            continue;
        };
        let path_params: Vec<Value> = item
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for method_str in METHODS {
            let Some(operation) = item.get(method_str).and_then(Value::as_object) else {
                continue;
            };
            let Ok(method) = Method::from_bytes(method_str.to_ascii_uppercase().as_bytes()) else {
                continue;
            };
            let location = format!("{path} -> {method}");

            let op_params: Vec<Value> = operation
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let mut parameters =
                extract_parameters(doc, version, &path_params, &op_params, &location, issues);

            let (consumes, produces) = if version.is_swagger() {
                (
                    string_list(operation.get("consumes")).unwrap_or_else(|| global_consumes.clone()),
                    string_list(operation.get("produces")).unwrap_or_else(|| global_produces.clone()),
                )
            } else {
                let (body_params, consumes) =
                    extract_request_body(doc, operation, &location, issues);
                parameters.extend(body_params);
                (consumes, Vec::new())
            };

            for name in template_params(path) {
                let declared = parameters
                    .iter()
                    .any(|p| p.location == ParameterLocation::Path && p.name == name);
                if !declared {
                    warn!(path = %path, method = %method, param = %name, "Path placeholder has no parameter declaration");
                }
            }

            let body_count = parameters
                .iter()
                .filter(|p| p.location == ParameterLocation::Body)
                .count();
            if body_count > 1 {
                issues.push(ValidationIssue::new(
                    &location,
                    "DuplicateBody",
                    "Only one body parameter may be declared",
                ));
            }

            let responses = extract_responses(doc, version, operation, &produces, issues);
            let produces = if produces.is_empty() {
                let mut all: Vec<String> = Vec::new();
                for mt in responses.values().flat_map(|m| m.keys()) {
                    if !all.contains(mt) {
                        all.push(mt.clone());
                    }
                }
                all
            } else {
                produces
            };

            routes.push(RouteMeta {
                method,
                path_pattern: path.clone(),
                operation_id: operation
                    .get("operationId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                parameters,
                consumes,
                produces,
                responses,
                base_path: base_path.clone(),
            });
        }
    }

    debug!(
        routes = routes.len(),
        base_path = %base_path,
        first = ?routes.first().map(|r| join_paths(&r.base_path, &r.path_pattern)),
        "Routes built"
    );
    routes
}
