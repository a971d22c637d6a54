//! # Schema Validator Cache
//!
//! Compiled `jsonschema` validators for every parameter of one document
//! snapshot. Compiling is far more expensive than validating, so validators
//! are built once when the snapshot is built and shared through `Arc`.
//!
//! ## Cache keys
//!
//! `{revision}:{hash}:{METHOD path}:{location}:{name}[:{media type}]`
//!
//! - `revision`: counter bumped for every snapshot a handle installs
//! - `hash`: first 16 hex chars of the SHA-256 of the document text
//! - `media type`: the `content` entry the schema came from, for parameters
//!   declared with `content`
//!
//! A reload builds a new snapshot with a new cache, so keys from an older
//! document can never be served by a newer one.
//!
//! ## Schema dialect
//!
//! Swagger 2.0 and OpenAPI 3.0 schemas are compiled as draft 4, OpenAPI 3.1
//! as draft 2020-12. Format assertions are off: the coercer already checked
//! `date`, `date-time` and `byte`.

use crate::spec::{ParameterMeta, RouteMeta, SpecVersion};
use jsonschema::{Draft, Validator};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info};

/// Identifies the document a cache was built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRevision {
    /// Incremented on each reload
    pub revision: u64,
    /// Content hash of the document
    pub hash: String,
}

impl DocumentRevision {
    pub fn new(revision: u64, hash: impl Into<String>) -> Self {
        Self {
            revision,
            hash: hash.into(),
        }
    }

    pub fn to_key(&self) -> String {
        format!("{}:{}", self.revision, self.hash)
    }
}

impl Default for DocumentRevision {
    fn default() -> Self {
        Self {
            revision: 1,
            hash: "initial".to_string(),
        }
    }
}

/// Parameter validators for one document snapshot.
pub struct ValidatorCache {
    /// `None` records a schema that failed to compile so it is not retried
    cache: RwLock<HashMap<String, Option<Arc<Validator>>>>,
    enabled: bool,
    draft: Draft,
    revision: DocumentRevision,
}

impl std::fmt::Debug for ValidatorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCache")
            .field("enabled", &self.enabled)
            .field("revision", &self.revision)
            .field("size", &self.size())
            .finish()
    }
}

impl ValidatorCache {
    pub fn new(enabled: bool, version: SpecVersion, revision: DocumentRevision) -> Self {
        let draft = match version {
            SpecVersion::OpenApi31 => Draft::Draft202012,
            SpecVersion::Swagger2 | SpecVersion::OpenApi30 => Draft::Draft4,
        };
        Self {
            cache: RwLock::new(HashMap::new()),
            enabled,
            draft,
            revision,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn revision(&self) -> &DocumentRevision {
        &self.revision
    }

    fn cache_key(
        revision: &DocumentRevision,
        route_key: &str,
        param: &ParameterMeta,
        media_type: Option<&str>,
    ) -> String {
        let mut key = format!(
            "{}:{}:{}:{}",
            revision.to_key(),
            route_key,
            param.location,
            param.name
        );
        if let Some(media_type) = media_type {
            key.push(':');
            key.push_str(media_type);
        }
        key
    }

    fn compile(&self, schema: &Value) -> Result<Validator, String> {
        let schema = sanitize_schema(schema);
        jsonschema::options()
            .with_draft(self.draft)
            .should_validate_formats(false)
            .build(&schema)
            .map_err(|e| e.to_string())
    }

    /// Cached validator for `param` of the route identified by `route_key`,
    /// compiling it on first use. `media_type` names the `content` entry
    /// `schema` was taken from. `None` when validation is disabled or the
    /// schema does not compile.
    pub fn get_or_compile(
        &self,
        route_key: &str,
        param: &ParameterMeta,
        media_type: Option<&str>,
        schema: &Value,
    ) -> Option<Arc<Validator>> {
        if !self.enabled {
            return None;
        }
        let key = Self::cache_key(&self.revision, route_key, param, media_type);

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = cache.get(&key) {
                debug!(cache_key = %key, "Schema validator cache hit");
                return entry.clone();
            }
        }

        let compiled = match self.compile(schema) {
            Ok(v) => Some(Arc::new(v)),
            Err(e) => {
                error!(
                    route = %route_key,
                    param = %param.name,
                    location = %param.location,
                    error = %e,
                    "Failed to compile parameter schema"
                );
                None
            }
        };

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.entry(key).or_insert(compiled).clone()
    }

    /// Validate a coerced value; `Err` lists every violation.
    pub fn validate(
        &self,
        route_key: &str,
        param: &ParameterMeta,
        media_type: Option<&str>,
        schema: &Value,
        instance: &Value,
    ) -> Result<(), String> {
        let Some(validator) = self.get_or_compile(route_key, param, media_type, schema) else {
            return Ok(());
        };
        let messages: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(messages.join("; "))
        }
    }

    pub fn size(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Compile every parameter schema of `routes` ahead of the first request.
    pub fn precompile(&self, routes: &[Arc<RouteMeta>]) -> usize {
        if !self.enabled {
            info!("Schema validation disabled, skipping precompilation");
            return 0;
        }
        let mut compiled = 0;
        for route in routes {
            let route_key = route.key();
            for param in &route.parameters {
                let entries: Vec<(Option<&str>, &Value)> = match &param.content {
                    Some(content) => content
                        .iter()
                        .map(|(media_type, schema)| (Some(media_type.as_str()), schema))
                        .collect(),
                    None => param.schema.iter().map(|schema| (None, schema)).collect(),
                };
                for (media_type, schema) in entries {
                    if self
                        .get_or_compile(&route_key, param, media_type, schema)
                        .is_some()
                    {
                        compiled += 1;
                    }
                }
            }
        }
        info!(
            compiled_count = compiled,
            cache_size = self.size(),
            routes_count = routes.len(),
            revision = self.revision.revision,
            hash = %self.revision.hash,
            "Precompiled parameter schemas"
        );
        compiled
    }
}

/// Schema a parameter value is validated against, with the `content` media
/// type it was declared under: the entry for the request's media type, else
/// the bare schema.
pub fn validation_schema<'a>(
    param: &'a ParameterMeta,
    content_type: Option<&str>,
) -> Option<(Option<&'a str>, &'a Value)> {
    match param.content_schema(content_type) {
        Some((media_type, schema)) => Some((Some(media_type), schema)),
        None => param.schema.as_ref().map(|schema| (None, schema)),
    }
}

/// Remove what JSON Schema cannot express: Swagger's `type: file`.
fn sanitize_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .filter(|(k, v)| !(k.as_str() == "type" && v.as_str() == Some("file")))
                .map(|(k, v)| (k.clone(), sanitize_schema(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_schema).collect()),
        other => other.clone(),
    }
}
