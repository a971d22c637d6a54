//! Mock responses driven by the operation's method and path shape.

use super::resource::{split_resource_path, Resource};
use super::sample::sample_value;
use super::store::{merge_shallow, DataStore, FileDataStore, MemoryDataStore, Store, StoreError};
use crate::params::{ParamValue, ParseError};
use crate::request::ParsedRequest;
use crate::spec::{is_json_media_type, RouteMeta};
use http::Method;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

/// Status and JSON body of a mocked response.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub body: Value,
}

impl From<StoreError> for ParseError {
    fn from(e: StoreError) -> Self {
        ParseError::server_error(e.to_string())
    }
}

/// Answers parsed requests from a [`Store`].
///
/// An operation whose path ends in a path parameter (`/pets/{name}`) addresses
/// one resource; any other path addresses a collection.
pub struct MockEngine {
    store: Store<Box<dyn DataStore>>,
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine").finish_non_exhaustive()
    }
}

impl MockEngine {
    pub fn new(backend: impl DataStore + 'static) -> Self {
        Self {
            store: Store::new(Box::new(backend)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryDataStore::new())
    }

    /// File-backed when `data_dir` is set, in memory otherwise.
    pub fn with_data_dir(data_dir: Option<&Path>) -> Result<Self, StoreError> {
        match data_dir {
            Some(dir) => {
                info!(data_dir = %dir.display(), "Using file data store");
                Ok(Self::new(FileDataStore::new(dir)?))
            }
            None => Ok(Self::in_memory()),
        }
    }

    pub fn store(&self) -> &Store<Box<dyn DataStore>> {
        &self.store
    }

    /// Produce the response for `request`, addressed by the actual request `path`.
    pub fn respond(&self, request: &ParsedRequest, path: &str) -> Result<MockResponse, ParseError> {
        let route = request.route.as_ref();
        let status = route.success_status();
        let is_resource = route.path_pattern.trim_end_matches('/').ends_with('}');
        debug!(method = %route.method, path = %path, is_resource, "Mock request");

        let body = match (&route.method, is_resource) {
            (m, true) if *m == Method::GET || *m == Method::HEAD => {
                let (collection, name) = split_resource_path(path);
                match self.store.get(&collection, &name)? {
                    Some(resource) => resource.data,
                    None => declared_example(route, status)
                        .ok_or_else(|| ParseError::new(404, format!("Resource not found: {path}")))?,
                }
            }
            (m, false) if *m == Method::GET || *m == Method::HEAD => {
                let all = self.store.get_collection(path)?;
                if all.is_empty() {
                    declared_example(route, status).unwrap_or_else(|| Value::Array(Vec::new()))
                } else {
                    Value::Array(
                        all.into_iter()
                            .filter(|r| matches_filter(&r.data, &request.query))
                            .map(|r| r.data)
                            .collect(),
                    )
                }
            }
            (m, false) if *m == Method::POST || *m == Method::PUT || *m == Method::PATCH => {
                let data = request_data(request);
                let name = identifying_name(&data).unwrap_or_default();
                self.store.save(Resource::new(path, &name, data))?.data
            }
            (m, true) if *m == Method::PUT || *m == Method::POST => {
                self.store.save(Resource::from_path(path, request_data(request)))?.data
            }
            (m, true) if *m == Method::PATCH => {
                let (collection, name) = split_resource_path(path);
                let mut data = self
                    .store
                    .get(&collection, &name)?
                    .map(|r| r.data)
                    .unwrap_or_else(|| Value::Object(Map::new()));
                merge_shallow(&mut data, request_data(request));
                self.store.save(Resource::new(&collection, &name, data))?.data
            }
            (m, true) if *m == Method::DELETE => {
                let (collection, name) = split_resource_path(path);
                match self.store.delete(&collection, &name)? {
                    Some(resource) => resource.data,
                    None => return Err(ParseError::new(404, format!("Resource not found: {path}"))),
                }
            }
            (m, false) if *m == Method::DELETE => Value::Array(
                self.store
                    .delete_where(path, |r| matches_filter(&r.data, &request.query))?
                    .into_iter()
                    .map(|r| r.data)
                    .collect(),
            ),
            _ => declared_example(route, status).unwrap_or(Value::Null),
        };

        let body = if status == 204 { Value::Null } else { body };
        Ok(MockResponse { status, body })
    }
}

/// The example (or a sample built from the schema) declared for `status`,
/// preferring JSON media types.
pub fn declared_example(route: &RouteMeta, status: u16) -> Option<Value> {
    let media = route.responses.get(&status)?;
    let spec = media
        .iter()
        .find(|(ct, _)| is_json_media_type(ct))
        .or_else(|| media.iter().next())
        .map(|(_, spec)| spec)?;
    spec.example
        .clone()
        .or_else(|| spec.schema.as_ref().map(sample_value))
}

/// Body data of the request: the body parameter, else the form fields.
fn request_data(request: &ParsedRequest) -> Value {
    if let Some(body) = &request.body {
        return body.to_json();
    }
    Value::Object(
        request
            .form_data
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// `id` or `name` property used as the resource name.
fn identifying_name(data: &Value) -> Option<String> {
    ["id", "name"].iter().find_map(|key| match data.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Query parameters naming a data property must match it; others are ignored.
fn matches_filter(data: &Value, query: &IndexMap<String, ParamValue>) -> bool {
    query.iter().all(|(name, expected)| match data.get(name) {
        Some(actual) => value_matches(expected, actual),
        None => true,
    })
}

fn value_matches(expected: &ParamValue, actual: &Value) -> bool {
    if let Some(options) = expected.as_array() {
        return options.iter().any(|o| value_matches(o, actual));
    }
    match actual {
        Value::Array(items) => items.iter().any(|item| expected.matches_json(item)),
        Value::String(s) => expected
            .as_str()
            .map_or_else(|| expected.matches_json(actual), |e| e.eq_ignore_ascii_case(s)),
        _ => expected.matches_json(actual),
    }
}
