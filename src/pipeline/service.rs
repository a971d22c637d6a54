use super::response::Response;
use crate::document::DocumentHandle;
use crate::mock::MockEngine;
use crate::params::{ParameterParser, ParseError, RawValue, Schema, SchemaKind};
use crate::request::{ParsedRequest, Request};
use crate::router::{Resolution, RouteMatch};
use crate::spec::{ParameterLocation, ParameterStyle, RouteMeta};
use crate::validator::validate_request;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The request stage chain over the current document.
///
/// Each call loads the current snapshot once, so a reload in the middle of a
/// request never mixes two documents.
#[derive(Debug)]
pub struct Pipeline {
    document: Arc<DocumentHandle>,
    mock: Option<MockEngine>,
}

impl Pipeline {
    pub fn new(document: Arc<DocumentHandle>) -> Self {
        Self {
            document,
            mock: None,
        }
    }

    /// Answer successfully parsed requests from `engine`.
    pub fn with_mock(mut self, engine: MockEngine) -> Self {
        self.mock = Some(engine);
        self
    }

    pub fn document(&self) -> &Arc<DocumentHandle> {
        &self.document
    }

    pub fn mock(&self) -> Option<&MockEngine> {
        self.mock.as_ref()
    }

    /// Resolve the operation and parse every declared parameter.
    ///
    /// Stages run in order: metadata, query/header/cookie parameters, form
    /// data, body, path parameters, request validation. The first failing
    /// stage ends the chain.
    pub fn process(&self, request: &Request) -> Result<ParsedRequest, ParseError> {
        let doc = self.document.current()?;
        let matched = doc.router.route(&request.method, &request.path)?;
        let mut parsed = ParsedRequest::new(Arc::clone(&matched.route));
        let route_key = matched.route.key();
        let stages = Stages {
            request,
            matched: &matched,
            parser: ParameterParser::with_validation(&doc.validators, &route_key),
        };

        stages.simple_params(&mut parsed)?;
        stages.form_params(&mut parsed)?;
        stages.body_param(&mut parsed)?;
        stages.path_params(&mut parsed)?;
        validate_request(&matched.route, request)?;

        debug!(route = %route_key, revision = doc.revision(), "Request parsed");
        Ok(parsed)
    }

    /// [`process`](Self::process), then the mock engine when configured.
    /// Errors become JSON error responses.
    pub fn handle(&self, request: &Request) -> Response {
        let parsed = match self.process(request) {
            Ok(p) => p,
            Err(e) => return self.error_response(request, &e),
        };

        let Some(engine) = &self.mock else {
            return Response::json(200, parsed.to_json());
        };
        match engine.respond(&parsed, &request.path) {
            Ok(mocked) => {
                info!(method = %request.method, path = %request.path, status = mocked.status, "Mock response");
                let mut res = Response::json(mocked.status, mocked.body);
                if let Some(ct) = parsed.route.content_type_for(mocked.status) {
                    res = res.with_header("Content-Type", ct);
                }
                res
            }
            Err(e) => self.error_response(request, &e),
        }
    }

    fn error_response(&self, request: &Request, err: &ParseError) -> Response {
        if err.is_client_error() {
            warn!(method = %request.method, path = %request.path, status = err.status, error = %err.message, "Request rejected");
        } else {
            error!(method = %request.method, path = %request.path, status = err.status, error = %err.message, "Request failed");
        }
        let res = Response::error(err);
        if err.status != 405 {
            return res;
        }
        let Ok(doc) = self.document.current() else {
            return res;
        };
        match doc.router.resolve(&request.method, &request.path) {
            Resolution::MethodNotAllowed { allow } => {
                let allow: Vec<&str> = allow.iter().map(http::Method::as_str).collect();
                res.with_header("Allow", allow.join(", "))
            }
            _ => res,
        }
    }
}

struct Stages<'a> {
    request: &'a Request,
    matched: &'a RouteMatch,
    parser: ParameterParser<'a>,
}

/// An exploded form-style object query parameter sends its properties as
/// top-level keys (`?City=Orlando&Zip=32801`), so it never appears under its
/// own name. Declared properties pick their keys; an object without declared
/// properties takes every key no other query parameter claims.
fn exploded_form_object(route: &RouteMeta, name: &str, query: &Map<String, Value>) -> Option<Value> {
    let param = route.parameters_in(ParameterLocation::Query).find(|p| p.name == name)?;
    if param.content.is_some()
        || param.effective_style() != ParameterStyle::Form
        || !param.effective_explode()
    {
        return None;
    }
    let SchemaKind::Object(props) = Schema::from_json(param.schema.as_ref()?).kind else {
        return None;
    };

    let object: Map<String, Value> = if props.is_empty() {
        query
            .iter()
            .filter(|(key, _)| {
                !route
                    .parameters_in(ParameterLocation::Query)
                    .any(|other| other.name == key.as_str())
            })
            .map(|(key, v)| (key.clone(), v.clone()))
            .collect()
    } else {
        query
            .iter()
            .filter(|(key, _)| props.contains_key(key.as_str()))
            .map(|(key, v)| (key.clone(), v.clone()))
            .collect()
    };
    (!object.is_empty()).then_some(Value::Object(object))
}

impl Stages<'_> {
    fn parse_into(
        &self,
        parsed: &mut ParsedRequest,
        location: ParameterLocation,
        mut raw_for: impl FnMut(&str) -> Option<RawValue>,
    ) -> Result<(), ParseError> {
        let content_type = self.request.content_type();
        for param in self.matched.route.parameters_in(location) {
            let raw = raw_for(&param.name);
            if let Some(value) = self.parser.parse(param, raw.as_ref(), content_type)? {
                parsed.insert(location, &param.name, value);
            }
        }
        Ok(())
    }

    fn simple_params(&self, parsed: &mut ParsedRequest) -> Result<(), ParseError> {
        let query = self.request.query_params();
        let route = &self.matched.route;
        self.parse_into(parsed, ParameterLocation::Query, |name| {
            query
                .get(name)
                .cloned()
                .or_else(|| exploded_form_object(route, name, &query))
                .map(RawValue::Json)
        })?;
        self.parse_into(parsed, ParameterLocation::Header, |name| {
            self.request.header(name).map(RawValue::text)
        })?;
        let cookies = self.request.cookies();
        self.parse_into(parsed, ParameterLocation::Cookie, |name| {
            cookies.get(name).map(|v| RawValue::text(v.as_str()))
        })
    }

    /// Form fields come from the decoded body; files from multipart parts by field name.
    fn form_params(&self, parsed: &mut ParsedRequest) -> Result<(), ParseError> {
        let fields = match &self.request.body {
            Some(RawValue::Json(Value::Object(map))) => Some(map),
            _ => None,
        };
        self.parse_into(parsed, ParameterLocation::FormData, |name| {
            if let Some(file) = self.request.files.iter().find(|f| f.field_name == name) {
                return Some(RawValue::File(file.clone()));
            }
            fields.and_then(|f| f.get(name)).cloned().map(RawValue::Json)
        })
    }

    /// Without a declared body parameter the captured body is discarded.
    fn body_param(&self, parsed: &mut ParsedRequest) -> Result<(), ParseError> {
        if self.matched.route.parameters_in(ParameterLocation::Body).next().is_none() {
            if self.request.body.is_some() && !self.matched.route.has_body_params() {
                debug!(route = %self.matched.route.key(), "Discarding body of operation without body parameters");
            }
            return Ok(());
        }
        self.parse_into(parsed, ParameterLocation::Body, |_| self.request.body.clone())
    }

    fn path_params(&self, parsed: &mut ParsedRequest) -> Result<(), ParseError> {
        self.parse_into(parsed, ParameterLocation::Path, |name| {
            self.matched.get_path_param(name).map(RawValue::text)
        })
    }
}
