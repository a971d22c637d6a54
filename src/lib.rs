//! # oasmock
//!
//! **oasmock** turns requests against an OpenAPI 3.x or Swagger 2.0 document
//! into schema-typed parameters, and can answer them from a mock data store.
//!
//! ## Overview
//!
//! The heart of the crate is the parameter engine in [`params`]: untyped
//! values from query strings, headers, cookies, path segments, form fields
//! and bodies are rebuilt into arrays and objects according to the declared
//! `style`/`explode`/`collectionFormat` (or parsed as JSON for `content`
//! parameters and bodies), coerced to integers, numbers, booleans, bytes,
//! dates and date-times, defaulted, and validated against their schema.
//!
//! ## Architecture
//!
//! - **[`params`]** - primitive coercion, style decomposers, the per-parameter
//!   parser and the path parameter matcher
//! - **[`spec`]** - loading YAML/JSON documents into route metadata
//! - **[`document`]** - immutable document snapshots behind an atomic swap
//! - **[`router`]** - method and path to operation, with 404/405 detection
//! - **[`request`]** - transport-neutral requests and the parsed parameter bag
//! - **[`validator`]** / **[`validator_cache`]** - document issues, request
//!   checks (413/415) and precompiled parameter schema validators
//! - **[`pipeline`]** - the stage chain from request to parsed parameters
//!   and mock response
//! - **[`mock`]** - data stores and the mock response engine
//! - **[`hot_reload`]** - reload the document when its file changes
//! - **[`logging`]** / **[`runtime_config`]** - ambient configuration
//! - **[`cli`]** - the `oasmock` command line
//!
//! ### Request flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant P as pipeline::Pipeline
//!     participant D as document::DocumentHandle
//!     participant R as router::Router
//!     participant PP as params::ParameterParser
//!     participant M as mock::MockEngine
//!
//!     T->>P: handle(Request)
//!     P->>D: current()
//!     D-->>P: Arc<ApiDocument> (or 500)
//!     P->>R: route(method, path)
//!     R-->>P: RouteMatch (or 404/405)
//!     loop query, header, cookie, formData, body, path
//!         P->>PP: parse(param, raw, content type)
//!         PP-->>P: typed value (or 400/411/500)
//!     end
//!     P->>P: validate_request (413/415)
//!     P->>M: respond(ParsedRequest)
//!     M-->>P: status + JSON body
//!     P-->>T: Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use oasmock::document::DocumentHandle;
//! use oasmock::pipeline::Pipeline;
//! use oasmock::request::Request;
//! use oasmock::spec::load_spec_str;
//! use std::sync::Arc;
//!
//! let yaml = r#"
//! openapi: 3.0.0
//! info: {title: Pets, version: "1"}
//! paths:
//!   /pets:
//!     get:
//!       parameters:
//!         - {name: Age, in: query, schema: {type: integer}}
//!       responses:
//!         "200": {description: ok}
//! "#;
//! let handle = Arc::new(DocumentHandle::from_spec(load_spec_str(yaml, "pets.yaml")?, true));
//! let parsed = Pipeline::new(handle).process(&Request::get("/pets?Age=4")).unwrap();
//! assert_eq!(parsed.query["Age"].as_i64(), Some(4));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Parsing returns [`params::ParseError`], which carries the HTTP status to
//! answer with: 400 for bad or missing input, 411 for an empty or missing
//! required `Content-Length`, 500 when a value only failed because the
//! document's own `default` is invalid or the document failed to load.

pub mod cli;
pub mod document;
pub mod hot_reload;
pub mod logging;
pub mod mock;
pub mod params;
pub mod pipeline;
pub mod request;
pub mod router;
pub mod runtime_config;
pub mod spec;
pub mod validator;
pub mod validator_cache;

pub use document::{ApiDocument, DocumentHandle};
pub use params::{ParamValue, ParseError, RawValue};
pub use pipeline::{Pipeline, Response};
pub use request::{ParsedRequest, Request};
pub use spec::{load_spec, load_spec_str, LoadedSpec, ParameterLocation, ParameterMeta, RouteMeta};
