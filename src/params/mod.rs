//! # Parameter parsing and coercion
//!
//! Turns the untyped values a transport extracts for each declared parameter
//! (query strings, headers, cookies, path segments, form fields, bodies) into
//! schema-typed [`ParamValue`]s.
//!
//! ## Layers
//!
//! - [`coerce`]: one primitive value against one primitive schema
//! - [`style`]: rebuilding arrays and objects according to the parameter's
//!   `style`/`explode` (or JSON for `content` parameters and bodies)
//! - [`parser`]: presence rules, default substitution, error wrapping and
//!   schema validation per declared parameter
//! - [`path`]: extracting raw path parameters from a request path
//! - [`query`]: bracket-aware query string and form body parsing
//!
//! Every error is a [`ParseError`] carrying the HTTP status to answer with.
//! A value that only failed because the document's own `default` was
//! unusable carries 500 instead of 400.

pub mod coerce;
pub mod context;
pub mod error;
pub mod parser;
pub mod path;
pub mod query;
pub mod schema;
pub mod style;
pub mod value;

pub use coerce::coerce;
pub use context::ParseContext;
pub use error::ParseError;
pub use parser::{parse_parameter, ParameterParser};
pub use path::{PathMatcher, PathRegexCache};
pub use schema::{Schema, SchemaKind, StringFormat};
pub use style::{
    decompose, decomposer_for, DeepObjectStyle, DelimitedStyle, FormStyle, JsonContent,
    SimpleStyle, StyleDecomposer,
};
pub use value::{ParamValue, RawValue, UploadedFile};
