//! # Router Module
//!
//! Resolves an incoming method and path to the operation declared in the
//! current document snapshot.
//!
//! ## Overview
//!
//! 1. **Compilation**: when a snapshot is built every full path template
//!    (`basePath` + `/pets/{id}`) is compiled once into the snapshot's
//!    [`PathRegexCache`](crate::params::PathRegexCache). The router borrows
//!    those matchers.
//! 2. **Matching**: the request path is tested against each template.
//!    A template that matches with a declared method yields a [`RouteMatch`];
//!    one that matches without the method yields 405 with the allowed
//!    methods; no match at all yields 404.
//!
//! ## Example
//!
//! ```rust,ignore
//! let doc = ApiDocument::from_yaml(yaml)?;
//! match doc.router.resolve(&Method::GET, "/pets/Fido") {
//!     Resolution::Matched(m) => println!("{:?}", m.path_params),
//!     Resolution::MethodNotAllowed { allow } => println!("allow: {allow:?}"),
//!     Resolution::NotFound => println!("404"),
//! }
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{Resolution, RouteMatch, Router};
