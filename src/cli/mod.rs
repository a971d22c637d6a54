//! # CLI Module
//!
//! Command-line access to the document loader, the parameter pipeline and the
//! mock engine.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List every operation with its full path and operationId:
//!
//! ```bash
//! oasmock routes --spec openapi.yaml
//! ```
//!
//! ### `lint`
//!
//! Report every problem found while building routes (unresolved `$ref`s,
//! unsupported parameter locations, duplicate body parameters):
//!
//! ```bash
//! oasmock lint --spec openapi.yaml --fail-on-error
//! ```
//!
//! ### `parse`
//!
//! Run one request through the parameter pipeline and print the typed values:
//!
//! ```bash
//! oasmock parse --spec openapi.yaml -X GET --target '/pets?Age=4&Tags=big&Tags=brown'
//! oasmock parse --spec openapi.yaml -X GET --target /pets -H 'Address: City,Orlando'
//! ```
//!
//! ### `mock`
//!
//! Answer requests from the mock engine, either one request given with
//! `--target` or a stream of `METHOD TARGET [JSON BODY]` lines on stdin:
//!
//! ```bash
//! printf 'POST /pets {"name":"Fido"}\nGET /pets/Fido\n' \
//!     | oasmock mock --spec openapi.yaml --data-dir ./mock-data --watch
//! ```
//!
//! Environment defaults come from
//! [`RuntimeConfig`](crate::runtime_config::RuntimeConfig); flags override them.

mod commands;


pub use commands::{build_request, run_cli, serve_lines, Cli, Commands, RequestArgs};
