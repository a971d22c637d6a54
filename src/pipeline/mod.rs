//! # Request pipeline
//!
//! [`Pipeline`] takes a transport-neutral [`Request`](crate::request::Request)
//! through the stage chain against the current document snapshot:
//!
//! 1. metadata: route the method and path (404, 405)
//! 2. query, header and cookie parameters
//! 3. form data parameters, including uploaded files
//! 4. the body parameter (an undeclared body is dropped)
//! 5. path parameters
//! 6. request validation (413, 415)
//! 7. optionally, the [`MockEngine`](crate::mock::MockEngine)
//!
//! [`Pipeline::handle`] turns every failure into a JSON [`Response`] carrying
//! the error's status.

mod response;
mod service;

pub use response::{status_reason, Response};
pub use service::Pipeline;
