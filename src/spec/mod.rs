//! Loading OpenAPI 3.x and Swagger 2.0 documents into route metadata.

mod build;
mod load;
mod types;

pub use build::*;
pub use load::*;
pub use types::*;
