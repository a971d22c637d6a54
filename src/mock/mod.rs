//! # Mock responses
//!
//! Answers parsed requests from a key-value [`Store`] when no real
//! implementation sits behind the document.
//!
//! - [`Resource`]: one stored item, addressed by collection path and name
//! - [`DataStore`]: backend contract (`open`/`write` whole collections), with
//!   [`MemoryDataStore`] and [`FileDataStore`]
//! - [`Store`]: per-collection locking on top of a backend
//! - [`MockEngine`]: method and path shape to store operations, falling back
//!   to the response example or a schema sample when nothing is stored

mod engine;
mod resource;
mod sample;
mod store;

pub use engine::{declared_example, MockEngine, MockResponse};
pub use resource::{normalize_collection, split_resource_path, Resource};
pub use sample::sample_value;
pub use store::{merge_shallow, DataStore, FileDataStore, MemoryDataStore, Store, StoreError};
