//! The current API document, replaced as a whole on reload.
//!
//! An [`ApiDocument`] is an immutable snapshot: routes, the path regex cache,
//! the router and the parameter validators are all built together from one
//! loaded file. [`DocumentHandle`] publishes snapshots through an
//! [`ArcSwap`], so a request loads one `Arc` and sees either the old or the
//! new document, never a mix.

use crate::params::{ParseError, PathRegexCache};
use crate::router::Router;
use crate::spec::{load_spec, load_spec_str, LoadedSpec, RouteMeta};
use crate::validator_cache::{DocumentRevision, ValidatorCache};
use arc_swap::ArcSwap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// One fully built document.
#[derive(Debug)]
pub struct ApiDocument {
    pub spec: LoadedSpec,
    pub routes: Vec<Arc<RouteMeta>>,
    pub paths: PathRegexCache,
    pub router: Router,
    pub validators: ValidatorCache,
}

impl ApiDocument {
    pub fn build(spec: LoadedSpec, revision: u64, validate_schemas: bool) -> Self {
        let routes: Vec<Arc<RouteMeta>> = spec.routes.iter().cloned().map(Arc::new).collect();
        let full_paths: Vec<String> = routes.iter().map(|r| r.full_path()).collect();
        let paths = PathRegexCache::build(full_paths.iter().map(String::as_str));
        let router = Router::new(&routes, &paths);
        let validators = ValidatorCache::new(
            validate_schemas,
            spec.version,
            DocumentRevision::new(revision, spec.content_hash.clone()),
        );
        validators.precompile(&routes);

        Self {
            spec,
            routes,
            paths,
            router,
            validators,
        }
    }

    /// Build a validating snapshot straight from YAML or JSON text.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let spec = load_spec_str(content, "document.yaml")?;
        Ok(Self::build(spec, 1, true))
    }

    pub fn revision(&self) -> u64 {
        self.validators.revision().revision
    }
}

/// What a [`DocumentHandle`] currently holds.
#[derive(Debug)]
pub enum DocumentState {
    /// Nothing loaded yet
    Loading,
    Ready(Arc<ApiDocument>),
    /// The last load attempt failed
    Failed(String),
}

/// Error returned while no usable document is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentError {
    pub reason: String,
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to load the API document ({})", self.reason)
    }
}

impl std::error::Error for DocumentError {}

impl From<DocumentError> for ParseError {
    fn from(e: DocumentError) -> Self {
        ParseError::server_error(e.to_string())
    }
}

/// Shared, swappable reference to the current document.
#[derive(Debug)]
pub struct DocumentHandle {
    state: ArcSwap<DocumentState>,
    revision: AtomicU64,
    validate_schemas: bool,
}

impl DocumentHandle {
    /// A handle with nothing loaded yet; requests fail with 500 until
    /// [`install`](Self::install) or [`reload`](Self::reload) succeeds.
    pub fn new(validate_schemas: bool) -> Self {
        Self {
            state: ArcSwap::from_pointee(DocumentState::Loading),
            revision: AtomicU64::new(0),
            validate_schemas,
        }
    }

    /// Load `path` into a new handle. A load failure is kept as the handle's
    /// state rather than returned.
    pub fn open(path: impl AsRef<Path>, validate_schemas: bool) -> Self {
        let handle = Self::new(validate_schemas);
        if let Err(e) = handle.reload(path.as_ref()) {
            debug!(reason = %e.reason, "Handle opened without a document");
        }
        handle
    }

    pub fn from_spec(spec: LoadedSpec, validate_schemas: bool) -> Self {
        let handle = Self::new(validate_schemas);
        handle.install(spec);
        handle
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Build a snapshot from `spec` and publish it.
    pub fn install(&self, spec: LoadedSpec) -> Arc<ApiDocument> {
        let doc = Arc::new(ApiDocument::build(
            spec,
            self.next_revision(),
            self.validate_schemas,
        ));
        self.state.store(Arc::new(DocumentState::Ready(Arc::clone(&doc))));
        info!(
            revision = doc.revision(),
            routes = doc.routes.len(),
            hash = %doc.spec.content_hash,
            "API document installed"
        );
        doc
    }

    /// Record a load failure; requests get 500 until the next success.
    pub fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(reason = %reason, "API document unavailable");
        self.state.store(Arc::new(DocumentState::Failed(reason)));
    }

    /// Load from disk and publish, or record the failure.
    pub fn reload(&self, path: &Path) -> Result<Arc<ApiDocument>, DocumentError> {
        match load_spec(path) {
            Ok(spec) => Ok(self.install(spec)),
            Err(e) => {
                let reason = format!("{e:#}");
                self.fail(reason.clone());
                Err(DocumentError { reason })
            }
        }
    }

    /// The current snapshot.
    pub fn current(&self) -> Result<Arc<ApiDocument>, DocumentError> {
        match self.state.load().as_ref() {
            DocumentState::Ready(doc) => Ok(Arc::clone(doc)),
            DocumentState::Loading => Err(DocumentError {
                reason: "the document is still loading".to_string(),
            }),
            DocumentState::Failed(reason) => Err(DocumentError {
                reason: reason.clone(),
            }),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state.load().as_ref(), DocumentState::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
openapi: 3.0.0
info: {title: Pets, version: "1"}
paths:
  /pets/{PetName}:
    get:
      parameters:
        - {name: PetName, in: path, required: true, schema: {type: string}}
      responses:
        "200": {description: ok}
"#;

    #[test]
    fn test_snapshot_owns_path_cache() {
        let doc = ApiDocument::from_yaml(YAML).unwrap();
        assert_eq!(doc.paths.len(), 1);
        assert!(doc.paths.get("/pets/{PetName}").is_some());
        assert_eq!(doc.validators.size(), 1);
    }

    #[test]
    fn test_handle_states() {
        let handle = DocumentHandle::new(true);
        let err = handle.current().unwrap_err();
        assert!(err.to_string().starts_with("Unable to load the API document"));

        let spec = load_spec_str(YAML, "pets.yaml").unwrap();
        let first = handle.install(spec.clone());
        assert_eq!(first.revision(), 1);
        assert!(handle.is_ready());

        handle.fail("broken");
        assert_eq!(
            ParseError::from(handle.current().unwrap_err()),
            ParseError::server_error("Unable to load the API document (broken)")
        );

        let second = handle.install(spec);
        assert_eq!(second.revision(), 2);
        // Readers holding the old snapshot keep it intact.
        assert_eq!(first.routes.len(), 1);
    }

    #[test]
    fn test_open_missing_file_records_failure() {
        let handle = DocumentHandle::open("/no/such/file.yaml", true);
        assert!(!handle.is_ready());
        assert!(handle.current().unwrap_err().reason.contains("Cannot read"));
    }
}
