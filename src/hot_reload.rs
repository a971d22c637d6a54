//! # Hot Reload Module
//!
//! Live reloading of the API document without restarting.
//!
//! ## Overview
//!
//! [`watch_spec`] watches the document file and, on every create or modify
//! event:
//! - reloads and parses the file
//! - builds a new [`ApiDocument`] snapshot (routes, path regex cache,
//!   validators) and swaps it into the [`DocumentHandle`]
//! - calls the reload hook with the new snapshot
//!
//! ## Usage
//!
//! ```rust,ignore
//! use oasmock::document::DocumentHandle;
//! use oasmock::hot_reload::watch_spec;
//! use std::sync::Arc;
//!
//! let handle = Arc::new(DocumentHandle::open("openapi.yaml", true));
//! let _watcher = watch_spec("openapi.yaml", Arc::clone(&handle), |doc| {
//!     println!("Reloaded {} routes", doc.routes.len());
//! })?;
//! ```
//!
//! ## Debouncing
//!
//! Editors often write a file several times per save. A reload whose content
//! hash equals the current snapshot's is skipped.
//!
//! ## Error Handling
//!
//! If the new file fails to load, the failure is stored in the handle and
//! every request gets 500 until a later save loads cleanly.

use crate::document::{ApiDocument, DocumentHandle};
use crate::spec::content_hash;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of one [`reload_if_changed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded { revision: u64 },
    Unchanged,
    Failed(String),
}

/// Reload `path` into `handle` unless its content matches the current snapshot.
pub fn reload_if_changed(
    path: &Path,
    handle: &DocumentHandle,
) -> (ReloadOutcome, Option<Arc<ApiDocument>>) {
    if let (Ok(bytes), Ok(current)) = (fs::read(path), handle.current()) {
        if content_hash(&bytes) == current.spec.content_hash {
            debug!(path = %path.display(), "hot-reload: content unchanged");
            return (ReloadOutcome::Unchanged, None);
        }
    }
    match handle.reload(path) {
        Ok(doc) => {
            info!(
                path = %path.display(),
                revision = doc.revision(),
                routes = doc.routes.len(),
                "hot-reload: document swapped"
            );
            (ReloadOutcome::Reloaded { revision: doc.revision() }, Some(doc))
        }
        Err(e) => (ReloadOutcome::Failed(e.reason), None),
    }
}

/// Watch the document file and swap `handle` whenever it changes.
///
/// The parent directory is watched so editors that save by renaming over the
/// file are still seen. The returned watcher stops when dropped.
pub fn watch_spec<P, F>(
    spec_path: P,
    handle: Arc<DocumentHandle>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut(&Arc<ApiDocument>) + Send + 'static,
{
    let path = absolute(spec_path.as_ref());
    let watch_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let target = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                if !event.paths.iter().any(|p| absolute(p) == target) {
                    return;
                }
                if let (ReloadOutcome::Reloaded { .. }, Some(doc)) =
                    reload_if_changed(&target, &handle)
                {
                    on_reload(&doc);
                }
            }
            Err(e) => error!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "hot-reload: watching document");
    Ok(watcher)
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
