//! Key-value collections backing the mock engine.

use super::resource::{normalize_collection, Resource};
use crate::spec::content_hash;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Corrupt { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, source } => {
                write!(f, "Data store I/O error on {}: {source}", path.display())
            }
            StoreError::Corrupt { path, source } => {
                write!(f, "Data store file {} is corrupt: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Corrupt { source, .. } => Some(source),
        }
    }
}

/// Storage backend: whole collections are read and written at once.
///
/// [`Store`] serializes access per collection, so implementations only need
/// to be safe for concurrent calls on different collections.
pub trait DataStore: Send + Sync {
    fn open(&self, collection: &str) -> Result<Vec<Resource>, StoreError>;
    fn write(&self, collection: &str, resources: &[Resource]) -> Result<(), StoreError>;
}

impl<T: DataStore + ?Sized> DataStore for Box<T> {
    fn open(&self, collection: &str) -> Result<Vec<Resource>, StoreError> {
        (**self).open(collection)
    }

    fn write(&self, collection: &str, resources: &[Resource]) -> Result<(), StoreError> {
        (**self).write(collection, resources)
    }
}

/// Collections kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    collections: Mutex<HashMap<String, Vec<Resource>>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataStore for MemoryDataStore {
    fn open(&self, collection: &str) -> Result<Vec<Resource>, StoreError> {
        let map = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(collection).cloned().unwrap_or_default())
    }

    fn write(&self, collection: &str, resources: &[Resource]) -> Result<(), StoreError> {
        let mut map = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        if resources.is_empty() {
            map.remove(collection);
        } else {
            map.insert(collection.to_string(), resources.to_vec());
        }
        Ok(())
    }
}

/// One JSON file per collection under `base_dir`.
#[derive(Debug, Clone)]
pub struct FileDataStore {
    base_dir: PathBuf,
}

impl FileDataStore {
    /// Creates `base_dir` if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|source| StoreError::Io {
            path: base_dir.clone(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File holding `collection`; names are hashed so any path is a valid file name.
    pub fn file_for(&self, collection: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.json", content_hash(collection.as_bytes())))
    }
}

impl DataStore for FileDataStore {
    fn open(&self, collection: &str) -> Result<Vec<Resource>, StoreError> {
        let path = self.file_for(collection);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt { path, source })
    }

    fn write(&self, collection: &str, resources: &[Resource]) -> Result<(), StoreError> {
        let path = self.file_for(collection);
        if resources.is_empty() {
            return match fs::remove_file(&path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => {
                    Err(StoreError::Io { path, source: e })
                }
                _ => Ok(()),
            };
        }
        let json = serde_json::to_vec_pretty(resources)
            .map_err(|source| StoreError::Corrupt { path: path.clone(), source })?;
        fs::write(&path, json).map_err(|source| StoreError::Io { path, source })?;
        debug!(collection = %collection, count = resources.len(), "Collection written");
        Ok(())
    }
}

/// Per-collection locked access to a [`DataStore`].
pub struct Store<B> {
    backend: B,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<B: fmt::Debug> fmt::Debug for Store<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("backend", &self.backend).finish()
    }
}

impl<B: DataStore> Store<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, collection: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(collection.to_string()).or_default())
    }

    /// Run `f` over the collection's resources while holding its lock.
    /// The collection is written back when `f` reports a change.
    fn with_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Vec<Resource>) -> (T, bool),
    ) -> Result<T, StoreError> {
        let collection = normalize_collection(collection);
        let lock = self.lock_for(&collection);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut resources = self.backend.open(&collection)?;
        let (out, changed) = f(&mut resources);
        if changed {
            self.backend.write(&collection, &resources)?;
        }
        Ok(out)
    }

    pub fn get(&self, collection: &str, name: &str) -> Result<Option<Resource>, StoreError> {
        self.with_collection(collection, |items| {
            (items.iter().find(|r| r.is_named(name)).cloned(), false)
        })
    }

    /// Insert or replace by name. Replacing keeps the original `created_on`.
    pub fn save(&self, mut resource: Resource) -> Result<Resource, StoreError> {
        let collection = resource.collection.clone();
        self.with_collection(&collection, move |items| {
            match items.iter_mut().find(|r| r.is_named(&resource.name)) {
                Some(existing) => {
                    resource.created_on = existing.created_on;
                    resource.modified_on = Utc::now();
                    *existing = resource.clone();
                }
                None => items.push(resource.clone()),
            }
            (resource, true)
        })
    }

    pub fn delete(&self, collection: &str, name: &str) -> Result<Option<Resource>, StoreError> {
        self.with_collection(collection, |items| {
            match items.iter().position(|r| r.is_named(name)) {
                Some(idx) => (Some(items.remove(idx)), true),
                None => (None, false),
            }
        })
    }

    pub fn get_collection(&self, collection: &str) -> Result<Vec<Resource>, StoreError> {
        self.with_collection(collection, |items| (items.clone(), false))
    }

    /// Remove every resource of `collection` matching `remove` and return them.
    pub fn delete_where(
        &self,
        collection: &str,
        mut remove: impl FnMut(&Resource) -> bool,
    ) -> Result<Vec<Resource>, StoreError> {
        self.with_collection(collection, |items| {
            let (removed, kept): (Vec<_>, Vec<_>) = items.drain(..).partition(|r| remove(r));
            *items = kept;
            let changed = !removed.is_empty();
            (removed, changed)
        })
    }

    pub fn delete_collection(&self, collection: &str) -> Result<Vec<Resource>, StoreError> {
        self.delete_where(collection, |_| true)
    }
}

/// Shallow merge of `patch` into `target`; non-object patches replace.
pub fn merge_shallow(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(t), Value::Object(p)) => {
            for (k, v) in p {
                t.insert(k, v);
            }
        }
        (t, p) => {
            if !p.is_null() {
                *t = p;
            } else {
                warn!("Ignoring null merge patch");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exercise(store: &Store<impl DataStore>) {
        let fido = store
            .save(Resource::new("/pets", "Fido", json!({"type": "dog"})))
            .unwrap();
        store
            .save(Resource::new("/pets", "Tom", json!({"type": "cat"})))
            .unwrap();

        assert_eq!(store.get("/Pets/", "fido").unwrap().unwrap().data, json!({"type": "dog"}));
        assert_eq!(store.get_collection("/pets").unwrap().len(), 2);

        let updated = store
            .save(Resource::new("/pets", "fido", json!({"type": "wolf"})))
            .unwrap();
        assert_eq!(updated.created_on, fido.created_on);
        assert_eq!(store.get_collection("/pets").unwrap().len(), 2);

        let removed = store.delete("/pets", "FIDO").unwrap().unwrap();
        assert_eq!(removed.data, json!({"type": "wolf"}));
        assert!(store.delete("/pets", "fido").unwrap().is_none());

        assert_eq!(store.delete_collection("/pets").unwrap().len(), 1);
        assert!(store.get_collection("/pets").unwrap().is_empty());
    }

    #[test]
    fn test_memory_store() {
        exercise(&Store::new(MemoryDataStore::new()));
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileDataStore::new(dir.path().join("data")).unwrap();
        exercise(&Store::new(backend.clone()));

        let store = Store::new(backend.clone());
        store.save(Resource::new("/owners", "ann", json!(1))).unwrap();
        assert!(backend.file_for("/owners").exists());

        // A second store over the same directory sees the data.
        let reopened = Store::new(FileDataStore::new(backend.base_dir()).unwrap());
        assert_eq!(reopened.get("/owners", "ann").unwrap().unwrap().data, json!(1));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileDataStore::new(dir.path()).unwrap();
        fs::write(backend.file_for("/pets"), "not json").unwrap();
        let err = Store::new(backend).get_collection("/pets").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_merge_shallow() {
        let mut target = json!({"a": 1, "b": {"c": 2}});
        merge_shallow(&mut target, json!({"b": 3, "d": 4}));
        assert_eq!(target, json!({"a": 1, "b": 3, "d": 4}));
    }
}
