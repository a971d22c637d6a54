use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// One stored mock resource.
///
/// `collection` is a normalized path (`/pets`) and `name` is the last path
/// segment of the resource (`fido` in `/pets/fido`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub collection: String,
    pub name: String,
    pub data: Value,
    pub created_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
}

impl Resource {
    /// A resource in `collection`; an empty `name` gets a fresh ULID.
    pub fn new(collection: &str, name: &str, data: Value) -> Self {
        let now = Utc::now();
        let name = if name.is_empty() {
            Ulid::new().to_string()
        } else {
            name.to_string()
        };
        Self {
            collection: normalize_collection(collection),
            name,
            data,
            created_on: now,
            modified_on: now,
        }
    }

    /// Split a full resource path: `/pets/fido` is `fido` in `/pets`.
    pub fn from_path(path: &str, data: Value) -> Self {
        let (collection, name) = split_resource_path(path);
        Self::new(&collection, &name, data)
    }

    /// Full path of the resource
    pub fn path(&self) -> String {
        if self.collection == "/" {
            format!("/{}", self.name)
        } else {
            format!("{}/{}", self.collection, self.name)
        }
    }

    /// Resource names compare case-insensitively.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Leading slash, no trailing slash, lowercase.
pub fn normalize_collection(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{}", trimmed.to_ascii_lowercase())
}

/// `(collection, name)` for a resource path.
pub fn split_resource_path(path: &str) -> (String, String) {
    let trimmed = path.trim().trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => (
            normalize_collection(&trimmed[..idx]),
            trimmed[idx + 1..].to_string(),
        ),
        None => ("/".to_string(), trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_collection("Pets/"), "/pets");
        assert_eq!(normalize_collection("/api/Pets"), "/api/pets");
        assert_eq!(normalize_collection(""), "/");
    }

    #[test]
    fn test_from_path() {
        let r = Resource::from_path("/Pets/Fido/", json!({"a": 1}));
        assert_eq!(r.collection, "/pets");
        assert_eq!(r.name, "Fido");
        assert_eq!(r.path(), "/pets/Fido");
        assert!(r.is_named("fido"));
    }

    #[test]
    fn test_generated_name() {
        let r = Resource::new("/pets", "", json!({}));
        assert_eq!(r.name.len(), 26);
    }
}
