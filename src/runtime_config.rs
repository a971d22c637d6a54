//! # Runtime Configuration Module
//!
//! Environment-based settings for the mock runtime. CLI flags override these.
//!
//! ## Environment Variables
//!
//! ### `OASMOCK_DATA_DIR`
//!
//! Directory for the file-backed mock store, one JSON file per collection.
//! Unset keeps mock data in memory.
//!
//! ### `OASMOCK_MOCK`
//!
//! Answer requests from the mock engine (`on`/`off`). Default: on.
//!
//! ### `OASMOCK_SCHEMA_VALIDATION`
//!
//! Validate parsed parameters against their JSON schema (`on`/`off`).
//! Default: on.
//!
//! ### `OASMOCK_WATCH`
//!
//! Reload the document when the file changes (`on`/`off`). Default: off.
//!
//! ## Usage
//!
//! ```rust
//! use oasmock::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("mock enabled: {}", config.mock);
//! ```

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub data_dir: Option<PathBuf>,
    pub mock: bool,
    pub schema_validation: bool,
    pub watch: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            mock: true,
            schema_validation: true,
            watch: false,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(default)
        };
        Self {
            data_dir: lookup("OASMOCK_DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            mock: flag("OASMOCK_MOCK", defaults.mock),
            schema_validation: flag("OASMOCK_SCHEMA_VALIDATION", defaults.schema_validation),
            watch: flag("OASMOCK_WATCH", defaults.watch),
        }
    }
}

/// `on/off`, `true/false`, `yes/no`, `1/0`; anything else is `None`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(RuntimeConfig::from_lookup(|_| None), RuntimeConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = RuntimeConfig::from_lookup(|key| match key {
            "OASMOCK_DATA_DIR" => Some("/tmp/mockdata".to_string()),
            "OASMOCK_MOCK" => Some("off".to_string()),
            "OASMOCK_SCHEMA_VALIDATION" => Some("0".to_string()),
            "OASMOCK_WATCH" => Some("TRUE".to_string()),
            _ => None,
        });
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/mockdata")));
        assert!(!config.mock);
        assert!(!config.schema_validation);
        assert!(config.watch);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
