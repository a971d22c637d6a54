//! Path templates compiled to regexes, and the per-document cache of them.

use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A compiled `/pets/{name}/orders/{id}` template.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl PathMatcher {
    /// Compile a path template. Each `{param}` becomes a non-slash capture
    /// group; a trailing slash on the request path is optional.
    pub fn compile(template: &str) -> Result<Self, regex::Error> {
        let mut pattern = String::with_capacity(template.len() + 16);
        let mut names = Vec::with_capacity(template.matches('{').count());
        pattern.push('^');

        let mut rest = template.trim_end_matches('/');
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                break;
            };
            pattern.push_str(&regex::escape(&rest[..open]));
            pattern.push_str("([^/]+)");
            names.push(rest[open + 1..close].to_string());
            rest = &rest[close + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push_str("/?$");

        Ok(Self {
            template: template.to_string(),
            regex: Regex::new(&pattern)?,
            names,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Percent-decoded captures paired with their names, or `None` when the
    /// path does not match.
    pub fn extract(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    let raw = caps.get(i + 1)?.as_str();
                    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
                    Some((name.clone(), decoded.into_owned()))
                })
                .collect(),
        )
    }
}

/// Matchers for every path template of one document snapshot.
///
/// Built together with the snapshot and never mutated afterwards; a reload
/// builds a fresh cache.
#[derive(Debug, Clone, Default)]
pub struct PathRegexCache {
    matchers: HashMap<String, PathMatcher>,
}

impl PathRegexCache {
    pub fn build<'a>(templates: impl IntoIterator<Item = &'a str>) -> Self {
        let mut matchers = HashMap::new();
        for template in templates {
            if matchers.contains_key(template) {
                continue;
            }
            match PathMatcher::compile(template) {
                Ok(m) => {
                    matchers.insert(template.to_string(), m);
                }
                Err(e) => warn!(template = %template, error = %e, "Failed to compile path template"),
            }
        }
        debug!(templates = matchers.len(), "Path regex cache built");
        Self { matchers }
    }

    pub fn get(&self, template: &str) -> Option<&PathMatcher> {
        self.matchers.get(template)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Raw path parameter values for `path` under `template`. Empty when the
    /// template is unknown or does not match.
    pub fn extract(&self, template: &str, path: &str) -> Vec<(String, String)> {
        self.get(template)
            .and_then(|m| m.extract(path))
            .unwrap_or_default()
    }
}
