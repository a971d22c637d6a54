//! Route table: request method and path to declared operation.

use crate::params::{ParseError, PathMatcher, PathRegexCache};
use crate::spec::RouteMeta;
use http::Method;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of successfully matching a request to an operation.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// Raw, percent-decoded path parameters in template order
    pub path_params: Vec<(String, String)>,
}

impl RouteMatch {
    /// Last occurrence wins when a template repeats a name.
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Outcome of [`Router::resolve`].
#[derive(Debug, Clone)]
pub enum Resolution {
    Matched(RouteMatch),
    /// The path exists but not for this method
    MethodNotAllowed { allow: Vec<Method> },
    NotFound,
}

#[derive(Debug, Clone)]
struct PathEntry {
    matcher: PathMatcher,
    operations: Vec<(Method, Arc<RouteMeta>)>,
}

/// Regex route table for one document snapshot.
///
/// Templates without parameters are tried before templated ones so
/// `/pets/mine` wins over `/pets/{id}`.
#[derive(Debug, Clone, Default)]
pub struct Router {
    entries: Vec<PathEntry>,
    base_path: String,
}

impl Router {
    /// Build the table from routes whose full paths are compiled in `paths`.
    #[must_use]
    pub fn new(routes: &[Arc<RouteMeta>], paths: &PathRegexCache) -> Self {
        let mut entries: Vec<PathEntry> = Vec::new();
        for route in routes {
            let full_path = route.full_path();
            if let Some(entry) = entries
                .iter_mut()
                .find(|e| e.matcher.template() == full_path)
            {
                entry.operations.push((route.method.clone(), Arc::clone(route)));
                continue;
            }
            let Some(matcher) = paths.get(&full_path) else {
                warn!(path = %full_path, "No compiled matcher for route, skipping");
                continue;
            };
            entries.push(PathEntry {
                matcher: matcher.clone(),
                operations: vec![(route.method.clone(), Arc::clone(route))],
            });
        }
        entries.sort_by_key(|e| e.matcher.names().len());

        let base_path = routes
            .first()
            .map(|r| r.base_path.clone())
            .unwrap_or_default();

        let routes_summary: Vec<String> = routes.iter().take(10).map(|r| r.key()).collect();
        info!(
            routes_count = routes.len(),
            paths_count = entries.len(),
            base_path = %base_path,
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self { entries, base_path }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// `(METHOD, full path, operationId)` for every operation.
    pub fn operations(&self) -> Vec<(Method, String, Option<String>)> {
        self.entries
            .iter()
            .flat_map(|e| {
                e.operations.iter().map(|(m, r)| {
                    (m.clone(), e.matcher.template().to_string(), r.operation_id.clone())
                })
            })
            .collect()
    }

    /// Print all registered routes to stdout.
    pub fn dump_routes(&self) {
        println!(
            "[routes] base_path={} count={}",
            self.base_path,
            self.entries.iter().map(|e| e.operations.len()).sum::<usize>()
        );
        for (method, path, operation_id) in self.operations() {
            println!(
                "[route] {method} {path} -> {}",
                operation_id.as_deref().unwrap_or("-")
            );
        }
    }

    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        debug!(method = %method, path = %path, "Route match attempt");

        let mut allow: Vec<Method> = Vec::new();
        for entry in &self.entries {
            let Some(path_params) = entry.matcher.extract(path) else {
                continue;
            };
            if let Some((_, route)) = entry.operations.iter().find(|(m, _)| m == method) {
                debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %route.path_pattern,
                    path_params = ?path_params,
                    "Route matched"
                );
                return Resolution::Matched(RouteMatch {
                    route: Arc::clone(route),
                    path_params,
                });
            }
            allow.extend(entry.operations.iter().map(|(m, _)| m.clone()));
        }

        if allow.is_empty() {
            warn!(method = %method, path = %path, "No route matched");
            Resolution::NotFound
        } else {
            warn!(method = %method, path = %path, allow = ?allow, "Method not allowed");
            Resolution::MethodNotAllowed { allow }
        }
    }

    /// [`resolve`](Self::resolve) with 404 and 405 as errors.
    pub fn route(&self, method: &Method, path: &str) -> Result<RouteMatch, ParseError> {
        match self.resolve(method, path) {
            Resolution::Matched(m) => Ok(m),
            Resolution::MethodNotAllowed { allow } => {
                let allowed: Vec<&str> = allow.iter().map(Method::as_str).collect();
                Err(ParseError::new(
                    405,
                    format!(
                        "{method} {path} is not allowed. Allowed methods: {}",
                        allowed.join(", ")
                    ),
                ))
            }
            Resolution::NotFound => Err(ParseError::new(404, format!("Resource not found: {path}"))),
        }
    }
}
