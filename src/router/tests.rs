use super::{Resolution, Router};
use crate::params::PathRegexCache;
use crate::spec::{Responses, RouteMeta};
use http::Method;
use std::sync::Arc;

fn route(method: Method, path: &str, base_path: &str) -> Arc<RouteMeta> {
    Arc::new(RouteMeta {
        method,
        path_pattern: path.to_string(),
        operation_id: Some(format!("op_{}", path.replace('/', "_"))),
        parameters: Vec::new(),
        consumes: Vec::new(),
        produces: Vec::new(),
        responses: Responses::new(),
        base_path: base_path.to_string(),
    })
}

fn router(routes: &[Arc<RouteMeta>]) -> Router {
    let full_paths: Vec<String> = routes.iter().map(|r| r.full_path()).collect();
    let cache = PathRegexCache::build(full_paths.iter().map(String::as_str));
    Router::new(routes, &cache)
}

#[test]
fn test_root_path() {
    let r = router(&[route(Method::GET, "/", "")]);
    assert!(matches!(r.resolve(&Method::GET, "/"), Resolution::Matched(_)));
}

#[test]
fn test_parameterized_path() {
    let r = router(&[route(Method::GET, "/pets/{PetName}", "")]);
    let Resolution::Matched(m) = r.resolve(&Method::GET, "/pets/Fido") else {
        panic!("expected a match");
    };
    assert_eq!(m.get_path_param("PetName"), Some("Fido"));
}

#[test]
fn test_literal_path_wins() {
    let r = router(&[
        route(Method::GET, "/pets/{id}", ""),
        route(Method::GET, "/pets/mine", ""),
    ]);
    let Resolution::Matched(m) = r.resolve(&Method::GET, "/pets/mine") else {
        panic!("expected a match");
    };
    assert_eq!(m.route.path_pattern, "/pets/mine");
    assert!(m.path_params.is_empty());
}

#[test]
fn test_base_path() {
    let r = router(&[route(Method::GET, "/pets", "/api/v1")]);
    assert_eq!(r.base_path(), "/api/v1");
    assert!(matches!(r.resolve(&Method::GET, "/api/v1/pets"), Resolution::Matched(_)));
    assert!(matches!(r.resolve(&Method::GET, "/pets"), Resolution::NotFound));
}

#[test]
fn test_method_not_allowed() {
    let r = router(&[
        route(Method::GET, "/pets", ""),
        route(Method::POST, "/pets", ""),
    ]);
    let Resolution::MethodNotAllowed { allow } = r.resolve(&Method::DELETE, "/pets") else {
        panic!("expected 405");
    };
    assert_eq!(allow, vec![Method::GET, Method::POST]);

    let err = r.route(&Method::DELETE, "/pets").unwrap_err();
    assert_eq!(err.status, 405);
    assert!(err.message.contains("GET, POST"));
}

#[test]
fn test_not_found() {
    let r = router(&[route(Method::GET, "/pets", "")]);
    let err = r.route(&Method::GET, "/owners").unwrap_err();
    assert_eq!(err.status, 404);
    assert_eq!(err.message, "Resource not found: /owners");
}

#[test]
fn test_operations_listing() {
    let r = router(&[
        route(Method::GET, "/pets", ""),
        route(Method::POST, "/pets", ""),
    ]);
    let ops = r.operations();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].1, "/pets");
}
