//! Document issue reporting and the request validation stage.

use crate::params::ParseError;
use crate::request::Request;
use crate::spec::{media_type_matches, RouteMeta};
use std::fmt;
use tracing::{error, warn};

/// A problem found while building routes from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub location: String,
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

pub fn print_issues(issues: &[ValidationIssue]) {
    eprintln!("\nAPI document validation failed. {} issue(s) found:\n", issues.len());
    for issue in issues {
        eprintln!("{issue}");
    }
}

/// Turn collected issues into an error naming every one of them.
pub fn fail_if_issues(issues: &[ValidationIssue]) -> anyhow::Result<()> {
    if issues.is_empty() {
        return Ok(());
    }
    for issue in issues {
        error!(kind = %issue.kind, location = %issue.location, "{}", issue.message);
    }
    let listed: Vec<String> = issues.iter().map(ToString::to_string).collect();
    anyhow::bail!(
        "API document has {} issue(s): {}",
        issues.len(),
        listed.join("; ")
    )
}

/// Request-level checks that do not belong to a single parameter.
///
/// - 415 when a body was sent with a content type the operation does not consume
/// - 413 when a body was sent to an operation that declares no body or form parameters
pub fn validate_request(route: &RouteMeta, request: &Request) -> Result<(), ParseError> {
    if !request.has_body_content() {
        return Ok(());
    }

    if !route.has_body_params() {
        warn!(method = %route.method, path = %route.path_pattern, "Body sent to operation without body parameters");
        return Err(ParseError::new(
            413,
            format!(
                "{} {} does not allow body content",
                route.method,
                route.full_path()
            ),
        ));
    }

    if let Some(content_type) = request.content_type() {
        if !route.consumes.is_empty()
            && !route
                .consumes
                .iter()
                .any(|accepted| media_type_matches(accepted, content_type))
        {
            return Err(ParseError::new(
                415,
                format!(
                    "{} {} does not allow Content-Type \"{content_type}\"",
                    route.method,
                    route.full_path()
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ParameterLocation, ParameterMeta, Responses};
    use http::Method;
    use serde_json::json;

    fn route(with_body: bool) -> RouteMeta {
        let mut parameters = Vec::new();
        if with_body {
            parameters.push(ParameterMeta::new("body", ParameterLocation::Body));
        }
        RouteMeta {
            method: Method::POST,
            path_pattern: "/pets".to_string(),
            operation_id: None,
            parameters,
            consumes: vec!["application/json".to_string()],
            produces: Vec::new(),
            responses: Responses::new(),
            base_path: String::new(),
        }
    }

    #[test]
    fn test_fail_if_issues() {
        assert!(fail_if_issues(&[]).is_ok());
        let err = fail_if_issues(&[ValidationIssue::new("/pets", "UnresolvedRef", "nope")]).unwrap_err();
        assert!(err.to_string().contains("[UnresolvedRef] /pets: nope"));
    }

    #[test]
    fn test_unsupported_media_type() {
        let req = Request::new(Method::POST, "/pets").with_body("text/plain", "hello");
        let err = validate_request(&route(true), &req).unwrap_err();
        assert_eq!(err.status, 415);

        let req = Request::new(Method::POST, "/pets").with_json(json!({"name": "Rex"}));
        assert!(validate_request(&route(true), &req).is_ok());
    }

    #[test]
    fn test_body_without_declaration() {
        let req = Request::new(Method::POST, "/pets").with_json(json!({"name": "Rex"}));
        let err = validate_request(&route(false), &req).unwrap_err();
        assert_eq!(err.status, 413);

        let empty = Request::new(Method::POST, "/pets").with_json(json!({}));
        assert!(validate_request(&route(false), &empty).is_ok());
    }
}
