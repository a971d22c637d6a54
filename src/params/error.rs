use http::StatusCode;
use std::fmt;

/// Longest slice of an offending value quoted in an error message.
pub const MAX_QUOTED_VALUE_LEN: usize = 35;

/// Error raised while parsing or validating a request parameter.
///
/// The `status` tells the caller who is at fault: 400/411 for bad client input,
/// 500 when the API document itself declares an unusable default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub status: u16,
    pub message: String,
}

impl ParseError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn length_required(message: impl Into<String>) -> Self {
        Self::new(411, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// `Error in <label>. "<value>" <suffix>`, quoting at most
    /// [`MAX_QUOTED_VALUE_LEN`] characters of the value.
    pub fn invalid_value(status: u16, label: &str, value: &str, suffix: &str) -> Self {
        Self::new(
            status,
            format!("Error in {label}. \"{}\" {suffix}", truncate(value)),
        )
    }

    /// Re-label the error with the parameter it belongs to, keeping the status.
    pub fn wrap_parameter(self, name: &str, location: impl fmt::Display) -> Self {
        Self {
            status: self.status,
            message: format!(
                "The \"{name}\" {location} parameter is invalid ({})",
                self.message
            ),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for ParseError {}

fn truncate(value: &str) -> String {
    if value.chars().count() > MAX_QUOTED_VALUE_LEN {
        let head: String = value.chars().take(MAX_QUOTED_VALUE_LEN).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_truncates() {
        let long = "x".repeat(40);
        let err = ParseError::invalid_value(400, "Name", &long, "is not valid");
        assert_eq!(
            err.message,
            format!("Error in Name. \"{}...\" is not valid", "x".repeat(35))
        );
    }

    #[test]
    fn test_wrap_keeps_status() {
        let err = ParseError::server_error("boom").wrap_parameter("Age", "query");
        assert_eq!(err.status, 500);
        assert_eq!(err.message, "The \"Age\" query parameter is invalid (boom)");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
