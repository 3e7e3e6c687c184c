//! API error types for the tracker client.
//!
//! Every failure a caller can see is one of these variants; operations
//! return them as values rather than panicking or returning bare nulls.

use thiserror::Error;

/// Errors that can occur when talking to the tracker API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input, caught locally or rejected by the server. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Authentication failed - invalid principal or secret, or an expired
    /// session the server refused.
    #[error("Authentication failed: check your principal and secret")]
    Unauthorized,

    /// Permission denied - the principal lacks access to the resource.
    #[error("Permission denied: you don't have access to this resource")]
    Forbidden,

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Rate limited by the tracker.
    #[error("Rate limited: please wait before retrying")]
    RateLimited,

    /// Tracker server error.
    #[error("Tracker server error: {0}")]
    Server(String),

    /// Connection-level failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected shape in an otherwise successful exchange, e.g. a success
    /// response whose body does not parse.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Create an error from an HTTP status code.
    pub fn from_status(status: u16, context: &str) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound(context.to_string()),
            429 => ApiError::RateLimited,
            400..=499 => ApiError::Validation(format!("HTTP {}: {}", status, context)),
            500..=599 => ApiError::Server(format!("HTTP {}: {}", status, context)),
            _ => ApiError::Internal(format!("Unexpected HTTP {}: {}", status, context)),
        }
    }

    /// Whether the request executor may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited | ApiError::Server(_) | ApiError::Network(_)
        )
    }

    /// Whether this is an authentication failure (401/403 class).
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_status_401() {
        let err = ApiError::from_status(401, "test");
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn test_error_from_status_403() {
        let err = ApiError::from_status(403, "test");
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[test]
    fn test_error_from_status_404() {
        let err = ApiError::from_status(404, "issue PROJ-123");
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "issue PROJ-123"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_error_from_status_429() {
        let err = ApiError::from_status(429, "test");
        assert!(matches!(err, ApiError::RateLimited));
    }

    #[test]
    fn test_error_from_status_400_is_validation() {
        let err = ApiError::from_status(400, "summary is required");
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("summary is required")),
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_error_from_status_422_is_validation() {
        let err = ApiError::from_status(422, "test");
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_error_from_status_500() {
        let err = ApiError::from_status(500, "test");
        assert!(matches!(err, ApiError::Server(_)));
    }

    #[test]
    fn test_error_from_status_unexpected() {
        let err = ApiError::from_status(302, "test");
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn test_retryable_classes() {
        assert!(ApiError::RateLimited.is_retryable());
        assert!(ApiError::Server("boom".to_string()).is_retryable());
        assert!(ApiError::Network("timeout".to_string()).is_retryable());
    }

    #[test]
    fn test_non_retryable_classes() {
        assert!(!ApiError::Unauthorized.is_retryable());
        assert!(!ApiError::Forbidden.is_retryable());
        assert!(!ApiError::NotFound("X".to_string()).is_retryable());
        assert!(!ApiError::Validation("bad".to_string()).is_retryable());
        assert!(!ApiError::Internal("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_auth_classes() {
        assert!(ApiError::Unauthorized.is_auth());
        assert!(ApiError::Forbidden.is_auth());
        assert!(!ApiError::RateLimited.is_auth());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Unauthorized;
        assert_eq!(
            err.to_string(),
            "Authentication failed: check your principal and secret"
        );

        let err = ApiError::NotFound("PROJ-123".to_string());
        assert_eq!(err.to_string(), "Resource not found: PROJ-123");
    }
}
