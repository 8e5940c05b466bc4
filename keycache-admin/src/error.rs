//! Administrative error handling.

use serde::Serialize;
use thiserror::Error;

use keycache_core::error::KeyCacheError;

/// Error returned by the `cache-config` path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    /// The request was malformed or asked for an invalid configuration.
    ///
    /// Displays as the bare message so it can be returned to clients verbatim.
    #[error("{0}")]
    InvalidRequest(String),

    /// The request was valid but the mount failed to apply it.
    #[error("internal error: {0}")]
    Internal(KeyCacheError),
}

impl AdminError {
    /// Invalid request with the given message.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        AdminError::InvalidRequest(message.into())
    }

    /// HTTP-style status code for the routing layer.
    pub fn status_code(&self) -> u16 {
        match self {
            AdminError::InvalidRequest(_) => 400,
            AdminError::Internal(_) => 500,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AdminError::InvalidRequest(_) => "INVALID_REQUEST",
            AdminError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Response body for this error.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            AdminError::InvalidRequest(message) => message.clone(),
            AdminError::Internal(_) => "An internal error occurred".to_string(),
        };
        ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message,
            },
        }
    }
}

impl From<KeyCacheError> for AdminError {
    fn from(err: KeyCacheError) -> Self {
        match err {
            KeyCacheError::InvalidConfiguration(message) | KeyCacheError::ConfigError(message) => {
                AdminError::InvalidRequest(message)
            }
            other => {
                tracing::error!(error = %other, "Internal error");
                AdminError::Internal(other)
            }
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_displays_bare_message() {
        let err = AdminError::invalid_request("unknown cache-type fifo");
        assert_eq!(err.to_string(), "unknown cache-type fifo");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_configuration_errors_become_client_errors() {
        let err = AdminError::from(KeyCacheError::InvalidConfiguration("bad size".into()));
        assert_eq!(err, AdminError::InvalidRequest("bad size".into()));
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = AdminError::from(KeyCacheError::StoreError("disk poisoned".into()));
        assert_eq!(err.status_code(), 500);

        let json = serde_json::to_value(err.to_response()).unwrap();
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert!(!json.to_string().contains("poisoned"));
    }
}
