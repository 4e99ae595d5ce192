//! Error types for the Parse client.

use thiserror::Error;

/// Errors that can occur when interacting with a Parse Server.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The request lacked the privilege it needed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Object not found.
    #[error("object not found: {class_name}/{object_id}")]
    NotFound {
        class_name: String,
        object_id: String,
    },

    /// Invalid response from server.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Server answered with a 5xx status and no Parse error body.
    #[error("server unavailable ({status})")]
    Unavailable { status: u16 },

    /// Rate limited.
    #[error("rate limited{}", match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying (from Retry-After header, optional).
        retry_after_secs: Option<u64>,
    },

    /// Parse error body (`{"code": .., "error": ..}`).
    #[error("Parse error {code}: {message}")]
    Server { code: i64, message: String },
}

/// Parse error codes the client reacts to.
pub(crate) mod codes {
    pub const INTERNAL_SERVER_ERROR: i64 = 1;
    pub const CONNECTION_FAILED: i64 = 100;
    pub const OBJECT_NOT_FOUND: i64 = 101;
    pub const TIMEOUT: i64 = 124;
    pub const OPERATION_FORBIDDEN: i64 = 119;
}

impl ParseError {
    /// Whether the error is transient and worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Server { code, .. } => matches!(
                *code,
                codes::INTERNAL_SERVER_ERROR | codes::CONNECTION_FAILED | codes::TIMEOUT
            ),
            Self::Unavailable { .. } => true,
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let internal = ParseError::Server {
            code: codes::INTERNAL_SERVER_ERROR,
            message: "boom".to_string(),
        };
        assert!(internal.is_transient());
        assert!(ParseError::Unavailable { status: 503 }.is_transient());

        let forbidden = ParseError::Server {
            code: codes::OPERATION_FORBIDDEN,
            message: "unauthorized".to_string(),
        };
        assert!(!forbidden.is_transient());
        assert!(!ParseError::RateLimited { retry_after_secs: None }.is_transient());
    }

    #[test]
    fn test_rate_limited_message() {
        let err = ParseError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "rate limited (retry after 30s)");
        let err = ParseError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "rate limited");
    }
}
