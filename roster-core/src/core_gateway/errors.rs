//! Error types for gateway calls

use std::time::Duration;
use thiserror::Error;

/// Result type for gateway operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Transport or protocol failure of a single request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// No correlated response arrived in time
    #[error("Request {request} timed out after {after:?}")]
    Timeout { request: String, after: Duration },

    /// The transport could not carry the request
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with an error
    #[error("Protocol error {code}: {message}")]
    Protocol { code: i32, message: String },

    /// The server answered with a response of another kind
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: String,
    },

    /// A frame could not be encoded or decoded
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// The gateway shut down while the request was in flight
    #[error("Gateway closed")]
    Closed,
}

impl RpcError {
    /// Timeouts are recoverable; callers may retry at a higher layer
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout { .. })
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Malformed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RpcError::Protocol {
            code: -32601,
            message: "Method not found".to_string(),
        };
        assert_eq!(err.to_string(), "Protocol error -32601: Method not found");

        let err = RpcError::Timeout {
            request: "mute".to_string(),
            after: Duration::from_secs(5),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("mute"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err: RpcError = json_err.into();
        assert!(matches!(err, RpcError::Malformed(_)));
    }
}
