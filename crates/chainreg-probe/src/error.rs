//! Error types for network calls.
//!
//! These never escape a probe: [`EndpointProber`](crate::EndpointProber)
//! folds them into outcome enums. They are public so alternative
//! [`ChainNetwork`](crate::ChainNetwork) implementations can use them.

use thiserror::Error;

/// Result type alias for network calls.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors that can occur during a single network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The call did not complete within the probe timeout.
    #[error("timed out after {millis} ms")]
    Timeout {
        /// Timeout that expired, in milliseconds.
        millis: u64,
    },

    /// Connection refused, DNS failure, TLS failure and similar.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// JSON-RPC error object in the response.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// Response body could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None if err.is_decode() => Self::Malformed(err.to_string()),
            None => Self::Transport(err.to_string()),
        }
    }
}
