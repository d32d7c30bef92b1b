//! Error types for docshard

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // === Collection Errors ===
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Document log error: {0}")]
    Log(String),

    #[cfg(feature = "sled-backend")]
    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    // === Registry Errors ===
    #[error("Could not connect to any storage node: {0}")]
    Connection(String),

    #[error("Node {index} ({address}) is unavailable")]
    NodeUnavailable { index: usize, address: String },

    #[error("Node index {index} out of range (node count {count})")]
    NodeOutOfRange { index: usize, count: usize },

    #[error("Node registry is closed")]
    RegistryClosed,

    /// A per-node failure surfaced through the store, tagged with the node ordinal.
    #[error("Node {node} failed: {source}")]
    Backend { node: usize, source: Box<Error> },

    // === Network Errors ===
    #[error("Node unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid node address: {0}")]
    InvalidAddress(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Wrap a failure coming from node `node`.
    pub fn backend(node: usize, source: Error) -> Self {
        match source {
            // already tagged
            Error::Backend { .. } => source,
            other => Error::Backend {
                node,
                source: Box::new(other),
            },
        }
    }

    /// Is this a retryable error?
    ///
    /// Nothing in docshard retries on its own; this is for callers that want to.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Unreachable(_) | Error::NodeUnavailable { .. } => true,
            Error::Backend { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Convert to HTTP status code (node API responses)
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::DuplicateKey(_) => StatusCode::CONFLICT,
            Error::InvalidKey(_) | Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::Unreachable(_) | Error::NodeUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::Backend { source, .. } => source.to_http_status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if e.is_connect() {
            Error::Unreachable(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_wrapping_keeps_first_node() {
        let err = Error::backend(1, Error::DuplicateKey("k".into()));
        let rewrapped = Error::backend(3, err);
        match rewrapped {
            Error::Backend { node, source } => {
                assert_eq!(node, 1);
                assert!(matches!(*source, Error::DuplicateKey(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_retryable() {
        assert!(Error::Timeout("slow".into()).is_retryable());
        assert!(Error::backend(0, Error::Unreachable("down".into())).is_retryable());
        assert!(!Error::Connection("none".into()).is_retryable());
        assert!(!Error::DuplicateKey("k".into()).is_retryable());
    }

    #[test]
    fn test_http_status() {
        use axum::http::StatusCode;
        assert_eq!(
            Error::DuplicateKey("k".into()).to_http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::InvalidKey("".into()).to_http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Log("bad".into()).to_http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
