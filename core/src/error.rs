//! Error types for the iCloud Bridge client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server rejected the request." All
//! other non-2xx responses land in `Api` with the status code and the
//! server's `reason`. A poll that never finishes is `Timeout`, kept apart
//! from `Api` even though it is produced by a run of 202 responses.

use thiserror::Error;

/// Errors returned by `BridgeClient` operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The server returned 404 for the requested path.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The server returned a non-2xx status other than 404.
    #[error("API error {status}: {reason}")]
    Api { status: u16, reason: String },

    /// The transport failed, or a success response could not be decoded.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The full-resolution image was still pending after every attempt.
    #[error("image download timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// A poll was cancelled through its `CancelToken`.
    #[error("image download cancelled")]
    Cancelled,

    /// The client detected a protocol violation or an unusable argument.
    #[error("{0}")]
    Client(String),

    /// The client configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self {
        BridgeError::Connection(err.0)
    }
}

impl From<MappingError> for BridgeError {
    fn from(err: MappingError) -> Self {
        BridgeError::Connection(format!("malformed response: {err}"))
    }
}

/// Failure reported by a `Transport` before any HTTP status was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A JSON value could not be mapped into a domain record: a required key is
/// missing or a value has the wrong shape.
#[derive(Debug, Error)]
#[error("cannot map {record}: {source}")]
pub struct MappingError {
    pub record: &'static str,
    #[source]
    pub source: serde_json::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_status_and_reason() {
        let err = BridgeError::Api {
            status: 400,
            reason: "Photo is not a video".to_string(),
        };
        assert_eq!(err.to_string(), "API error 400: Photo is not a video");
    }

    #[test]
    fn transport_errors_become_connection_errors() {
        let err: BridgeError = TransportError::new("connection refused").into();
        assert!(matches!(err, BridgeError::Connection(ref msg) if msg == "connection refused"));
    }

    #[test]
    fn mapping_errors_become_connection_errors() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err: BridgeError = MappingError { record: "Photo", source }.into();
        match err {
            BridgeError::Connection(msg) => assert!(msg.starts_with("malformed response: cannot map Photo")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
