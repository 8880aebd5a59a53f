//! # Client Errors
//!
//! Purpose: Classify every failure the driver can surface so callers can tell
//! a broken transport from a framing violation from a server-side error reply.
//!
//! ## Design Principles
//! 1. **Typed Taxonomy**: One variant per failure class, no stringly errors.
//! 2. **Connection Fate**: `Io` and `Protocol` always mean the connection that
//!    produced them has been closed; `Server` never does.
//! 3. **Fail Fast**: Local validation errors are raised before any I/O.

use thiserror::Error;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while dialing, reading, writing or closing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// RESP framing or parse error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The authenticator rejected a freshly dialed connection.
    #[error("authentication failed")]
    AuthFailed,

    /// Server returned an error reply where a value was expected.
    #[error("server error: {message}")]
    Server { message: String },

    /// Reply shape did not match what the command returns.
    #[error("unexpected response: expected {expected}, found {found}")]
    UnexpectedResponse {
        expected: &'static str,
        found: &'static str,
    },

    /// Arguments were rejected locally, nothing was sent.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// `EXEC` returned nil because a watched key changed.
    #[error("transaction aborted")]
    TransactionAborted,

    /// The held connection was closed by an earlier failure.
    #[error("connection closed")]
    ConnectionClosed,

    /// Address could not be resolved into a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl ClientError {
    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        ClientError::Protocol(reason.into())
    }

    /// Returns true when the error left the originating connection unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::Io(_) | ClientError::Protocol(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: ClientError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, ClientError::Io(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn server_errors_are_not_fatal() {
        let err = ClientError::Server {
            message: "ERR wrong type".to_string(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "server error: ERR wrong type");
    }
}
