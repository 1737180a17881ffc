use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::auth::AuthError;
use crate::protocol::error::{FramingError, ProtocolError, ReadError};
use crate::session::SessionStatus;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connecting, reading or writing failed.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    /// The device sent bytes that are not valid framing.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    /// The device reported an error.
    #[error("device error: {0}")]
    Protocol(#[from] ProtocolError),
    /// Login failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// A deadline passed before the operation completed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The operation is not valid in the current session state.
    #[error("operation not allowed while the session is {0}")]
    InvalidState(SessionStatus),
    /// The host part of the address is not a valid TLS server name.
    #[cfg(feature = "tls")]
    #[error("invalid TLS server name: {0}")]
    ServerName(String),
}

impl From<ReadError> for ClientError {
    fn from(error: ReadError) -> Self {
        match error {
            ReadError::Io(e) => ClientError::Transport(e),
            ReadError::Framing(e) => ClientError::Framing(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_conversion() {
        let err = ClientError::from(ReadError::Framing(FramingError::InvalidPrefix(0xF9)));
        assert!(matches!(err, ClientError::Framing(FramingError::InvalidPrefix(0xF9))));

        let err = ClientError::from(ReadError::Io(io::ErrorKind::UnexpectedEof.into()));
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn test_display() {
        let err = ClientError::InvalidState(SessionStatus::Closed);
        assert_eq!(err.to_string(), "operation not allowed while the session is closed");

        let err = ClientError::from(AuthError::NoOutcome(4));
        assert_eq!(err.to_string(), "no login outcome after 4 sentences");
    }
}
