use thiserror::Error;

/// Errors raised while decoding the binary framing of words.
///
/// A framing error means the byte stream cannot be interpreted as a sequence of
/// length-prefixed words, either because a prefix uses an unknown marker or because
/// the data ends before the announced number of bytes.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum FramingError {
    /// The first byte of a length prefix has an unrecognized marker pattern.
    #[error("invalid length prefix marker {0:#04x}")]
    InvalidPrefix(u8),
    /// Fewer bytes were available than the prefix or word requires.
    #[error("truncated data: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Number of bytes required.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },
    /// A word announced a length above the configured limit.
    #[error("word of {len} bytes exceeds the limit of {max} bytes")]
    WordTooLong {
        /// Announced word length.
        len: u32,
        /// Configured maximum word length.
        max: u32,
    },
}

/// Failure while reading words or sentences from a stream.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The underlying stream failed or ended.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The bytes read are not valid framing.
    #[error(transparent)]
    Framing(#[from] FramingError),
}

impl ReadError {
    /// Whether the error means the peer is gone and no further sentence can arrive.
    pub fn is_end_of_stream(&self) -> bool {
        use std::io::ErrorKind;

        match self {
            ReadError::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
            ),
            ReadError::Framing(_) => false,
        }
    }
}

/// An error reported by the device in a `!trap` or `!fatal` reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProtocolError {
    /// The device supplied message, or a generic text when the reply carried none.
    pub message: String,
}

impl ProtocolError {
    /// Message used when a `!trap` or `!fatal` reply has no `message` attribute.
    pub const DEFAULT_MESSAGE: &'static str = "an error occurred";

    /// Creates an error from an optional device message.
    pub fn from_message(message: Option<&str>) -> Self {
        Self {
            message: message.unwrap_or(Self::DEFAULT_MESSAGE).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_end_of_stream_classification() {
        let eof = ReadError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(eof.is_end_of_stream());

        let reset = ReadError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(reset.is_end_of_stream());

        let timed_out = ReadError::from(io::Error::from(io::ErrorKind::TimedOut));
        assert!(!timed_out.is_end_of_stream());

        let framing = ReadError::from(FramingError::InvalidPrefix(0xF8));
        assert!(!framing.is_end_of_stream());
    }

    #[test]
    fn test_protocol_error_default_message() {
        assert_eq!(ProtocolError::from_message(None).message, "an error occurred");
        assert_eq!(
            ProtocolError::from_message(Some("no such command")).to_string(),
            "no such command"
        );
    }
}
