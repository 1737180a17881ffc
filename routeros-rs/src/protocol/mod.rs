use std::fmt::{self, Display, Formatter};

use hashbrown::HashMap;

use error::ProtocolError;
use sentence::Sentence;

/// Module containing the streaming word and sentence reader/writer.
pub mod codec;
/// Module containing the error types for framing and device errors.
pub mod error;
/// Module containing the variable-width length prefix codec.
pub mod length;
/// Module converting API query tokens into console command lines.
pub mod normalize;
/// Module containing the sentence model.
pub mod sentence;
/// Module containing the word classifier.
pub mod word;

/// Correlation tag linking a command to its replies.
pub type Tag = u32;

/// The kind of a reply sentence, taken from its leading `!` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// `!re`: one row of data. Zero or more precede the terminal reply.
    Reply,
    /// `!done`: the command completed, possibly with trailing attributes.
    Done,
    /// `!empty`: the command completed without rows.
    Empty,
    /// `!trap`: the command failed; the connection stays usable.
    Trap,
    /// `!fatal`: the connection is about to be closed by the device.
    Fatal,
}

impl ReplyKind {
    /// Parses a category word such as `!done`.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "!re" => Some(Self::Reply),
            "!done" => Some(Self::Done),
            "!empty" => Some(Self::Empty),
            "!trap" => Some(Self::Trap),
            "!fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// The category word of this kind.
    pub fn as_marker(&self) -> &'static str {
        match self {
            Self::Reply => "!re",
            Self::Done => "!done",
            Self::Empty => "!empty",
            Self::Trap => "!trap",
            Self::Fatal => "!fatal",
        }
    }

    /// Whether this kind ends the reply stream of a command.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Reply)
    }

    /// Whether this kind reports an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Trap | Self::Fatal)
    }
}

impl Display for ReplyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_marker())
    }
}

/// A reply delivered to the caller of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The kind of the reply.
    pub kind: ReplyKind,
    /// The attributes of the reply, without the `.tag` entry.
    pub data: HashMap<String, String>,
    /// Set for `!trap` and `!fatal` replies.
    pub error: Option<ProtocolError>,
}

impl Reply {
    /// Builds a reply of `kind` from a received sentence.
    pub fn from_sentence(kind: ReplyKind, sentence: Sentence) -> Self {
        let error = kind
            .is_error()
            .then(|| ProtocolError::from_message(sentence.message()));
        Self {
            kind,
            data: sentence.into_data(),
            error,
        }
    }

    /// A `!fatal` reply produced locally, e.g. when the connection is lost.
    pub fn fatal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ReplyKind::Fatal,
            data: HashMap::from([("message".to_string(), message.clone())]),
            error: Some(ProtocolError { message }),
        }
    }

    /// Returns the value of an attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Whether this reply ends the reply stream of its command.
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Turns the reply into a `Result`, yielding the device error of `!trap`/`!fatal`.
    pub fn into_result(self) -> Result<Self, ProtocolError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}
