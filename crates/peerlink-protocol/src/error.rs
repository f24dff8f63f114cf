//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Message exceeds the bounded read size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Input was empty or did not start with a verb line.
    #[error("missing verb line")]
    MissingVerb,

    /// Verb line did not name a known verb.
    #[error("unknown verb: {0:?}")]
    UnknownVerb(String),

    /// A header line had no `:` separator.
    #[error("malformed header line: {line:?}")]
    MalformedHeader { line: String },

    /// A required header was absent or empty.
    #[error("missing required header: {name}")]
    MissingHeader { name: &'static str },

    /// A header value failed to parse (e.g. a non-numeric port).
    #[error("invalid value for header {name}: {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    /// Message bytes were not valid UTF-8.
    #[error("message is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
