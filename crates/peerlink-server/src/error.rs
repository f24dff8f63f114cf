//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (bind, accept, read, write).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error (framing, decoding).
    #[error("protocol error: {0}")]
    Protocol(#[from] peerlink_protocol::ProtocolError),
}
