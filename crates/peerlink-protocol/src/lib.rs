//! Wire framing and typed messages for the rendezvous protocol.
//!
//! Every message exchanged in the system — client↔server and peer↔peer —
//! uses the same line-oriented format: a verb line, zero or more
//! `Key: value` header lines, then one blank line, all CRLF-separated.
//!
//! ```text
//! REGISTER\r\n
//! clientID: alice\r\n
//! IP: 127.0.0.1\r\n
//! Port: 5001\r\n
//! \r\n
//! ```
//!
//! Two layers are provided:
//!
//! - [`encode`]/[`decode`] move between bytes and a raw [`Frame`]
//!   (verb + ordered headers + optional QUIT body) without judging
//!   whether the headers make sense.
//! - [`Message`] is the typed layer: one variant per verb, with
//!   per-verb required headers enforced when converting from a frame.
//!
//! # Example
//!
//! ```rust
//! use peerlink_protocol::Message;
//!
//! let msg = Message::Bridge { client_id: "alice".into() };
//! let bytes = msg.encode();
//! assert_eq!(Message::decode(&bytes).unwrap(), msg);
//! ```

mod error;
mod framing;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{Frame, decode, encode};
pub use types::{Headers, Message, PeerAddr, Verb, header};

/// Status value carried by a successful REGACK.
pub const STATUS_REGISTERED: &str = "registered";

/// Farewell body sent with an orderly QUIT.
pub const QUIT_FAREWELL: &str = "Goodbye!";

/// Maximum message size in bytes.
///
/// Both ends read one message with a single bounded read of this size;
/// a larger message is cut off on the wire rather than reassembled.
pub const MAX_MESSAGE_SIZE: usize = 1024;
