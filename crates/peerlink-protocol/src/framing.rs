//! CRLF framing for rendezvous messages.
//!
//! A frame is a verb line, zero or more `Key: value` header lines and a
//! blank-line terminator. QUIT is the one verb that may carry free-text
//! body lines in place of headers (`QUIT\r\nGoodbye!\r\n\r\n`); for every
//! other verb a line without a `:` separator is malformed.

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{Headers, Verb};

const CRLF: &str = "\r\n";

/// A decoded message frame: verb, ordered headers, optional QUIT body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The message verb.
    pub verb: Verb,
    /// Headers in the order they appeared (or will appear) on the wire.
    pub headers: Headers,
    /// Free-text body; only ever present on QUIT frames.
    pub body: Option<String>,
}

impl Frame {
    /// Creates a frame with no headers and no body.
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Creates a frame with the given headers.
    pub fn with_headers(verb: Verb, headers: Headers) -> Self {
        Self {
            verb,
            headers,
            body: None,
        }
    }
}

/// Encodes a frame to wire bytes.
///
/// Headers are written in insertion order; the caller is responsible for
/// keeping the result under [`MAX_MESSAGE_SIZE`] if the receiver is to see
/// all of it in one read.
pub fn encode(frame: &Frame) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(frame.verb.as_str());
    out.push_str(CRLF);
    for (name, value) in frame.headers.iter() {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str(CRLF);
    }
    if let Some(body) = &frame.body {
        out.push_str(body);
        out.push_str(CRLF);
    }
    out.push_str(CRLF);
    out.into_bytes()
}

/// Decodes one frame from wire bytes.
///
/// Header names and values are trimmed of surrounding whitespace; the
/// first `:` splits name from value, so values may contain further
/// colons. Anything after the blank-line terminator is ignored.
pub fn decode(data: &[u8]) -> ProtocolResult<Frame> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let text = std::str::from_utf8(data)?;
    let mut lines = text.split(CRLF);

    let verb_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line.trim(),
        _ => return Err(ProtocolError::MissingVerb),
    };
    let verb = Verb::parse(verb_line)?;

    let mut headers = Headers::new();
    let mut body_lines: Vec<&str> = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        match line.split_once(':') {
            Some((name, value)) => headers.insert(name.trim(), value.trim()),
            None if verb == Verb::Quit => body_lines.push(line),
            None => {
                return Err(ProtocolError::MalformedHeader {
                    line: line.to_string(),
                });
            }
        }
    }

    let body = if body_lines.is_empty() {
        None
    } else {
        Some(body_lines.join(CRLF))
    };

    Ok(Frame {
        verb,
        headers,
        body,
    })
}
