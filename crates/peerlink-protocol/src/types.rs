//! Verbs, headers, and the typed message layer.

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};
use crate::framing::{self, Frame};

/// Well-known header names.
pub mod header {
    /// Client identifier, the registry key.
    pub const CLIENT_ID: &str = "clientID";
    /// Advertised IP address.
    pub const IP: &str = "IP";
    /// Advertised TCP port.
    pub const PORT: &str = "Port";
    /// Registration status marker (REGACK).
    pub const STATUS: &str = "Status";
    /// Chat payload (CHAT).
    pub const MESSAGE: &str = "MESSAGE";
}

/// The six message verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Client registers its address with the server.
    Register,
    /// Server acknowledges a registration.
    RegAck,
    /// Client asks the server for a peer.
    Bridge,
    /// Server answers with a peer address, possibly empty.
    BridgeAck,
    /// Peer-to-peer chat payload.
    Chat,
    /// Orderly termination of a chat connection.
    Quit,
}

impl Verb {
    /// The wire spelling of this verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::RegAck => "REGACK",
            Self::Bridge => "BRIDGE",
            Self::BridgeAck => "BRIDGEACK",
            Self::Chat => "CHAT",
            Self::Quit => "QUIT",
        }
    }

    /// Parses a verb line.
    pub fn parse(s: &str) -> ProtocolResult<Self> {
        match s {
            "REGISTER" => Ok(Self::Register),
            "REGACK" => Ok(Self::RegAck),
            "BRIDGE" => Ok(Self::Bridge),
            "BRIDGEACK" => Ok(Self::BridgeAck),
            "CHAT" => Ok(Self::Chat),
            "QUIT" => Ok(Self::Quit),
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered header map.
///
/// Lookup is case-sensitive, matching the wire exactly. An absent header
/// reads as the empty string, which doubles as the "no peer" sentinel in
/// BRIDGEACK.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing an existing one in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    /// Returns the header value, or the empty string if absent.
    pub fn get(&self, name: &str) -> &str {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Iterates headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns true if no headers are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A peer's advertised address, as handed out by BRIDGEACK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    /// The peer's registered identifier.
    pub client_id: String,
    /// The peer's advertised IP.
    pub ip: String,
    /// The peer's advertised port.
    pub port: u16,
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.client_id, self.ip, self.port)
    }
}

/// A typed protocol message, one variant per verb.
///
/// Conversion from a raw [`Frame`] enforces the per-verb required
/// headers; the raw layer stays tolerant so that consumers like the
/// server can apply their own validation rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// REGISTER: advertise this client's address.
    Register {
        /// Registry key.
        client_id: String,
        /// Advertised IP.
        ip: String,
        /// Advertised port.
        port: u16,
    },
    /// REGACK: registration acknowledged.
    RegAck {
        /// Echoed registry key.
        client_id: String,
        /// Stored IP.
        ip: String,
        /// Stored port.
        port: u16,
        /// Status marker, `registered` on success.
        status: String,
    },
    /// BRIDGE: ask for a peer.
    Bridge {
        /// The requester's identifier.
        client_id: String,
    },
    /// BRIDGEACK: the peer to connect to, if any.
    BridgeAck {
        /// `None` when no other client is registered yet.
        peer: Option<PeerAddr>,
    },
    /// CHAT: one line of conversation.
    Chat {
        /// Free-text payload.
        text: String,
    },
    /// QUIT: orderly termination.
    Quit {
        /// Free-text farewell carried in the body.
        farewell: String,
    },
}

fn required(headers: &Headers, name: &'static str) -> ProtocolResult<String> {
    let value = headers.get(name);
    if value.is_empty() {
        return Err(ProtocolError::MissingHeader { name });
    }
    Ok(value.to_string())
}

fn required_port(headers: &Headers, name: &'static str) -> ProtocolResult<u16> {
    let value = required(headers, name)?;
    value
        .parse::<u16>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or(ProtocolError::InvalidHeader { name, value })
}

impl Message {
    /// The verb of this message.
    pub fn verb(&self) -> Verb {
        match self {
            Self::Register { .. } => Verb::Register,
            Self::RegAck { .. } => Verb::RegAck,
            Self::Bridge { .. } => Verb::Bridge,
            Self::BridgeAck { .. } => Verb::BridgeAck,
            Self::Chat { .. } => Verb::Chat,
            Self::Quit { .. } => Verb::Quit,
        }
    }

    /// Lowers this message to a raw frame.
    pub fn to_frame(&self) -> Frame {
        let mut frame = Frame::new(self.verb());
        match self {
            Self::Register {
                client_id,
                ip,
                port,
            } => {
                frame.headers.insert(header::CLIENT_ID, client_id.clone());
                frame.headers.insert(header::IP, ip.clone());
                frame.headers.insert(header::PORT, port.to_string());
            }
            Self::RegAck {
                client_id,
                ip,
                port,
                status,
            } => {
                frame.headers.insert(header::CLIENT_ID, client_id.clone());
                frame.headers.insert(header::IP, ip.clone());
                frame.headers.insert(header::PORT, port.to_string());
                frame.headers.insert(header::STATUS, status.clone());
            }
            Self::Bridge { client_id } => {
                frame.headers.insert(header::CLIENT_ID, client_id.clone());
            }
            Self::BridgeAck { peer } => match peer {
                Some(peer) => {
                    frame.headers.insert(header::CLIENT_ID, peer.client_id.clone());
                    frame.headers.insert(header::IP, peer.ip.clone());
                    frame.headers.insert(header::PORT, peer.port.to_string());
                }
                // Empty values are the "no peer yet" sentinel.
                None => {
                    frame.headers.insert(header::CLIENT_ID, "");
                    frame.headers.insert(header::IP, "");
                    frame.headers.insert(header::PORT, "");
                }
            },
            Self::Chat { text } => {
                frame.headers.insert(header::MESSAGE, text.clone());
            }
            Self::Quit { farewell } => {
                if !farewell.is_empty() {
                    frame.body = Some(farewell.clone());
                }
            }
        }
        frame
    }

    /// Lifts a raw frame into a typed message, enforcing required headers.
    pub fn from_frame(frame: Frame) -> ProtocolResult<Self> {
        let headers = &frame.headers;
        match frame.verb {
            Verb::Register => Ok(Self::Register {
                client_id: required(headers, header::CLIENT_ID)?,
                ip: required(headers, header::IP)?,
                port: required_port(headers, header::PORT)?,
            }),
            Verb::RegAck => Ok(Self::RegAck {
                client_id: required(headers, header::CLIENT_ID)?,
                ip: required(headers, header::IP)?,
                port: required_port(headers, header::PORT)?,
                status: required(headers, header::STATUS)?,
            }),
            Verb::Bridge => Ok(Self::Bridge {
                client_id: required(headers, header::CLIENT_ID)?,
            }),
            Verb::BridgeAck => {
                if headers.get(header::CLIENT_ID).is_empty() {
                    Ok(Self::BridgeAck { peer: None })
                } else {
                    Ok(Self::BridgeAck {
                        peer: Some(PeerAddr {
                            client_id: required(headers, header::CLIENT_ID)?,
                            ip: required(headers, header::IP)?,
                            port: required_port(headers, header::PORT)?,
                        }),
                    })
                }
            }
            // Chat tolerates a missing MESSAGE header as an empty line.
            Verb::Chat => Ok(Self::Chat {
                text: headers.get(header::MESSAGE).to_string(),
            }),
            Verb::Quit => Ok(Self::Quit {
                farewell: frame.body.unwrap_or_default(),
            }),
        }
    }

    /// Encodes this message to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        framing::encode(&self.to_frame())
    }

    /// Decodes wire bytes into a typed message.
    pub fn decode(data: &[u8]) -> ProtocolResult<Self> {
        Self::from_frame(framing::decode(data)?)
    }
}
