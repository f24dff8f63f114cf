//! Request dispatch.
//!
//! Decodes one request and routes it by verb against the registry.
//! Invalid or unrecognized requests are logged and dropped without a
//! reply, per the protocol's silent-drop rule; only well-formed
//! REGISTER and BRIDGE requests produce a response.

use std::net::SocketAddr;

use tracing::{debug, info, warn};

use peerlink_protocol::{Headers, Message, PeerAddr, STATUS_REGISTERED, Verb, decode, header};

use crate::registry::Registry;

/// State owned by the server's event loop.
#[derive(Debug, Default)]
pub struct ServerState {
    registry: Registry,
}

impl ServerState {
    /// Creates empty server state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handles one raw request from `source`.
    ///
    /// Returns the encoded response, or `None` when the request is
    /// dropped without a reply.
    pub fn handle_request(&mut self, data: &[u8], source: SocketAddr) -> Option<Vec<u8>> {
        let frame = match decode(data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%source, error = %e, "dropping malformed request");
                return None;
            }
        };

        match frame.verb {
            Verb::Register => self.handle_register(&frame.headers, source),
            Verb::Bridge => self.handle_bridge(&frame.headers),
            other => {
                warn!(%source, verb = %other, "dropping unexpected verb");
                None
            }
        }
    }

    /// REGISTER: validate, store, acknowledge.
    ///
    /// The IP header may be absent; the connection's source address is
    /// stored in its place. A missing clientID or an unusable Port
    /// drops the request.
    fn handle_register(&mut self, headers: &Headers, source: SocketAddr) -> Option<Vec<u8>> {
        let client_id = headers.get(header::CLIENT_ID);
        let ip = match headers.get(header::IP) {
            "" => source.ip().to_string(),
            ip => ip.to_string(),
        };
        if client_id.is_empty() {
            warn!(%source, "REGISTER without clientID, dropping");
            return None;
        }
        let port = headers.get(header::PORT);
        let Some(port) = port.parse::<u16>().ok().filter(|p| *p > 0) else {
            warn!(%source, client_id, port, "REGISTER with unusable Port, dropping");
            return None;
        };

        self.registry.register(client_id, ip.clone(), port);
        info!(client_id, %ip, port, "registered");

        let ack = Message::RegAck {
            client_id: client_id.to_string(),
            ip,
            port,
            status: STATUS_REGISTERED.to_string(),
        };
        Some(ack.encode())
    }

    /// BRIDGE: pair the requester with the first other registered
    /// client, or answer with the empty sentinel when there is none.
    /// A request without a clientID, or from an unregistered client,
    /// is dropped.
    fn handle_bridge(&self, headers: &Headers) -> Option<Vec<u8>> {
        let client_id = headers.get(header::CLIENT_ID);
        if client_id.is_empty() {
            warn!("BRIDGE without clientID, dropping");
            return None;
        }
        if !self.registry.contains(client_id) {
            warn!(client_id, "BRIDGE from unregistered client, dropping");
            return None;
        }

        let peer = self.registry.find_peer(client_id).map(|r| PeerAddr {
            client_id: r.client_id.clone(),
            ip: r.ip.clone(),
            port: r.port,
        });
        match &peer {
            Some(peer) => info!(client_id, peer = %peer, "bridged"),
            None => debug!(client_id, "bridge requested, no peer available"),
        }

        Some(Message::BridgeAck { peer }.encode())
    }

    /// Renders the `/info` control-command listing.
    pub fn info_listing(&self) -> String {
        let mut out = format!("Registered clients ({}):\n", self.registry.len());
        for r in self.registry.iter() {
            out.push_str(&format!("{} {}:{}\n", r.client_id, r.ip, r.port));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn register(state: &mut ServerState, id: &str, port: u16) -> Option<Message> {
        let request = Message::Register {
            client_id: id.to_string(),
            ip: "127.0.0.1".to_string(),
            port,
        };
        state
            .handle_request(&request.encode(), source())
            .map(|bytes| Message::decode(&bytes).unwrap())
    }

    fn bridge(state: &mut ServerState, id: &str) -> Option<Message> {
        let request = Message::Bridge {
            client_id: id.to_string(),
        };
        state
            .handle_request(&request.encode(), source())
            .map(|bytes| Message::decode(&bytes).unwrap())
    }

    #[test]
    fn register_is_acknowledged_with_status() {
        let mut state = ServerState::new();
        let reply = register(&mut state, "alice", 5001).unwrap();
        assert_eq!(
            reply,
            Message::RegAck {
                client_id: "alice".into(),
                ip: "127.0.0.1".into(),
                port: 5001,
                status: "registered".into(),
            }
        );
    }

    #[test]
    fn register_without_ip_uses_source_address() {
        let mut state = ServerState::new();
        let reply = state.handle_request(
            b"REGISTER\r\nclientID: alice\r\nPort: 5001\r\n\r\n",
            "10.0.0.7:40000".parse().unwrap(),
        );
        let reply = Message::decode(&reply.unwrap()).unwrap();
        assert_eq!(
            reply,
            Message::RegAck {
                client_id: "alice".into(),
                ip: "10.0.0.7".into(),
                port: 5001,
                status: "registered".into(),
            }
        );
        assert_eq!(state.registry().get("alice").unwrap().ip, "10.0.0.7");
    }

    #[test]
    fn register_missing_client_id_is_dropped() {
        let mut state = ServerState::new();
        let reply = state.handle_request(b"REGISTER\r\nIP: 127.0.0.1\r\nPort: 5001\r\n\r\n", source());
        assert!(reply.is_none());
        assert!(state.registry().is_empty());
    }

    #[test]
    fn register_unparsable_port_is_dropped() {
        let mut state = ServerState::new();
        let reply = state.handle_request(
            b"REGISTER\r\nclientID: alice\r\nIP: 127.0.0.1\r\nPort: nope\r\n\r\n",
            source(),
        );
        assert!(reply.is_none());
    }

    #[test]
    fn bridge_lone_client_gets_empty_ack() {
        let mut state = ServerState::new();
        register(&mut state, "alice", 5001).unwrap();
        let reply = bridge(&mut state, "alice").unwrap();
        assert_eq!(reply, Message::BridgeAck { peer: None });
    }

    #[test]
    fn bridge_pairs_two_clients_with_each_other() {
        let mut state = ServerState::new();
        register(&mut state, "alice", 5001).unwrap();
        register(&mut state, "bob", 5002).unwrap();

        let Some(Message::BridgeAck { peer: Some(peer) }) = bridge(&mut state, "alice") else {
            panic!("expected a populated BRIDGEACK");
        };
        assert_eq!(peer.client_id, "bob");
        assert_eq!(peer.port, 5002);

        let Some(Message::BridgeAck { peer: Some(peer) }) = bridge(&mut state, "bob") else {
            panic!("expected a populated BRIDGEACK");
        };
        assert_eq!(peer.client_id, "alice");
        assert_eq!(peer.port, 5001);
    }

    #[test]
    fn bridge_from_unregistered_client_is_dropped() {
        let mut state = ServerState::new();
        register(&mut state, "bob", 5002).unwrap();
        assert!(bridge(&mut state, "mallory").is_none());
    }

    #[test]
    fn bridge_without_client_id_is_dropped() {
        let mut state = ServerState::new();
        register(&mut state, "alice", 5001).unwrap();
        assert!(state.handle_request(b"BRIDGE\r\n\r\n", source()).is_none());
    }

    #[test]
    fn unexpected_verb_is_dropped() {
        let mut state = ServerState::new();
        let reply = state.handle_request(b"CHAT\r\nMESSAGE: hi\r\n\r\n", source());
        assert!(reply.is_none());
    }

    #[test]
    fn malformed_request_is_dropped() {
        let mut state = ServerState::new();
        assert!(state.handle_request(b"", source()).is_none());
        assert!(state.handle_request(b"NONSENSE\r\n\r\n", source()).is_none());
    }

    #[test]
    fn info_listing_format() {
        let mut state = ServerState::new();
        register(&mut state, "alice", 5001).unwrap();
        register(&mut state, "bob", 5002).unwrap();
        assert_eq!(
            state.info_listing(),
            "Registered clients (2):\nalice 127.0.0.1:5001\nbob 127.0.0.1:5002\n"
        );
    }
}
