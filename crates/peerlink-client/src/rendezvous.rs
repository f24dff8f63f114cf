//! Rendezvous exchanges with the server.
//!
//! Every exchange opens its own short-lived connection: connect, send
//! one request, read one bounded response, close. The server never
//! keeps a connection open across requests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use peerlink_protocol::{MAX_MESSAGE_SIZE, Message, PeerAddr, STATUS_REGISTERED};

use crate::error::{ClientError, ClientResult};

/// Client side of the REGISTER/BRIDGE request-response protocol.
pub struct RendezvousClient {
    server_addr: SocketAddr,
    timeout: Duration,
}

impl RendezvousClient {
    /// Creates a rendezvous client for the given server.
    pub fn new(server_addr: SocketAddr, timeout: Duration) -> Self {
        Self {
            server_addr,
            timeout,
        }
    }

    /// The server this client talks to.
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Registers this client's advertised address with the server.
    pub async fn register(&self, client_id: &str, ip: &str, port: u16) -> ClientResult<()> {
        let request = Message::Register {
            client_id: client_id.to_string(),
            ip: ip.to_string(),
            port,
        };
        match self.exchange(&request).await? {
            Message::RegAck { status, .. } if status == STATUS_REGISTERED => Ok(()),
            Message::RegAck { status, .. } => Err(ClientError::Protocol(format!(
                "server answered REGISTER with status {status:?}"
            ))),
            other => Err(ClientError::Protocol(format!(
                "expected REGACK, got {}",
                other.verb()
            ))),
        }
    }

    /// Asks the server for a peer. `Ok(None)` means no other client is
    /// registered yet and this client should wait for an incoming
    /// connection.
    pub async fn bridge(&self, client_id: &str) -> ClientResult<Option<PeerAddr>> {
        let request = Message::Bridge {
            client_id: client_id.to_string(),
        };
        match self.exchange(&request).await? {
            Message::BridgeAck { peer } => Ok(peer),
            other => Err(ClientError::Protocol(format!(
                "expected BRIDGEACK, got {}",
                other.verb()
            ))),
        }
    }

    /// One request-response round trip over a fresh connection, every
    /// step bounded by the configured timeout.
    async fn exchange(&self, request: &Message) -> ClientResult<Message> {
        debug!(server = %self.server_addr, verb = %request.verb(), "connecting to server");

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| {
                ClientError::Timeout(format!(
                    "connecting to server {} after {}s",
                    self.server_addr,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                ClientError::Connection(format!(
                    "failed to connect to server {}: {}",
                    self.server_addr, e
                ))
            })?;

        tokio::time::timeout(self.timeout, async {
            stream.write_all(&request.encode()).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| ClientError::Timeout("sending request".into()))?
        .map_err(ClientError::Io)?;

        debug!("request sent, waiting for response");

        // Single bounded read, like every message in this protocol.
        let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
        let n = tokio::time::timeout(self.timeout, stream.read(&mut buf))
            .await
            .map_err(|_| ClientError::Timeout("reading response".into()))?
            .map_err(ClientError::Io)?;

        if n == 0 {
            // The server drops invalid requests without a reply.
            return Err(ClientError::Connection(
                "server closed the connection without a response".into(),
            ));
        }

        let response = Message::decode(&buf[..n])?;
        debug!(verb = %response.verb(), "response received");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_server::{RendezvousServer, ServerConfig, SignalHandler};

    async fn start_server() -> (SocketAddr, SignalHandler) {
        let server = RendezvousServer::bind(ServerConfig::new(0)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let signals = SignalHandler::new();
        let shutdown = signals.shutdown();
        tokio::spawn(async move {
            server
                .run_with_control(tokio::io::empty(), shutdown)
                .await
                .unwrap();
        });
        (addr, signals)
    }

    #[tokio::test]
    async fn register_then_bridge() {
        let (addr, _signals) = start_server().await;
        let alice = RendezvousClient::new(addr, Duration::from_secs(5));
        let bob = RendezvousClient::new(addr, Duration::from_secs(5));

        alice.register("alice", "127.0.0.1", 5001).await.unwrap();
        assert!(alice.bridge("alice").await.unwrap().is_none());

        bob.register("bob", "127.0.0.1", 5002).await.unwrap();
        let peer = alice.bridge("alice").await.unwrap().unwrap();
        assert_eq!(peer.client_id, "bob");
        assert_eq!(peer.ip, "127.0.0.1");
        assert_eq!(peer.port, 5002);
    }

    #[tokio::test]
    async fn bridge_before_register_is_a_connection_error() {
        let (addr, _signals) = start_server().await;
        let client = RendezvousClient::new(addr, Duration::from_secs(5));

        let result = client.bridge("nobody").await;
        assert!(matches!(result, Err(ClientError::Connection(_))));
    }

    #[tokio::test]
    async fn connect_to_dead_server_fails() {
        // Bind and immediately drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RendezvousClient::new(addr, Duration::from_secs(1));
        let result = client.register("alice", "127.0.0.1", 5001).await;
        assert!(matches!(result, Err(ClientError::Connection(_))));
    }
}
