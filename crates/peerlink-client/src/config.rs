//! Client configuration, resolved from command-line arguments.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};

/// Listening port used when the requested one is out of range.
pub const DEFAULT_LISTEN_PORT: u16 = 5000;

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Identifier announced to the server.
    pub client_id: String,

    /// Port this client listens on for incoming peer connections.
    /// Incoming connections are only accepted on loopback.
    pub listen_port: u16,

    /// Address of the rendezvous server.
    pub server_addr: SocketAddr,

    /// Bound on connect/send/receive for rendezvous exchanges.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Builds a configuration from parsed arguments.
    ///
    /// A bad server address is a startup error; an out-of-range listen
    /// port only falls back to [`DEFAULT_LISTEN_PORT`] with a warning.
    pub fn from_cli(cli: &Cli) -> ClientResult<Self> {
        let server_addr = parse_server_addr(&cli.server)?;
        Ok(Self {
            client_id: cli.id.clone(),
            listen_port: resolve_listen_port(cli.port),
            server_addr,
            request_timeout: Duration::from_secs(cli.timeout),
        })
    }
}

/// Parses `ip:port` with a literal IP address.
fn parse_server_addr(s: &str) -> ClientResult<SocketAddr> {
    s.parse::<SocketAddr>().map_err(|_| {
        ClientError::Config(format!(
            "invalid server address {s:?}, expected <IP>:<Port>"
        ))
    })
}

/// Validates the requested listening port, falling back to the default
/// when it is outside the usable range.
fn resolve_listen_port(port: u16) -> u16 {
    if port > 1024 && port < 65535 {
        port
    } else {
        warn!(
            requested = port,
            fallback = DEFAULT_LISTEN_PORT,
            "listen port out of range, using default"
        );
        DEFAULT_LISTEN_PORT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(id: &str, port: u16, server: &str) -> Cli {
        Cli {
            id: id.to_string(),
            port,
            server: server.to_string(),
            timeout: 5,
            debug: false,
        }
    }

    #[test]
    fn valid_arguments_resolve() {
        let config = ClientConfig::from_cli(&cli("alice", 5001, "127.0.0.1:8080")).unwrap();
        assert_eq!(config.client_id, "alice");
        assert_eq!(config.listen_port, 5001);
        assert_eq!(config.server_addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn out_of_range_port_falls_back() {
        let config = ClientConfig::from_cli(&cli("alice", 80, "127.0.0.1:8080")).unwrap();
        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
    }

    #[test]
    fn hostname_is_not_a_server_address() {
        assert!(ClientConfig::from_cli(&cli("alice", 5001, "localhost:8080")).is_err());
    }

    #[test]
    fn server_address_requires_port() {
        assert!(ClientConfig::from_cli(&cli("alice", 5001, "127.0.0.1")).is_err());
    }
}
