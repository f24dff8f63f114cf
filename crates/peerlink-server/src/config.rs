//! Server configuration.

use std::time::Duration;

use peerlink_protocol::MAX_MESSAGE_SIZE;

/// Port used when the requested one is out of range.
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on; the bind address is always loopback.
    pub port: u16,

    /// Size of the per-request receive buffer. A request larger than
    /// this is cut off and dropped as malformed.
    pub recv_buffer: usize,

    /// Bound on writing a response back to a client.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            recv_buffer: MAX_MESSAGE_SIZE,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration listening on the given port.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Builder: set the receive buffer size.
    pub fn with_recv_buffer(mut self, size: usize) -> Self {
        self.recv_buffer = size;
        self
    }

    /// Builder: set the response write timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Returns true if `port` is usable for listening (strictly between the
/// privileged range and the top of the port space).
pub fn port_in_range(port: u16) -> bool {
    port > 1024 && port < 65535
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.recv_buffer, MAX_MESSAGE_SIZE);
    }

    #[test]
    fn builders() {
        let config = ServerConfig::new(5000)
            .with_recv_buffer(2048)
            .with_request_timeout(Duration::from_secs(1));
        assert_eq!(config.port, 5000);
        assert_eq!(config.recv_buffer, 2048);
        assert_eq!(config.request_timeout, Duration::from_secs(1));
    }

    #[test]
    fn port_range_bounds() {
        assert!(!port_in_range(0));
        assert!(!port_in_range(1024));
        assert!(port_in_range(1025));
        assert!(port_in_range(65534));
        assert!(!port_in_range(65535));
    }
}
