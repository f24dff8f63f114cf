//! Rendezvous server: client registry, pairing, request dispatch.
//!
//! The server lets chat clients find each other. Each client sends a
//! REGISTER to advertise its address, then a BRIDGE to be handed the
//! address of another registered client; the peers connect directly
//! after that and the server is no longer involved.
//!
//! Every request arrives on its own short-lived connection and is
//! answered (or silently dropped) before the connection is closed. The
//! whole server is one single-threaded event loop; the registry is
//! owned by that loop and needs no lock.
//!
//! # Example
//!
//! ```rust,no_run
//! use peerlink_server::{RendezvousServer, ServerConfig, SignalHandler};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!
//!     let server = RendezvousServer::bind(ServerConfig::new(8080)).await?;
//!     server.run_until_shutdown(signals.shutdown()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod registry;
mod signals;
mod socket;

pub use config::{DEFAULT_PORT, ServerConfig, port_in_range};
pub use error::{ServerError, ServerResult};
pub use handler::ServerState;
pub use registry::{Registration, Registry};
pub use signals::{ShutdownSignal, SignalHandler};
pub use socket::RendezvousServer;
