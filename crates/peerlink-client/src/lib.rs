//! CLI, rendezvous exchanges, and the interactive chat state machine.
//!
//! This crate provides the `peerlink` command-line client. A client
//! registers its address with the rendezvous server, asks it for a
//! peer, and then chats with that peer directly over TCP under a
//! strict alternating turn protocol.

pub mod cli;
pub mod config;
pub mod error;
pub mod rendezvous;
pub mod session;
pub mod state;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use rendezvous::RendezvousClient;
pub use session::Session;
